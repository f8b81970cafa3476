//! Error taxonomy for the script language and execution engine.
//!
//! Lex and parse errors are fatal to one parse attempt; `MarketError` is
//! fatal to one evaluation but retryable once more candles arrive. Semantic
//! no-ops (selling flat, risk levels without a position) are not errors at
//! all — the interpreter logs and skips them.

use chrono::{DateTime, Utc};

/// A lexical error with 1-based source position.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexError {
    #[error("line {line}, column {column}: unexpected character '{ch}'")]
    UnexpectedChar { ch: char, line: usize, column: usize },

    #[error("line {line}, column {column}: unterminated string literal")]
    UnterminatedString { line: usize, column: usize },

    #[error("line {line}, column {column}: malformed number '{text}'")]
    MalformedNumber {
        text: String,
        line: usize,
        column: usize,
    },

    #[error("line {line}, column {column}: expected THAN after {word}, found '{found}'")]
    ExpectedThan {
        word: String,
        found: String,
        line: usize,
        column: usize,
    },
}

impl LexError {
    pub fn position(&self) -> (usize, usize) {
        match self {
            LexError::UnexpectedChar { line, column, .. }
            | LexError::UnterminatedString { line, column }
            | LexError::MalformedNumber { line, column, .. }
            | LexError::ExpectedThan { line, column, .. } => (*line, *column),
        }
    }
}

/// A grammar error with 1-based source position.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("line {line}, column {column}: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        line: usize,
        column: usize,
    },

    #[error("line {line}, column {column}: duplicate {what} declaration")]
    DuplicateHeader {
        what: &'static str,
        line: usize,
        column: usize,
    },

    #[error("line {line}, column {column}: duplicate handler for {event}")]
    DuplicateHandler {
        event: String,
        line: usize,
        column: usize,
    },

    #[error("line {line}, column {column}: unknown event '{found}'")]
    UnknownEvent {
        found: String,
        line: usize,
        column: usize,
    },

    #[error("line {line}, column {column}: {indicator} requires a period argument")]
    MissingPeriod {
        indicator: String,
        line: usize,
        column: usize,
    },

    #[error("line {line}, column {column}: {indicator} takes no arguments")]
    UnexpectedPeriod {
        indicator: String,
        line: usize,
        column: usize,
    },

    #[error("line {line}, column {column}: indicator period must be a whole number of at least 1")]
    InvalidPeriod { line: usize, column: usize },

    #[error("line {line}, column {column}: percentage {value} is outside 0..100")]
    PercentOutOfRange {
        value: f64,
        line: usize,
        column: usize,
    },

    #[error("line {line}, column {column}: {action} amount must be OF {expected}")]
    InvalidBasis {
        action: &'static str,
        expected: &'static str,
        line: usize,
        column: usize,
    },

    #[error("line {line}, column {column}: {what} body is empty")]
    EmptyBody {
        what: String,
        line: usize,
        column: usize,
    },

    #[error("line {line}, column {column}: indentation does not match any open block")]
    IndentationMismatch { line: usize, column: usize },
}

impl ParseError {
    pub fn position(&self) -> (usize, usize) {
        match self {
            ParseError::UnexpectedToken { line, column, .. }
            | ParseError::DuplicateHeader { line, column, .. }
            | ParseError::DuplicateHandler { line, column, .. }
            | ParseError::UnknownEvent { line, column, .. }
            | ParseError::MissingPeriod { line, column, .. }
            | ParseError::UnexpectedPeriod { line, column, .. }
            | ParseError::InvalidPeriod { line, column }
            | ParseError::PercentOutOfRange { line, column, .. }
            | ParseError::InvalidBasis { line, column, .. }
            | ParseError::EmptyBody { line, column, .. }
            | ParseError::IndentationMismatch { line, column } => (*line, *column),
        }
    }
}

/// Market-state errors. `InsufficientHistory` is retryable: later snapshots
/// may succeed once more candles have been ingested.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarketError {
    #[error("insufficient history for {expr}: have {have} samples, need {need}")]
    InsufficientHistory {
        expr: String,
        have: usize,
        need: usize,
    },

    #[error("no samples ingested for {symbol}")]
    NoSamples { symbol: String },

    #[error("out-of-order sample for {symbol}: {timestamp} is earlier than {last}")]
    OutOfOrderSample {
        symbol: String,
        timestamp: DateTime<Utc>,
        last: DateTime<Utc>,
    },
}

/// Candle feed errors (CSV files, generators).
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("{path}: record {row}: {reason}")]
    MalformedRecord {
        path: String,
        row: usize,
        reason: String,
    },
}

/// Top-level error type for algoscript.
#[derive(Debug, thiserror::Error)]
pub enum AlgoScriptError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Market(#[from] MarketError),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&AlgoScriptError> for std::process::ExitCode {
    fn from(err: &AlgoScriptError) -> Self {
        let code: u8 = match err {
            AlgoScriptError::Io(_) => 1,
            AlgoScriptError::Lex(_) | AlgoScriptError::Parse(_) => 2,
            AlgoScriptError::Market(_) => 3,
            AlgoScriptError::Feed(_) => 4,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lex_error_position() {
        let err = LexError::UnterminatedString { line: 3, column: 9 };
        assert_eq!(err.position(), (3, 9));
        assert!(err.to_string().contains("line 3, column 9"));
    }

    #[test]
    fn parse_error_position() {
        let err = ParseError::PercentOutOfRange {
            value: 150.0,
            line: 5,
            column: 12,
        };
        assert_eq!(err.position(), (5, 12));
        assert!(err.to_string().contains("150"));
    }

    #[test]
    fn insufficient_history_message() {
        let err = MarketError::InsufficientHistory {
            expr: "EMA(50)".into(),
            have: 10,
            need: 50,
        };
        assert_eq!(
            err.to_string(),
            "insufficient history for EMA(50): have 10 samples, need 50"
        );
    }
}
