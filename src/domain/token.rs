//! Token model for the script language.
//!
//! Keywords form a closed, case-sensitive set; anything word-shaped that is
//! not a keyword lexes as `Ident` and is rejected by the parser with a
//! positional error.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Literals
    Str,
    Number,
    Percent,
    Ident,

    // Header keywords
    Symbol,
    Timeframe,

    // Structure keywords
    On,
    If,
    And,
    Or,
    End,
    Set,
    Log,

    // Events
    NewCandle,
    OrderFilled,
    PriceChange,

    // Value expressions
    Price,
    Volume,
    Ema,
    Rsi,
    Macd,
    MacdHistogram,
    EntryPrice,

    // Actions
    Buy,
    Sell,
    MarketOrder,
    LimitOrder,

    // Position management
    StopLoss,
    TakeProfit,
    Balance,
    Position,

    // Operators
    Crosses,
    Upwards,
    Downwards,
    Is,
    Positive,
    Negative,
    LessThan,
    GreaterThan,
    At,
    Of,
    With,
    Above,
    Below,

    // Punctuation and layout
    Colon,
    LParen,
    RParen,
    Newline,
    Indent,
    Dedent,
    Eof,
}

impl TokenKind {
    /// Keyword lookup for a scanned word. Case-sensitive.
    pub fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word {
            "SYMBOL" => TokenKind::Symbol,
            "TIMEFRAME" => TokenKind::Timeframe,
            "ON" => TokenKind::On,
            "IF" => TokenKind::If,
            "AND" => TokenKind::And,
            "OR" => TokenKind::Or,
            "END" => TokenKind::End,
            "SET" => TokenKind::Set,
            "LOG" => TokenKind::Log,
            "NEW_CANDLE" => TokenKind::NewCandle,
            "ORDER_FILLED" => TokenKind::OrderFilled,
            "PRICE_CHANGE" => TokenKind::PriceChange,
            "PRICE" => TokenKind::Price,
            "VOLUME" => TokenKind::Volume,
            "EMA" => TokenKind::Ema,
            "RSI" => TokenKind::Rsi,
            "MACD" => TokenKind::Macd,
            "MACD_HISTOGRAM" => TokenKind::MacdHistogram,
            "ENTRY_PRICE" => TokenKind::EntryPrice,
            "BUY" => TokenKind::Buy,
            "SELL" => TokenKind::Sell,
            "MARKET_ORDER" => TokenKind::MarketOrder,
            "LIMIT_ORDER" => TokenKind::LimitOrder,
            "STOP_LOSS" => TokenKind::StopLoss,
            "TAKE_PROFIT" => TokenKind::TakeProfit,
            "BALANCE" => TokenKind::Balance,
            "POSITION" => TokenKind::Position,
            "CROSSES" => TokenKind::Crosses,
            "UPWARDS" => TokenKind::Upwards,
            "DOWNWARDS" => TokenKind::Downwards,
            "IS" => TokenKind::Is,
            "POSITIVE" => TokenKind::Positive,
            "NEGATIVE" => TokenKind::Negative,
            "AT" => TokenKind::At,
            "OF" => TokenKind::Of,
            "WITH" => TokenKind::With,
            "ABOVE" => TokenKind::Above,
            "BELOW" => TokenKind::Below,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Str => "string literal",
            TokenKind::Number => "number",
            TokenKind::Percent => "percentage",
            TokenKind::Ident => "identifier",
            TokenKind::Symbol => "SYMBOL",
            TokenKind::Timeframe => "TIMEFRAME",
            TokenKind::On => "ON",
            TokenKind::If => "IF",
            TokenKind::And => "AND",
            TokenKind::Or => "OR",
            TokenKind::End => "END",
            TokenKind::Set => "SET",
            TokenKind::Log => "LOG",
            TokenKind::NewCandle => "NEW_CANDLE",
            TokenKind::OrderFilled => "ORDER_FILLED",
            TokenKind::PriceChange => "PRICE_CHANGE",
            TokenKind::Price => "PRICE",
            TokenKind::Volume => "VOLUME",
            TokenKind::Ema => "EMA",
            TokenKind::Rsi => "RSI",
            TokenKind::Macd => "MACD",
            TokenKind::MacdHistogram => "MACD_HISTOGRAM",
            TokenKind::EntryPrice => "ENTRY_PRICE",
            TokenKind::Buy => "BUY",
            TokenKind::Sell => "SELL",
            TokenKind::MarketOrder => "MARKET_ORDER",
            TokenKind::LimitOrder => "LIMIT_ORDER",
            TokenKind::StopLoss => "STOP_LOSS",
            TokenKind::TakeProfit => "TAKE_PROFIT",
            TokenKind::Balance => "BALANCE",
            TokenKind::Position => "POSITION",
            TokenKind::Crosses => "CROSSES",
            TokenKind::Upwards => "UPWARDS",
            TokenKind::Downwards => "DOWNWARDS",
            TokenKind::Is => "IS",
            TokenKind::Positive => "POSITIVE",
            TokenKind::Negative => "NEGATIVE",
            TokenKind::LessThan => "LESS THAN",
            TokenKind::GreaterThan => "GREATER THAN",
            TokenKind::At => "AT",
            TokenKind::Of => "OF",
            TokenKind::With => "WITH",
            TokenKind::Above => "ABOVE",
            TokenKind::Below => "BELOW",
            TokenKind::Colon => "':'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::Newline => "end of line",
            TokenKind::Indent => "indented block",
            TokenKind::Dedent => "end of block",
            TokenKind::Eof => "end of input",
        };
        write!(f, "{name}")
    }
}

/// One token with its source position. `value` is set for `Number` and
/// `Percent` tokens; for `Percent` it is the number as written (`50%` → 50.0),
/// the parser divides by 100 where context requires a fraction.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub value: Option<f64>,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize, column: usize) -> Self {
        Token {
            kind,
            text: text.into(),
            value: None,
            line,
            column,
        }
    }

    /// Human-readable description for "found ..." diagnostics.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Str => format!("string \"{}\"", self.text),
            TokenKind::Number | TokenKind::Percent | TokenKind::Ident => {
                format!("'{}'", self.text)
            }
            kind => kind.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_are_case_sensitive() {
        assert_eq!(TokenKind::keyword("BUY"), Some(TokenKind::Buy));
        assert_eq!(TokenKind::keyword("buy"), None);
        assert_eq!(TokenKind::keyword("Buy"), None);
    }

    #[test]
    fn macd_variants_are_distinct() {
        assert_eq!(TokenKind::keyword("MACD"), Some(TokenKind::Macd));
        assert_eq!(
            TokenKind::keyword("MACD_HISTOGRAM"),
            Some(TokenKind::MacdHistogram)
        );
    }

    #[test]
    fn unknown_word_is_not_a_keyword() {
        assert_eq!(TokenKind::keyword("HODL"), None);
    }

    #[test]
    fn describe_literals() {
        let tok = Token {
            kind: TokenKind::Str,
            text: "ETHUSD".into(),
            value: None,
            line: 1,
            column: 8,
        };
        assert_eq!(tok.describe(), "string \"ETHUSD\"");

        let tok = Token {
            kind: TokenKind::Percent,
            text: "50%".into(),
            value: Some(50.0),
            line: 2,
            column: 5,
        };
        assert_eq!(tok.describe(), "'50%'");
    }

    #[test]
    fn describe_keyword() {
        let tok = Token::new(TokenKind::Crosses, "CROSSES", 4, 14);
        assert_eq!(tok.describe(), "CROSSES");
    }
}
