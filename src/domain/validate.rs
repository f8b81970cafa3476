//! Source validation: run the full lex → layout → parse pipeline and report
//! diagnostics without executing anything.

use serde::Serialize;

use crate::domain::error::AlgoScriptError;
use crate::domain::lexer::{layout, tokenize};
use crate::domain::parser::{parse, Parsed};

/// One positional finding, serialization-ready for tooling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<String>,
}

/// Full pipeline from source text to a parsed strategy.
pub fn parse_source(source: &str) -> Result<Parsed, AlgoScriptError> {
    let tokens = tokenize(source)?;
    let tokens = layout(tokens)?;
    Ok(parse(&tokens)?)
}

/// Check a script without executing it. Lexical and grammar errors land in
/// `errors`; non-fatal findings in `warnings`.
pub fn validate(source: &str) -> ValidationResult {
    let tokens = match tokenize(source) {
        Ok(tokens) => tokens,
        Err(err) => {
            let (line, column) = err.position();
            return ValidationResult {
                valid: false,
                errors: vec![Diagnostic {
                    line,
                    column,
                    message: err.to_string(),
                }],
                warnings: Vec::new(),
            };
        }
    };

    match layout(tokens).and_then(|tokens| parse(&tokens)) {
        Ok(parsed) => ValidationResult {
            valid: true,
            errors: Vec::new(),
            warnings: parsed.warnings,
        },
        Err(err) => {
            let (line, column) = err.position();
            ValidationResult {
                valid: false,
                errors: vec![Diagnostic {
                    line,
                    column,
                    message: err.to_string(),
                }],
                warnings: Vec::new(),
            }
        }
    }
}
