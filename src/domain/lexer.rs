//! Lexical analysis: source text → tokens.
//!
//! Two passes. [`tokenize`] scans raw tokens (keywords, literals,
//! punctuation, one `Newline` per significant line) and never looks at
//! block structure. [`layout`] then walks the token stream and inserts
//! synthetic `Indent`/`Dedent` tokens from each line's leading-whitespace
//! column, so the recursive-descent parser only ever sees explicit block
//! delimiters.
//!
//! Blank lines and `#` comment lines produce no tokens and do not affect
//! indentation. String literals are double-quoted with no escape sequences.
//! `LESS THAN` / `GREATER THAN` lex as single operator tokens.

use crate::domain::error::{LexError, ParseError};
use crate::domain::token::{Token, TokenKind};

/// Scan source text into raw tokens. Layout (`Indent`/`Dedent`) is not
/// applied here; see [`layout`].
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let mut tokens = Vec::new();
    let mut last_line = 0;

    for (idx, line) in source.lines().enumerate() {
        last_line = idx + 1;
        scan_line(line, last_line, &mut tokens)?;
    }

    tokens.push(Token::new(TokenKind::Eof, "", last_line + 1, 1));
    Ok(tokens)
}

/// Insert `Indent`/`Dedent` tokens from line columns. A line strictly deeper
/// than the enclosing block opens a level; a shallower line closes every
/// deeper level and must land exactly on one that is still open.
pub fn layout(tokens: Vec<Token>) -> Result<Vec<Token>, ParseError> {
    let mut out = Vec::with_capacity(tokens.len() + 8);
    let mut stack: Vec<usize> = vec![0];
    let mut at_line_start = true;

    for tok in tokens {
        match tok.kind {
            TokenKind::Newline => {
                at_line_start = true;
                out.push(tok);
            }
            TokenKind::Eof => {
                while stack.len() > 1 {
                    stack.pop();
                    out.push(Token::new(TokenKind::Dedent, "", tok.line, 1));
                }
                out.push(tok);
            }
            _ => {
                if at_line_start {
                    at_line_start = false;
                    let width = tok.column - 1;
                    let top = stack.last().copied().unwrap_or(0);
                    if width > top {
                        stack.push(width);
                        out.push(Token::new(TokenKind::Indent, "", tok.line, tok.column));
                    } else if width < top {
                        while stack.last().copied().unwrap_or(0) > width {
                            stack.pop();
                            out.push(Token::new(TokenKind::Dedent, "", tok.line, tok.column));
                        }
                        if stack.last().copied().unwrap_or(0) != width {
                            return Err(ParseError::IndentationMismatch {
                                line: tok.line,
                                column: tok.column,
                            });
                        }
                    }
                }
                out.push(tok);
            }
        }
    }

    Ok(out)
}

fn scan_line(line: &str, line_no: usize, tokens: &mut Vec<Token>) -> Result<(), LexError> {
    let chars: Vec<char> = line.chars().collect();
    let mut pos = 0;

    while pos < chars.len() && (chars[pos] == ' ' || chars[pos] == '\t') {
        pos += 1;
    }
    // Blank and comment-only lines are invisible to the layout pass.
    if pos >= chars.len() || chars[pos] == '#' {
        return Ok(());
    }

    while pos < chars.len() {
        let ch = chars[pos];
        let column = pos + 1;

        match ch {
            ' ' | '\t' => pos += 1,
            '#' => break,
            ':' => {
                tokens.push(Token::new(TokenKind::Colon, ":", line_no, column));
                pos += 1;
            }
            '(' => {
                tokens.push(Token::new(TokenKind::LParen, "(", line_no, column));
                pos += 1;
            }
            ')' => {
                tokens.push(Token::new(TokenKind::RParen, ")", line_no, column));
                pos += 1;
            }
            '"' => {
                pos += 1;
                let start = pos;
                while pos < chars.len() && chars[pos] != '"' {
                    pos += 1;
                }
                if pos >= chars.len() {
                    return Err(LexError::UnterminatedString {
                        line: line_no,
                        column,
                    });
                }
                let text: String = chars[start..pos].iter().collect();
                pos += 1;
                tokens.push(Token::new(TokenKind::Str, text, line_no, column));
            }
            c if c.is_ascii_digit() => {
                let start = pos;
                while pos < chars.len() && chars[pos].is_ascii_digit() {
                    pos += 1;
                }
                if pos < chars.len() && chars[pos] == '.' {
                    pos += 1;
                    while pos < chars.len() && chars[pos].is_ascii_digit() {
                        pos += 1;
                    }
                }
                let digits: String = chars[start..pos].iter().collect();
                let value: f64 = digits.parse().map_err(|_| LexError::MalformedNumber {
                    text: digits.clone(),
                    line: line_no,
                    column,
                })?;

                let kind = if pos < chars.len() && chars[pos] == '%' {
                    pos += 1;
                    TokenKind::Percent
                } else {
                    TokenKind::Number
                };
                let text: String = chars[start..pos].iter().collect();
                tokens.push(Token {
                    kind,
                    text,
                    value: Some(value),
                    line: line_no,
                    column,
                });
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = pos;
                while pos < chars.len()
                    && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_')
                {
                    pos += 1;
                }
                let word: String = chars[start..pos].iter().collect();

                if word == "LESS" || word == "GREATER" {
                    pos = expect_than(&chars, pos, &word, line_no)?;
                    let kind = if word == "LESS" {
                        TokenKind::LessThan
                    } else {
                        TokenKind::GreaterThan
                    };
                    let text = format!("{word} THAN");
                    tokens.push(Token::new(kind, text, line_no, column));
                } else {
                    let kind = TokenKind::keyword(&word).unwrap_or(TokenKind::Ident);
                    tokens.push(Token::new(kind, word, line_no, column));
                }
            }
            other => {
                return Err(LexError::UnexpectedChar {
                    ch: other,
                    line: line_no,
                    column,
                });
            }
        }
    }

    tokens.push(Token::new(
        TokenKind::Newline,
        "\n",
        line_no,
        chars.len() + 1,
    ));
    Ok(())
}

fn expect_than(
    chars: &[char],
    mut pos: usize,
    word: &str,
    line_no: usize,
) -> Result<usize, LexError> {
    while pos < chars.len() && (chars[pos] == ' ' || chars[pos] == '\t') {
        pos += 1;
    }
    let column = pos + 1;
    let start = pos;
    while pos < chars.len() && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_') {
        pos += 1;
    }
    let next: String = chars[start..pos].iter().collect();
    if next != "THAN" {
        let found = if next.is_empty() {
            "end of line".to_string()
        } else {
            next
        };
        return Err(LexError::ExpectedThan {
            word: word.to_string(),
            found,
            line: line_no,
            column,
        });
    }
    Ok(pos)
}
