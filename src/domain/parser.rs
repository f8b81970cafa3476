//! Recursive-descent parser: laid-out tokens → [`Strategy`].
//!
//! One token of lookahead, no recovery: the first grammar error aborts the
//! parse. Non-fatal findings (content after END, a script with no handlers)
//! are collected as warnings on the returned [`Parsed`].
//!
//! Condition grammar: `AND` binds tighter than `OR`, both left-associative.
//! Blocks are delimited by the `Indent`/`Dedent` tokens the layout pass
//! inserted, so the parser itself never counts spaces.

use crate::domain::ast::{
    Amount, AmountBasis, CompareOp, Condition, CrossDirection, EventKind, Handler, OffsetDirection,
    OrderType, PriceOffset, Sign, Statement, Strategy, ValueExpr,
};
use crate::domain::error::ParseError;
use crate::domain::indicator::IndicatorKind;
use crate::domain::token::{Token, TokenKind};

/// A successful parse: the strategy plus any non-fatal warnings.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    pub strategy: Strategy,
    pub warnings: Vec<String>,
}

/// Parse a laid-out token stream (see [`crate::domain::lexer::layout`]).
pub fn parse(tokens: &[Token]) -> Result<Parsed, ParseError> {
    Parser::new(tokens).parse_strategy()
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    warnings: Vec<String>,
    eof: Token,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Parser {
            tokens,
            pos: 0,
            warnings: Vec::new(),
            eof: Token::new(TokenKind::Eof, "", 1, 1),
        }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let tok = self.peek();
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: tok.describe(),
            line: tok.line,
            column: tok.column,
        }
    }

    fn skip_newlines(&mut self) {
        while self.eat(TokenKind::Newline) {}
    }

    fn parse_strategy(mut self) -> Result<Parsed, ParseError> {
        let (symbol, timeframe) = self.parse_header()?;

        let mut handlers: Vec<Handler> = Vec::new();
        loop {
            self.skip_newlines();
            match self.peek().kind {
                TokenKind::On => {
                    let handler = self.parse_handler(&handlers)?;
                    handlers.push(handler);
                }
                TokenKind::End => {
                    self.advance();
                    break;
                }
                _ => return Err(self.unexpected("ON or END")),
            }
        }

        self.skip_newlines();
        if !self.check(TokenKind::Eof) {
            let tok = self.peek();
            self.warnings
                .push(format!("line {}: content after END is ignored", tok.line));
        }
        if handlers.is_empty() {
            self.warnings
                .push("script declares no event handlers".to_string());
        }

        Ok(Parsed {
            strategy: Strategy {
                symbol,
                timeframe,
                handlers,
            },
            warnings: self.warnings,
        })
    }

    fn parse_header(&mut self) -> Result<(String, String), ParseError> {
        let mut symbol: Option<String> = None;
        let mut timeframe: Option<String> = None;

        loop {
            self.skip_newlines();
            match self.peek().kind {
                TokenKind::Symbol => {
                    let tok = self.advance();
                    if symbol.is_some() {
                        return Err(ParseError::DuplicateHeader {
                            what: "SYMBOL",
                            line: tok.line,
                            column: tok.column,
                        });
                    }
                    symbol = Some(self.expect(TokenKind::Str, "a quoted symbol")?.text);
                    self.expect(TokenKind::Newline, "end of line")?;
                }
                TokenKind::Timeframe => {
                    let tok = self.advance();
                    if timeframe.is_some() {
                        return Err(ParseError::DuplicateHeader {
                            what: "TIMEFRAME",
                            line: tok.line,
                            column: tok.column,
                        });
                    }
                    timeframe = Some(self.expect(TokenKind::Str, "a quoted timeframe")?.text);
                    self.expect(TokenKind::Newline, "end of line")?;
                }
                _ => break,
            }
        }

        match (symbol, timeframe) {
            (Some(symbol), Some(timeframe)) => Ok((symbol, timeframe)),
            (None, _) => Err(self.unexpected("SYMBOL declaration")),
            (_, None) => Err(self.unexpected("TIMEFRAME declaration")),
        }
    }

    fn parse_handler(&mut self, existing: &[Handler]) -> Result<Handler, ParseError> {
        self.advance(); // ON
        let tok = self.peek().clone();
        let event = match tok.kind {
            TokenKind::NewCandle => EventKind::NewCandle,
            TokenKind::OrderFilled => EventKind::OrderFilled,
            TokenKind::PriceChange => EventKind::PriceChange,
            TokenKind::Ident => {
                return Err(ParseError::UnknownEvent {
                    found: tok.text,
                    line: tok.line,
                    column: tok.column,
                });
            }
            _ => return Err(self.unexpected("an event name")),
        };
        self.advance();

        if existing.iter().any(|h| h.event == event) {
            return Err(ParseError::DuplicateHandler {
                event: event.to_string(),
                line: tok.line,
                column: tok.column,
            });
        }

        self.expect(TokenKind::Colon, "':'")?;
        self.expect(TokenKind::Newline, "end of line")?;
        self.expect_body(&format!("ON {event} handler"))?;
        let body = self.parse_block()?;
        Ok(Handler { event, body })
    }

    /// A block opener with nothing indented under it never produces an
    /// `Indent` token, so a missing one means the body is empty.
    fn expect_body(&mut self, what: &str) -> Result<(), ParseError> {
        if self.eat(TokenKind::Indent) {
            return Ok(());
        }
        let tok = self.peek();
        Err(ParseError::EmptyBody {
            what: what.to_string(),
            line: tok.line,
            column: tok.column,
        })
    }

    /// Statements until the matching `Dedent`, which is consumed.
    fn parse_block(&mut self) -> Result<Vec<Statement>, ParseError> {
        let mut body = Vec::new();
        loop {
            match self.peek().kind {
                TokenKind::Dedent => {
                    self.advance();
                    return Ok(body);
                }
                TokenKind::Newline => {
                    self.advance();
                }
                TokenKind::Eof => return Err(self.unexpected("a statement or end of block")),
                _ => body.push(self.parse_statement()?),
            }
        }
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        match self.peek().kind {
            TokenKind::If => self.parse_if(),
            TokenKind::Buy => self.parse_trade(true),
            TokenKind::Sell => self.parse_trade(false),
            TokenKind::Set => self.parse_set(),
            TokenKind::Log => self.parse_log(),
            _ => Err(self.unexpected("a statement (IF, BUY, SELL, SET or LOG)")),
        }
    }

    fn parse_if(&mut self) -> Result<Statement, ParseError> {
        self.advance(); // IF
        let condition = self.parse_condition()?;
        self.expect(TokenKind::Newline, "end of line")?;
        self.expect_body("IF")?;
        let body = self.parse_block()?;
        Ok(Statement::If { condition, body })
    }

    fn parse_condition(&mut self) -> Result<Condition, ParseError> {
        let mut left = self.parse_and_condition()?;
        while self.eat(TokenKind::Or) {
            let right = self.parse_and_condition()?;
            left = Condition::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and_condition(&mut self) -> Result<Condition, ParseError> {
        let mut left = self.parse_condition_atom()?;
        while self.eat(TokenKind::And) {
            let right = self.parse_condition_atom()?;
            left = Condition::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_condition_atom(&mut self) -> Result<Condition, ParseError> {
        let value = self.parse_value_expr()?;
        match self.peek().kind {
            TokenKind::Crosses => {
                self.advance();
                let reference = self.parse_value_expr()?;
                let direction = if self.eat(TokenKind::Upwards) {
                    CrossDirection::Upwards
                } else if self.eat(TokenKind::Downwards) {
                    CrossDirection::Downwards
                } else {
                    return Err(self.unexpected("UPWARDS or DOWNWARDS"));
                };
                Ok(Condition::Crosses {
                    value,
                    reference,
                    direction,
                })
            }
            TokenKind::Is => {
                self.advance();
                match self.peek().kind {
                    TokenKind::Positive => {
                        self.advance();
                        Ok(Condition::SignCheck {
                            value,
                            sign: Sign::Positive,
                        })
                    }
                    TokenKind::Negative => {
                        self.advance();
                        Ok(Condition::SignCheck {
                            value,
                            sign: Sign::Negative,
                        })
                    }
                    TokenKind::LessThan => {
                        self.advance();
                        let right = self.parse_value_expr()?;
                        Ok(Condition::Comparison {
                            left: value,
                            op: CompareOp::LessThan,
                            right,
                        })
                    }
                    TokenKind::GreaterThan => {
                        self.advance();
                        let right = self.parse_value_expr()?;
                        Ok(Condition::Comparison {
                            left: value,
                            op: CompareOp::GreaterThan,
                            right,
                        })
                    }
                    _ => Err(self.unexpected("POSITIVE, NEGATIVE, LESS THAN or GREATER THAN")),
                }
            }
            _ => Err(self.unexpected("CROSSES or IS")),
        }
    }

    fn parse_value_expr(&mut self) -> Result<ValueExpr, ParseError> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Price => {
                self.advance();
                Ok(ValueExpr::Price)
            }
            TokenKind::Volume => {
                self.advance();
                Ok(ValueExpr::Volume)
            }
            TokenKind::EntryPrice => {
                self.advance();
                Ok(ValueExpr::EntryPrice)
            }
            TokenKind::Number => {
                self.advance();
                Ok(ValueExpr::Number(tok.value.unwrap_or(0.0)))
            }
            TokenKind::Ema => {
                let period = self.parse_period("EMA")?;
                Ok(ValueExpr::Indicator(IndicatorKind::Ema(period)))
            }
            TokenKind::Rsi => {
                let period = self.parse_period("RSI")?;
                Ok(ValueExpr::Indicator(IndicatorKind::Rsi(period)))
            }
            TokenKind::Macd => {
                self.advance();
                self.reject_period("MACD")?;
                Ok(ValueExpr::Indicator(IndicatorKind::Macd))
            }
            TokenKind::MacdHistogram => {
                self.advance();
                self.reject_period("MACD_HISTOGRAM")?;
                Ok(ValueExpr::Indicator(IndicatorKind::MacdHistogram))
            }
            _ => Err(self.unexpected("a value expression")),
        }
    }

    /// Consume `EMA`/`RSI` and its mandatory `(period)` argument.
    fn parse_period(&mut self, indicator: &str) -> Result<usize, ParseError> {
        let tok = self.advance();
        if !self.eat(TokenKind::LParen) {
            return Err(ParseError::MissingPeriod {
                indicator: indicator.to_string(),
                line: tok.line,
                column: tok.column,
            });
        }
        let num = self.expect(TokenKind::Number, "an indicator period")?;
        let value = num.value.unwrap_or(0.0);
        if value < 1.0 || value.fract() != 0.0 {
            return Err(ParseError::InvalidPeriod {
                line: num.line,
                column: num.column,
            });
        }
        self.expect(TokenKind::RParen, "')'")?;
        Ok(value as usize)
    }

    fn reject_period(&mut self, indicator: &str) -> Result<(), ParseError> {
        if self.check(TokenKind::LParen) {
            let tok = self.peek();
            return Err(ParseError::UnexpectedPeriod {
                indicator: indicator.to_string(),
                line: tok.line,
                column: tok.column,
            });
        }
        Ok(())
    }

    fn parse_trade(&mut self, is_buy: bool) -> Result<Statement, ParseError> {
        self.advance(); // BUY | SELL
        let (action, basis, basis_kind, basis_word) = if is_buy {
            ("BUY", AmountBasis::Balance, TokenKind::Balance, "BALANCE")
        } else {
            ("SELL", AmountBasis::Position, TokenKind::Position, "POSITION")
        };

        let pct = self.expect(TokenKind::Percent, "a percentage like 50%")?;
        let percentage = pct.value.unwrap_or(0.0);
        if !(0.0..=100.0).contains(&percentage) {
            return Err(ParseError::PercentOutOfRange {
                value: percentage,
                line: pct.line,
                column: pct.column,
            });
        }

        self.expect(TokenKind::Of, "OF")?;
        let tok = self.peek().clone();
        match tok.kind {
            kind if kind == basis_kind => {
                self.advance();
            }
            TokenKind::Balance | TokenKind::Position => {
                return Err(ParseError::InvalidBasis {
                    action,
                    expected: basis_word,
                    line: tok.line,
                    column: tok.column,
                });
            }
            _ => return Err(self.unexpected(basis_word)),
        }

        let order = self.parse_order_clause()?;
        self.expect(TokenKind::Newline, "end of line")?;

        let amount = Amount { percentage, basis };
        Ok(if is_buy {
            Statement::Buy { amount, order }
        } else {
            Statement::Sell { amount, order }
        })
    }

    /// Optional `WITH MARKET_ORDER | LIMIT_ORDER`; defaults to a market
    /// order.
    fn parse_order_clause(&mut self) -> Result<OrderType, ParseError> {
        if !self.eat(TokenKind::With) {
            return Ok(OrderType::Market);
        }
        if self.eat(TokenKind::MarketOrder) {
            Ok(OrderType::Market)
        } else if self.eat(TokenKind::LimitOrder) {
            Ok(OrderType::Limit)
        } else {
            Err(self.unexpected("MARKET_ORDER or LIMIT_ORDER"))
        }
    }

    fn parse_set(&mut self) -> Result<Statement, ParseError> {
        self.advance(); // SET
        let is_stop = if self.eat(TokenKind::StopLoss) {
            true
        } else if self.eat(TokenKind::TakeProfit) {
            false
        } else {
            return Err(self.unexpected("STOP_LOSS or TAKE_PROFIT"));
        };

        self.expect(TokenKind::At, "AT")?;
        let pct = self.expect(TokenKind::Percent, "a percentage like 5%")?;
        let percentage = pct.value.unwrap_or(0.0);
        if !(0.0..=100.0).contains(&percentage) {
            return Err(ParseError::PercentOutOfRange {
                value: percentage,
                line: pct.line,
                column: pct.column,
            });
        }

        let direction = if self.eat(TokenKind::Above) {
            OffsetDirection::Above
        } else if self.eat(TokenKind::Below) {
            OffsetDirection::Below
        } else {
            return Err(self.unexpected("ABOVE or BELOW"));
        };
        self.expect(TokenKind::EntryPrice, "ENTRY_PRICE")?;
        self.expect(TokenKind::Newline, "end of line")?;

        let offset = PriceOffset {
            percentage,
            direction,
        };
        Ok(if is_stop {
            Statement::SetStopLoss { offset }
        } else {
            Statement::SetTakeProfit { offset }
        })
    }

    fn parse_log(&mut self) -> Result<Statement, ParseError> {
        self.advance(); // LOG
        let message = self.expect(TokenKind::Str, "a quoted message")?.text;
        self.expect(TokenKind::Newline, "end of line")?;
        Ok(Statement::Log { message })
    }
}
