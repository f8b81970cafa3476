//! Strategy syntax tree.
//!
//! Every construct the grammar admits is a closed enum here, so the
//! interpreter dispatches with exhaustive `match` and a new construct is a
//! compile error everywhere it matters. `Strategy::to_source` writes the
//! canonical form of a tree back out; parsing its output yields an equal
//! tree.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::domain::indicator::IndicatorKind;

/// Events a strategy can handle. At most one handler per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    NewCandle,
    OrderFilled,
    PriceChange,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::NewCandle => "NEW_CANDLE",
            EventKind::OrderFilled => "ORDER_FILLED",
            EventKind::PriceChange => "PRICE_CHANGE",
        };
        write!(f, "{name}")
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW_CANDLE" => Ok(EventKind::NewCandle),
            "ORDER_FILLED" => Ok(EventKind::OrderFilled),
            "PRICE_CHANGE" => Ok(EventKind::PriceChange),
            other => Err(format!("unknown event '{other}'")),
        }
    }
}

/// A market series a condition can read: the candle fields or one
/// indicator. Used as the key for current and previous-tick values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeriesKey {
    Price,
    Volume,
    Indicator(IndicatorKind),
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesKey::Price => write!(f, "PRICE"),
            SeriesKey::Volume => write!(f, "VOLUME"),
            SeriesKey::Indicator(kind) => write!(f, "{kind}"),
        }
    }
}

/// A value position in a condition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueExpr {
    Price,
    Volume,
    EntryPrice,
    Indicator(IndicatorKind),
    Number(f64),
}

impl ValueExpr {
    /// The market series this expression reads, if any. `EntryPrice` and
    /// literals resolve from trading state and the tree itself.
    pub fn series_key(&self) -> Option<SeriesKey> {
        match self {
            ValueExpr::Price => Some(SeriesKey::Price),
            ValueExpr::Volume => Some(SeriesKey::Volume),
            ValueExpr::Indicator(kind) => Some(SeriesKey::Indicator(*kind)),
            ValueExpr::EntryPrice | ValueExpr::Number(_) => None,
        }
    }
}

impl fmt::Display for ValueExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueExpr::Price => write!(f, "PRICE"),
            ValueExpr::Volume => write!(f, "VOLUME"),
            ValueExpr::EntryPrice => write!(f, "ENTRY_PRICE"),
            ValueExpr::Indicator(kind) => write!(f, "{kind}"),
            ValueExpr::Number(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    LessThan,
    GreaterThan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Positive,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossDirection {
    Upwards,
    Downwards,
}

/// Boolean condition tree. `And` binds tighter than `Or`; both are
/// left-associative, so the parser never builds `Or` under `And`.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Comparison {
        left: ValueExpr,
        op: CompareOp,
        right: ValueExpr,
    },
    SignCheck {
        value: ValueExpr,
        sign: Sign,
    },
    Crosses {
        value: ValueExpr,
        reference: ValueExpr,
        direction: CrossDirection,
    },
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountBasis {
    Balance,
    Position,
}

/// Trade size: a percentage of the balance (BUY) or of the open position
/// (SELL). The percentage is stored as written, 0..=100.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Amount {
    pub percentage: f64,
    pub basis: AmountBasis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Market,
    Limit,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Market => write!(f, "MARKET_ORDER"),
            OrderType::Limit => write!(f, "LIMIT_ORDER"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetDirection {
    Above,
    Below,
}

/// A percentage offset from the entry price, for stop-loss and take-profit
/// levels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceOffset {
    pub percentage: f64,
    pub direction: OffsetDirection,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    If {
        condition: Condition,
        body: Vec<Statement>,
    },
    Buy {
        amount: Amount,
        order: OrderType,
    },
    Sell {
        amount: Amount,
        order: OrderType,
    },
    SetStopLoss {
        offset: PriceOffset,
    },
    SetTakeProfit {
        offset: PriceOffset,
    },
    Log {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Handler {
    pub event: EventKind,
    pub body: Vec<Statement>,
}

/// A parsed strategy: header plus event handlers, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub symbol: String,
    pub timeframe: String,
    pub handlers: Vec<Handler>,
}

impl Strategy {
    pub fn handler(&self, event: EventKind) -> Option<&Handler> {
        self.handlers.iter().find(|h| h.event == event)
    }

    /// Every market series any handler reads, deduplicated, in first-use
    /// order. The market state tracks exactly these.
    pub fn series_keys(&self) -> Vec<SeriesKey> {
        let mut keys = Vec::new();
        for handler in &self.handlers {
            collect_statement_keys(&handler.body, &mut keys);
        }
        keys
    }

    /// Series read by one event's handler. Empty when the event is
    /// unhandled.
    pub fn series_keys_for(&self, event: EventKind) -> Vec<SeriesKey> {
        let mut keys = Vec::new();
        if let Some(handler) = self.handler(event) {
            collect_statement_keys(&handler.body, &mut keys);
        }
        keys
    }

    /// Write the tree back out in canonical form: 4-space indentation, one
    /// blank line between sections, explicit WITH clause on every trade.
    pub fn to_source(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("SYMBOL \"{}\"\n", self.symbol));
        out.push_str(&format!("TIMEFRAME \"{}\"\n", self.timeframe));
        for handler in &self.handlers {
            out.push('\n');
            out.push_str(&format!("ON {}:\n", handler.event));
            write_statements(&handler.body, 1, &mut out);
        }
        out.push_str("\nEND\n");
        out
    }
}

fn collect_statement_keys(statements: &[Statement], keys: &mut Vec<SeriesKey>) {
    for statement in statements {
        if let Statement::If { condition, body } = statement {
            collect_condition_keys(condition, keys);
            collect_statement_keys(body, keys);
        }
    }
}

fn collect_condition_keys(condition: &Condition, keys: &mut Vec<SeriesKey>) {
    let mut push = |expr: &ValueExpr, keys: &mut Vec<SeriesKey>| {
        if let Some(key) = expr.series_key() {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    };
    match condition {
        Condition::Comparison { left, right, .. } => {
            push(left, keys);
            push(right, keys);
        }
        Condition::SignCheck { value, .. } => push(value, keys),
        Condition::Crosses {
            value, reference, ..
        } => {
            push(value, keys);
            push(reference, keys);
        }
        Condition::And(a, b) | Condition::Or(a, b) => {
            collect_condition_keys(a, keys);
            collect_condition_keys(b, keys);
        }
    }
}

fn write_statements(statements: &[Statement], depth: usize, out: &mut String) {
    let pad = "    ".repeat(depth);
    for statement in statements {
        match statement {
            Statement::If { condition, body } => {
                out.push_str(&format!("{pad}IF {}\n", condition_source(condition)));
                write_statements(body, depth + 1, out);
            }
            Statement::Buy { amount, order } => {
                out.push_str(&format!(
                    "{pad}BUY {}% OF BALANCE WITH {order}\n",
                    amount.percentage
                ));
            }
            Statement::Sell { amount, order } => {
                out.push_str(&format!(
                    "{pad}SELL {}% OF POSITION WITH {order}\n",
                    amount.percentage
                ));
            }
            Statement::SetStopLoss { offset } => {
                out.push_str(&format!(
                    "{pad}SET STOP_LOSS AT {}% {} ENTRY_PRICE\n",
                    offset.percentage,
                    offset_word(offset.direction)
                ));
            }
            Statement::SetTakeProfit { offset } => {
                out.push_str(&format!(
                    "{pad}SET TAKE_PROFIT AT {}% {} ENTRY_PRICE\n",
                    offset.percentage,
                    offset_word(offset.direction)
                ));
            }
            Statement::Log { message } => {
                out.push_str(&format!("{pad}LOG \"{message}\"\n"));
            }
        }
    }
}

fn offset_word(direction: OffsetDirection) -> &'static str {
    match direction {
        OffsetDirection::Above => "ABOVE",
        OffsetDirection::Below => "BELOW",
    }
}

fn condition_source(condition: &Condition) -> String {
    match condition {
        Condition::Comparison { left, op, right } => {
            let word = match op {
                CompareOp::LessThan => "LESS THAN",
                CompareOp::GreaterThan => "GREATER THAN",
            };
            format!("{left} IS {word} {right}")
        }
        Condition::SignCheck { value, sign } => {
            let word = match sign {
                Sign::Positive => "POSITIVE",
                Sign::Negative => "NEGATIVE",
            };
            format!("{value} IS {word}")
        }
        Condition::Crosses {
            value,
            reference,
            direction,
        } => {
            let word = match direction {
                CrossDirection::Upwards => "UPWARDS",
                CrossDirection::Downwards => "DOWNWARDS",
            };
            format!("{value} CROSSES {reference} {word}")
        }
        Condition::And(a, b) => format!("{} AND {}", condition_source(a), condition_source(b)),
        Condition::Or(a, b) => format!("{} OR {}", condition_source(a), condition_source(b)),
    }
}
