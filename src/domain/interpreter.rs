//! Strategy evaluation against one market snapshot.
//!
//! `evaluate` runs the handler for one event. It works on a copy of the
//! trading state and writes back only on success, so a failing evaluation
//! never leaves the caller's state half-mutated. Semantic no-ops (selling
//! flat, risk levels without a position, a zero-quantity buy) append a
//! warning to the log and skip the statement rather than failing the run.

use serde::Serialize;

use crate::domain::ast::{
    Amount, CompareOp, Condition, CrossDirection, EventKind, OffsetDirection, OrderType,
    PriceOffset, SeriesKey, Sign, Statement, Strategy, ValueExpr,
};
use crate::domain::market::MarketSnapshot;
use crate::domain::trading::{ActionRecord, TradingState};

/// Outcome of one event evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub trading_state: TradingState,
    pub logs: Vec<String>,
    pub actions: Vec<ActionRecord>,
    pub error: Option<String>,
}

impl ExecutionResult {
    /// A successful run with no logs or actions (e.g. an unhandled event).
    pub fn empty(state: &TradingState) -> Self {
        ExecutionResult {
            success: true,
            trading_state: state.clone(),
            logs: Vec::new(),
            actions: Vec::new(),
            error: None,
        }
    }

    /// A run that failed before any statement executed.
    pub fn failed(state: &TradingState, error: String) -> Self {
        ExecutionResult {
            success: false,
            trading_state: state.clone(),
            logs: Vec::new(),
            actions: Vec::new(),
            error: Some(error),
        }
    }
}

/// Evaluate the handler for `event`. Dispatching an event the strategy does
/// not handle succeeds with an empty result.
pub fn evaluate(
    strategy: &Strategy,
    event: EventKind,
    snapshot: &MarketSnapshot,
    state: &mut TradingState,
) -> ExecutionResult {
    let Some(handler) = strategy.handler(event) else {
        return ExecutionResult::empty(state);
    };

    let mut ctx = EvalContext {
        snapshot,
        state: state.clone(),
        logs: Vec::new(),
        actions: Vec::new(),
    };

    match ctx.run_block(&handler.body) {
        Ok(()) => {
            *state = ctx.state.clone();
            ExecutionResult {
                success: true,
                trading_state: ctx.state,
                logs: ctx.logs,
                actions: ctx.actions,
                error: None,
            }
        }
        Err(message) => ExecutionResult {
            success: false,
            trading_state: state.clone(),
            logs: ctx.logs,
            actions: ctx.actions,
            error: Some(message),
        },
    }
}

struct EvalContext<'a> {
    snapshot: &'a MarketSnapshot,
    state: TradingState,
    logs: Vec<String>,
    actions: Vec<ActionRecord>,
}

impl EvalContext<'_> {
    fn run_block(&mut self, statements: &[Statement]) -> Result<(), String> {
        for statement in statements {
            match statement {
                Statement::If { condition, body } => {
                    if self.eval_condition(condition)? {
                        self.run_block(body)?;
                    }
                }
                Statement::Buy { amount, order } => self.exec_buy(amount, *order),
                Statement::Sell { amount, order } => self.exec_sell(amount, *order),
                Statement::SetStopLoss { offset } => self.exec_set_level(true, offset),
                Statement::SetTakeProfit { offset } => self.exec_set_level(false, offset),
                Statement::Log { message } => self.logs.push(message.clone()),
            }
        }
        Ok(())
    }

    fn value_of(&self, expr: &ValueExpr) -> Result<f64, String> {
        match expr {
            ValueExpr::Price => Ok(self.snapshot.price()),
            ValueExpr::Volume => Ok(self.snapshot.volume()),
            ValueExpr::EntryPrice => Ok(self.state.entry_price.unwrap_or(0.0)),
            ValueExpr::Number(n) => Ok(*n),
            ValueExpr::Indicator(kind) => self
                .snapshot
                .value(&SeriesKey::Indicator(*kind))
                .ok_or_else(|| format!("no value for {kind} in snapshot")),
        }
    }

    /// Previous-tick value of an expression. Literals and the entry price
    /// are constant across ticks; market series may have no previous value
    /// yet.
    fn previous_of(&self, expr: &ValueExpr) -> Option<f64> {
        match expr {
            ValueExpr::Number(n) => Some(*n),
            ValueExpr::EntryPrice => Some(self.state.entry_price.unwrap_or(0.0)),
            other => other
                .series_key()
                .and_then(|key| self.snapshot.previous(&key)),
        }
    }

    fn eval_condition(&self, condition: &Condition) -> Result<bool, String> {
        match condition {
            Condition::Comparison { left, op, right } => {
                let left = self.value_of(left)?;
                let right = self.value_of(right)?;
                Ok(match op {
                    CompareOp::LessThan => left < right,
                    CompareOp::GreaterThan => left > right,
                })
            }
            Condition::SignCheck { value, sign } => {
                let value = self.value_of(value)?;
                Ok(match sign {
                    Sign::Positive => value > 0.0,
                    Sign::Negative => value < 0.0,
                })
            }
            Condition::Crosses {
                value,
                reference,
                direction,
            } => {
                let curr_value = self.value_of(value)?;
                let curr_ref = self.value_of(reference)?;
                // A crossing needs a previous tick on both sides.
                let (Some(prev_value), Some(prev_ref)) =
                    (self.previous_of(value), self.previous_of(reference))
                else {
                    return Ok(false);
                };
                Ok(match direction {
                    CrossDirection::Upwards => prev_value <= prev_ref && curr_value > curr_ref,
                    CrossDirection::Downwards => prev_value >= prev_ref && curr_value < curr_ref,
                })
            }
            Condition::And(a, b) => Ok(self.eval_condition(a)? && self.eval_condition(b)?),
            Condition::Or(a, b) => Ok(self.eval_condition(a)? || self.eval_condition(b)?),
        }
    }

    fn exec_buy(&mut self, amount: &Amount, order: OrderType) {
        let price = self.snapshot.price();
        let cost = amount.percentage / 100.0 * self.state.balance;
        let quantity = if price > 0.0 { cost / price } else { 0.0 };
        if quantity <= 0.0 || !quantity.is_finite() {
            self.logs
                .push("warning: BUY skipped, computed quantity is not positive".to_string());
            return;
        }

        let held = self.state.position_size;
        let total = held + quantity;
        let entry = match self.state.entry_price {
            // Average the entry over the combined position.
            Some(existing) if held > 0.0 => (existing * held + price * quantity) / total,
            _ => price,
        };

        self.state.balance -= cost;
        self.state.position_size = total;
        self.state.entry_price = Some(entry);
        self.actions.push(ActionRecord::Buy {
            quantity,
            price,
            cost,
            order,
        });
    }

    fn exec_sell(&mut self, amount: &Amount, order: OrderType) {
        if !self.state.has_position() {
            self.logs
                .push("warning: SELL skipped, no open position".to_string());
            return;
        }

        let price = self.snapshot.price();
        let fraction = (amount.percentage / 100.0).min(1.0);
        let quantity = self.state.position_size * fraction;
        if quantity <= 0.0 || !quantity.is_finite() {
            self.logs
                .push("warning: SELL skipped, computed quantity is not positive".to_string());
            return;
        }

        let proceeds = quantity * price;
        self.state.balance += proceeds;
        if fraction >= 1.0 {
            self.state.position_size = 0.0;
            self.state.entry_price = None;
            self.state.stop_loss = None;
            self.state.take_profit = None;
        } else {
            self.state.position_size -= quantity;
        }
        self.actions.push(ActionRecord::Sell {
            quantity,
            price,
            proceeds,
            order,
        });
    }

    fn exec_set_level(&mut self, is_stop: bool, offset: &PriceOffset) {
        let which = if is_stop { "STOP_LOSS" } else { "TAKE_PROFIT" };
        let Some(entry) = self.state.entry_price.filter(|_| self.state.has_position()) else {
            self.logs
                .push(format!("warning: SET {which} skipped, no open position"));
            return;
        };

        let factor = match offset.direction {
            OffsetDirection::Above => 1.0 + offset.percentage / 100.0,
            OffsetDirection::Below => 1.0 - offset.percentage / 100.0,
        };
        let level = entry * factor;
        if is_stop {
            self.state.stop_loss = Some(level);
            self.actions.push(ActionRecord::StopLossSet { level });
        } else {
            self.state.take_profit = Some(level);
            self.actions.push(ActionRecord::TakeProfitSet { level });
        }
    }
}
