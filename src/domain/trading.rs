//! Simulated account state and the trade/level actions the interpreter
//! records against it.

use std::fmt;

use serde::Serialize;

use crate::domain::ast::OrderType;

/// Mutable account state owned by the caller and threaded through each
/// evaluation. A closed position clears `entry_price`, `stop_loss` and
/// `take_profit`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradingState {
    pub balance: f64,
    pub position_size: f64,
    pub entry_price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}

impl TradingState {
    pub fn new(initial_balance: f64) -> Self {
        TradingState {
            balance: initial_balance,
            position_size: 0.0,
            entry_price: None,
            stop_loss: None,
            take_profit: None,
        }
    }

    pub fn has_position(&self) -> bool {
        self.position_size > 0.0
    }
}

/// One state-changing action taken during an evaluation, in execution
/// order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionRecord {
    Buy {
        quantity: f64,
        price: f64,
        cost: f64,
        order: OrderType,
    },
    Sell {
        quantity: f64,
        price: f64,
        proceeds: f64,
        order: OrderType,
    },
    StopLossSet {
        level: f64,
    },
    TakeProfitSet {
        level: f64,
    },
}

impl fmt::Display for ActionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionRecord::Buy {
                quantity,
                price,
                cost,
                order,
            } => write!(f, "BUY {quantity} @ {price} for {cost} ({order})"),
            ActionRecord::Sell {
                quantity,
                price,
                proceeds,
                order,
            } => write!(f, "SELL {quantity} @ {price} for {proceeds} ({order})"),
            ActionRecord::StopLossSet { level } => write!(f, "STOP_LOSS set at {level}"),
            ActionRecord::TakeProfitSet { level } => write!(f, "TAKE_PROFIT set at {level}"),
        }
    }
}
