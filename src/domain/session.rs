//! A live strategy session: one strategy bound to market and trading state.
//!
//! The session owns the wiring the CLI and tests need: it registers the
//! strategy's series with the market state up front, feeds candles in, and
//! dispatches events with a snapshot scoped to the handler being run, so a
//! cold indicator used by one handler never blocks another.

use crate::domain::ast::{EventKind, Strategy};
use crate::domain::candle::Candle;
use crate::domain::error::MarketError;
use crate::domain::interpreter::{evaluate, ExecutionResult};
use crate::domain::market::{MarketState, DEFAULT_CAPACITY};
use crate::domain::trading::TradingState;

#[derive(Debug, Clone)]
pub struct Session {
    strategy: Strategy,
    market: MarketState,
    trading: TradingState,
}

impl Session {
    pub fn new(strategy: Strategy, initial_balance: f64) -> Self {
        Self::with_capacity(strategy, initial_balance, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(strategy: Strategy, initial_balance: f64, capacity: usize) -> Self {
        let mut market = MarketState::with_capacity(strategy.symbol.clone(), capacity);
        market.track(&strategy.series_keys());
        Session {
            strategy,
            market,
            trading: TradingState::new(initial_balance),
        }
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    pub fn market(&self) -> &MarketState {
        &self.market
    }

    pub fn trading(&self) -> &TradingState {
        &self.trading
    }

    pub fn ingest(&mut self, candle: Candle) -> Result<(), MarketError> {
        self.market.ingest(candle)
    }

    /// Run the handler for one event against the current market state. The
    /// snapshot only resolves the series that handler reads.
    pub fn dispatch(&mut self, event: EventKind) -> ExecutionResult {
        if self.strategy.handler(event).is_none() {
            return ExecutionResult::empty(&self.trading);
        }
        let keys = self.strategy.series_keys_for(event);
        match self.market.snapshot(&keys) {
            Ok(snapshot) => evaluate(&self.strategy, event, &snapshot, &mut self.trading),
            Err(err) => ExecutionResult::failed(&self.trading, err.to_string()),
        }
    }
}
