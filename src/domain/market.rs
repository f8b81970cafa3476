//! Market state: a bounded candle window plus incrementally maintained
//! indicator accumulators.
//!
//! Indicators fold each close as it arrives, so a snapshot is O(keys)
//! regardless of how much history has flowed through. The previous tick's
//! resolved value of every tracked series is retained for crossing checks;
//! evicting old candles never disturbs the accumulators.

use std::collections::{HashMap, VecDeque};

use crate::domain::ast::SeriesKey;
use crate::domain::candle::Candle;
use crate::domain::error::MarketError;
use crate::domain::indicator::{EmaState, IndicatorKind, MacdState, RsiState};

/// Default candle window size; enough for every built-in lookback.
pub const DEFAULT_CAPACITY: usize = 200;

#[derive(Debug, Clone)]
pub struct MarketState {
    symbol: String,
    capacity: usize,
    candles: VecDeque<Candle>,
    ingested: usize,
    emas: HashMap<usize, EmaState>,
    rsis: HashMap<usize, RsiState>,
    macd: Option<MacdState>,
    previous: HashMap<SeriesKey, f64>,
}

impl MarketState {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self::with_capacity(symbol, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(symbol: impl Into<String>, capacity: usize) -> Self {
        MarketState {
            symbol: symbol.into(),
            capacity: capacity.max(1),
            candles: VecDeque::new(),
            ingested: 0,
            emas: HashMap::new(),
            rsis: HashMap::new(),
            macd: None,
            previous: HashMap::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Total candles ever ingested, not just those still in the window.
    pub fn ingested(&self) -> usize {
        self.ingested
    }

    pub fn last_candle(&self) -> Option<&Candle> {
        self.candles.back()
    }

    /// Register the series a strategy reads. Indicator accumulators start
    /// folding from the next ingested candle; tracking the same key twice
    /// is a no-op and never resets accumulated state.
    pub fn track(&mut self, keys: &[SeriesKey]) {
        for key in keys {
            if let SeriesKey::Indicator(kind) = key {
                match kind {
                    IndicatorKind::Ema(period) => {
                        self.emas
                            .entry(*period)
                            .or_insert_with(|| EmaState::new(*period));
                    }
                    IndicatorKind::Rsi(period) => {
                        self.rsis
                            .entry(*period)
                            .or_insert_with(|| RsiState::new(*period));
                    }
                    IndicatorKind::Macd | IndicatorKind::MacdHistogram => {
                        if self.macd.is_none() {
                            self.macd = Some(MacdState::new());
                        }
                    }
                }
            }
        }
    }

    /// Fold one candle into the window and every tracked accumulator.
    /// Timestamps must be non-decreasing; an equal timestamp is accepted.
    pub fn ingest(&mut self, candle: Candle) -> Result<(), MarketError> {
        if let Some(last) = self.candles.back() {
            if candle.timestamp < last.timestamp {
                return Err(MarketError::OutOfOrderSample {
                    symbol: self.symbol.clone(),
                    timestamp: candle.timestamp,
                    last: last.timestamp,
                });
            }
        }

        self.capture_previous();

        self.candles.push_back(candle);
        if self.candles.len() > self.capacity {
            self.candles.pop_front();
        }
        self.ingested += 1;

        let close = candle.close;
        for state in self.emas.values_mut() {
            *state = state.update(close);
        }
        for state in self.rsis.values_mut() {
            *state = state.update(close);
        }
        if let Some(state) = self.macd {
            self.macd = Some(state.update(close));
        }
        Ok(())
    }

    /// Current value of a tracked series, `None` while it is still warming
    /// up.
    pub fn resolve(&self, key: &SeriesKey) -> Option<f64> {
        match key {
            SeriesKey::Price => self.candles.back().map(|c| c.close),
            SeriesKey::Volume => self.candles.back().map(|c| c.volume),
            SeriesKey::Indicator(IndicatorKind::Ema(period)) => {
                self.emas.get(period).and_then(|s| s.value())
            }
            SeriesKey::Indicator(IndicatorKind::Rsi(period)) => {
                self.rsis.get(period).and_then(|s| s.value())
            }
            SeriesKey::Indicator(IndicatorKind::Macd) => self.macd.as_ref().and_then(|s| s.macd()),
            SeriesKey::Indicator(IndicatorKind::MacdHistogram) => {
                self.macd.as_ref().and_then(|s| s.histogram())
            }
        }
    }

    /// The value a series had on the previous tick.
    pub fn previous(&self, key: &SeriesKey) -> Option<f64> {
        self.previous.get(key).copied()
    }

    /// Resolve every requested series into an immutable snapshot. Fails if
    /// no candle has been ingested or any indicator lacks history.
    pub fn snapshot(&self, keys: &[SeriesKey]) -> Result<MarketSnapshot, MarketError> {
        let current = self
            .candles
            .back()
            .copied()
            .ok_or_else(|| MarketError::NoSamples {
                symbol: self.symbol.clone(),
            })?;

        let mut values = HashMap::new();
        let mut previous = HashMap::new();
        for key in keys {
            let value = self
                .resolve(key)
                .ok_or_else(|| MarketError::InsufficientHistory {
                    expr: key.to_string(),
                    have: self.ingested,
                    need: match key {
                        SeriesKey::Price | SeriesKey::Volume => 1,
                        SeriesKey::Indicator(kind) => kind.lookback(),
                    },
                })?;
            values.insert(*key, value);
            if let Some(prev) = self.previous(key) {
                previous.insert(*key, prev);
            }
        }

        Ok(MarketSnapshot::new(current, values, previous))
    }

    fn capture_previous(&mut self) {
        let Some(last) = self.candles.back() else {
            return;
        };
        self.previous.insert(SeriesKey::Price, last.close);
        self.previous.insert(SeriesKey::Volume, last.volume);

        for (period, state) in &self.emas {
            if let Some(value) = state.value() {
                self.previous
                    .insert(SeriesKey::Indicator(IndicatorKind::Ema(*period)), value);
            }
        }
        for (period, state) in &self.rsis {
            if let Some(value) = state.value() {
                self.previous
                    .insert(SeriesKey::Indicator(IndicatorKind::Rsi(*period)), value);
            }
        }
        if let Some(state) = &self.macd {
            if let Some(value) = state.macd() {
                self.previous
                    .insert(SeriesKey::Indicator(IndicatorKind::Macd), value);
            }
            if let Some(value) = state.histogram() {
                self.previous
                    .insert(SeriesKey::Indicator(IndicatorKind::MacdHistogram), value);
            }
        }
    }
}

/// Immutable view of the market at one tick: the latest candle plus the
/// resolved current and previous-tick values of the requested series.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSnapshot {
    current: Candle,
    values: HashMap<SeriesKey, f64>,
    previous: HashMap<SeriesKey, f64>,
}

impl MarketSnapshot {
    pub fn new(
        current: Candle,
        values: HashMap<SeriesKey, f64>,
        previous: HashMap<SeriesKey, f64>,
    ) -> Self {
        MarketSnapshot {
            current,
            values,
            previous,
        }
    }

    pub fn candle(&self) -> &Candle {
        &self.current
    }

    pub fn price(&self) -> f64 {
        self.current.close
    }

    pub fn volume(&self) -> f64 {
        self.current.volume
    }

    pub fn value(&self, key: &SeriesKey) -> Option<f64> {
        match key {
            SeriesKey::Price => Some(self.current.close),
            SeriesKey::Volume => Some(self.current.volume),
            key => self.values.get(key).copied(),
        }
    }

    pub fn previous(&self, key: &SeriesKey) -> Option<f64> {
        self.previous.get(key).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn candle(i: i64, close: f64) -> Candle {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Candle::new(
            start + Duration::hours(4 * i),
            close,
            close,
            close,
            close,
            1000.0,
        )
    }

    fn ingest_closes(market: &mut MarketState, closes: &[f64]) {
        for (i, close) in closes.iter().enumerate() {
            market.ingest(candle(i as i64, *close)).unwrap();
        }
    }

    #[test]
    fn rejects_out_of_order_timestamps() {
        let mut market = MarketState::new("ETHUSD");
        market.ingest(candle(5, 100.0)).unwrap();
        let err = market.ingest(candle(2, 101.0)).unwrap_err();
        assert!(matches!(err, MarketError::OutOfOrderSample { .. }));
    }

    #[test]
    fn accepts_equal_timestamps() {
        let mut market = MarketState::new("ETHUSD");
        market.ingest(candle(1, 100.0)).unwrap();
        market.ingest(candle(1, 101.0)).unwrap();
        assert_eq!(market.ingested(), 2);
    }

    #[test]
    fn eviction_does_not_disturb_indicators() {
        let key = SeriesKey::Indicator(IndicatorKind::Ema(3));
        let mut small = MarketState::with_capacity("X", 2);
        let mut large = MarketState::with_capacity("X", 100);
        small.track(&[key]);
        large.track(&[key]);
        let closes = [100.0, 101.0, 102.0, 103.0, 104.0, 105.0];
        ingest_closes(&mut small, &closes);
        ingest_closes(&mut large, &closes);
        assert_eq!(small.resolve(&key), large.resolve(&key));
        assert_eq!(small.last_candle(), large.last_candle());
    }

    #[test]
    fn snapshot_without_samples() {
        let market = MarketState::new("ETHUSD");
        let err = market.snapshot(&[SeriesKey::Price]).unwrap_err();
        assert!(matches!(err, MarketError::NoSamples { .. }));
    }

    #[test]
    fn snapshot_reports_insufficient_history() {
        let key = SeriesKey::Indicator(IndicatorKind::Ema(50));
        let mut market = MarketState::new("ETHUSD");
        market.track(&[key]);
        ingest_closes(&mut market, &[100.0; 10]);
        let err = market.snapshot(&[SeriesKey::Price, key]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "insufficient history for EMA(50): have 10 samples, need 50"
        );
    }

    #[test]
    fn snapshot_holds_current_and_previous_values() {
        let key = SeriesKey::Indicator(IndicatorKind::Ema(3));
        let mut market = MarketState::new("ETHUSD");
        market.track(&[key]);
        // seed 100, then 95, then 107.5 (k = 0.5)
        ingest_closes(&mut market, &[100.0, 100.0, 100.0, 90.0, 120.0]);

        let snapshot = market.snapshot(&[SeriesKey::Price, key]).unwrap();
        assert_eq!(snapshot.price(), 120.0);
        assert!((snapshot.value(&key).unwrap() - 107.5).abs() < f64::EPSILON);
        assert!((snapshot.previous(&key).unwrap() - 95.0).abs() < f64::EPSILON);
        assert_eq!(snapshot.previous(&SeriesKey::Price), Some(90.0));
    }

    #[test]
    fn first_tick_has_no_previous_values() {
        let mut market = MarketState::new("ETHUSD");
        market.ingest(candle(0, 100.0)).unwrap();
        let snapshot = market.snapshot(&[SeriesKey::Price]).unwrap();
        assert_eq!(snapshot.previous(&SeriesKey::Price), None);
    }

    #[test]
    fn tracking_twice_does_not_reset_state() {
        let key = SeriesKey::Indicator(IndicatorKind::Rsi(2));
        let mut market = MarketState::new("ETHUSD");
        market.track(&[key]);
        ingest_closes(&mut market, &[10.0, 11.0, 10.0]);
        let before = market.resolve(&key);
        market.track(&[key]);
        assert_eq!(market.resolve(&key), before);
        assert!(before.is_some());
    }
}
