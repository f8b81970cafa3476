//! Incremental technical indicators.
//!
//! Each indicator is a small value type with a pure `update(self, close) ->
//! Self` step, so the market state can fold one candle at a time in O(1)
//! without retaining full price series. `value()` is `None` until the
//! indicator has seen enough closes to be seeded.

pub mod ema;
pub mod macd;
pub mod rsi;

pub use ema::EmaState;
pub use macd::MacdState;
pub use rsi::RsiState;

use std::fmt;

/// Identity of an indicator as referenced from a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorKind {
    Ema(usize),
    Rsi(usize),
    Macd,
    MacdHistogram,
}

impl IndicatorKind {
    /// Minimum number of candles before this indicator produces a value.
    pub fn lookback(&self) -> usize {
        match self {
            IndicatorKind::Ema(period) => *period,
            // RSI needs `period` changes, so one extra close.
            IndicatorKind::Rsi(period) => period + 1,
            IndicatorKind::Macd => macd::SLOW_PERIOD,
            IndicatorKind::MacdHistogram => macd::SLOW_PERIOD + macd::SIGNAL_PERIOD - 1,
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorKind::Ema(period) => write!(f, "EMA({period})"),
            IndicatorKind::Rsi(period) => write!(f, "RSI({period})"),
            IndicatorKind::Macd => write!(f, "MACD"),
            IndicatorKind::MacdHistogram => write!(f, "MACD_HISTOGRAM"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookbacks() {
        assert_eq!(IndicatorKind::Ema(50).lookback(), 50);
        assert_eq!(IndicatorKind::Rsi(14).lookback(), 15);
        assert_eq!(IndicatorKind::Macd.lookback(), 26);
        assert_eq!(IndicatorKind::MacdHistogram.lookback(), 34);
    }

    #[test]
    fn display_matches_script_syntax() {
        assert_eq!(IndicatorKind::Ema(50).to_string(), "EMA(50)");
        assert_eq!(IndicatorKind::Rsi(14).to_string(), "RSI(14)");
        assert_eq!(IndicatorKind::Macd.to_string(), "MACD");
        assert_eq!(IndicatorKind::MacdHistogram.to_string(), "MACD_HISTOGRAM");
    }
}
