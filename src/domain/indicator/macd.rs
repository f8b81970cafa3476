//! MACD (12/26/9): fast EMA minus slow EMA, a signal EMA over the MACD
//! series, and the histogram (MACD minus signal).

use crate::domain::indicator::ema::EmaState;

pub const FAST_PERIOD: usize = 12;
pub const SLOW_PERIOD: usize = 26;
pub const SIGNAL_PERIOD: usize = 9;

/// Running MACD accumulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdState {
    fast: EmaState,
    slow: EmaState,
    signal: EmaState,
}

impl MacdState {
    pub fn new() -> Self {
        MacdState {
            fast: EmaState::new(FAST_PERIOD),
            slow: EmaState::new(SLOW_PERIOD),
            signal: EmaState::new(SIGNAL_PERIOD),
        }
    }

    /// Fold one close into all three accumulators. The signal line only sees
    /// input once both underlying EMAs are producing values.
    #[must_use]
    pub fn update(mut self, close: f64) -> Self {
        self.fast = self.fast.update(close);
        self.slow = self.slow.update(close);
        if let (Some(fast), Some(slow)) = (self.fast.value(), self.slow.value()) {
            self.signal = self.signal.update(fast - slow);
        }
        self
    }

    /// MACD line; `None` until the slow EMA is seeded (26 closes).
    pub fn macd(&self) -> Option<f64> {
        Some(self.fast.value()? - self.slow.value()?)
    }

    /// Signal line; `None` until 9 MACD values exist (34 closes).
    pub fn signal(&self) -> Option<f64> {
        self.signal.value()
    }

    /// MACD minus signal.
    pub fn histogram(&self) -> Option<f64> {
        Some(self.macd()? - self.signal()?)
    }
}

impl Default for MacdState {
    fn default() -> Self {
        MacdState::new()
    }
}
