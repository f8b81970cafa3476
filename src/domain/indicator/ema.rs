//! Exponential moving average.
//!
//! Seeded with the simple average of the first `period` closes, then smoothed
//! with k = 2 / (period + 1).

/// Running EMA accumulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmaState {
    period: usize,
    count: usize,
    seed_sum: f64,
    value: Option<f64>,
}

impl EmaState {
    pub fn new(period: usize) -> Self {
        EmaState {
            period,
            count: 0,
            seed_sum: 0.0,
            value: None,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Fold one close into the accumulator.
    #[must_use]
    pub fn update(mut self, close: f64) -> Self {
        self.count += 1;
        match self.value {
            Some(prev) => {
                let k = 2.0 / (self.period as f64 + 1.0);
                self.value = Some((close - prev) * k + prev);
            }
            None => {
                self.seed_sum += close;
                if self.count == self.period {
                    self.value = Some(self.seed_sum / self.period as f64);
                }
            }
        }
        self
    }

    /// `None` until `period` closes have been seen.
    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fold(period: usize, closes: &[f64]) -> EmaState {
        closes
            .iter()
            .fold(EmaState::new(period), |state, &c| state.update(c))
    }

    #[test]
    fn no_value_before_period() {
        let state = fold(3, &[100.0, 101.0]);
        assert_eq!(state.value(), None);
    }

    #[test]
    fn seed_is_simple_average() {
        let state = fold(3, &[100.0, 102.0, 104.0]);
        approx::assert_abs_diff_eq!(state.value().unwrap(), 102.0);
    }

    #[test]
    fn smoothing_after_seed() {
        // period 3 => k = 0.5; seed 100, then (90-100)*0.5+100 = 95,
        // then (120-95)*0.5+95 = 107.5
        let state = fold(3, &[100.0, 100.0, 100.0, 90.0, 120.0]);
        approx::assert_abs_diff_eq!(state.value().unwrap(), 107.5);
    }

    #[test]
    fn constant_series_stays_constant() {
        let state = fold(5, &[42.0; 40]);
        approx::assert_abs_diff_eq!(state.value().unwrap(), 42.0, epsilon = 1e-9);
    }
}
