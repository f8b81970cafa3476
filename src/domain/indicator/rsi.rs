//! Relative strength index with Wilder smoothing.
//!
//! The first `period` changes seed the averages with a simple mean; later
//! changes use `avg = (avg * (period - 1) + current) / period`. When the
//! average loss is zero the RSI saturates at 100.

/// Running RSI accumulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsiState {
    period: usize,
    prev_close: Option<f64>,
    changes: usize,
    gain_sum: f64,
    loss_sum: f64,
    avg_gain: Option<f64>,
    avg_loss: Option<f64>,
}

impl RsiState {
    pub fn new(period: usize) -> Self {
        RsiState {
            period,
            prev_close: None,
            changes: 0,
            gain_sum: 0.0,
            loss_sum: 0.0,
            avg_gain: None,
            avg_loss: None,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Fold one close into the accumulator.
    #[must_use]
    pub fn update(mut self, close: f64) -> Self {
        if let Some(prev) = self.prev_close {
            let change = close - prev;
            let gain = change.max(0.0);
            let loss = (-change).max(0.0);
            self.changes += 1;

            match (self.avg_gain, self.avg_loss) {
                (Some(avg_gain), Some(avg_loss)) => {
                    let p = self.period as f64;
                    self.avg_gain = Some((avg_gain * (p - 1.0) + gain) / p);
                    self.avg_loss = Some((avg_loss * (p - 1.0) + loss) / p);
                }
                _ => {
                    self.gain_sum += gain;
                    self.loss_sum += loss;
                    if self.changes == self.period {
                        self.avg_gain = Some(self.gain_sum / self.period as f64);
                        self.avg_loss = Some(self.loss_sum / self.period as f64);
                    }
                }
            }
        }
        self.prev_close = Some(close);
        self
    }

    /// `None` until `period + 1` closes have been seen.
    pub fn value(&self) -> Option<f64> {
        let avg_gain = self.avg_gain?;
        let avg_loss = self.avg_loss?;
        if avg_loss == 0.0 {
            return Some(100.0);
        }
        let rs = avg_gain / avg_loss;
        Some(100.0 - 100.0 / (1.0 + rs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fold(period: usize, closes: &[f64]) -> RsiState {
        closes
            .iter()
            .fold(RsiState::new(period), |state, &c| state.update(c))
    }

    #[test]
    fn no_value_before_period_plus_one() {
        let state = fold(14, &[100.0; 14]);
        assert_eq!(state.value(), None);
    }

    #[test]
    fn all_gains_saturate_at_100() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let state = fold(14, &closes);
        assert!((state.value().unwrap() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn balanced_gains_and_losses_read_50() {
        let state = fold(2, &[10.0, 11.0, 10.0]);
        assert!((state.value().unwrap() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn wilder_smoothing_after_seed() {
        // seed over two changes (+1, -1): avg_gain 0.5, avg_loss 0.5;
        // next change +2: avg_gain (0.5 + 2) / 2 = 1.25, avg_loss 0.25,
        // RS = 5, RSI = 100 - 100/6
        let state = fold(2, &[10.0, 11.0, 10.0, 12.0]);
        let expected = 100.0 - 100.0 / 6.0;
        approx::assert_abs_diff_eq!(state.value().unwrap(), expected, epsilon = 1e-9);
    }
}
