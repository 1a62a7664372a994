//! Stochastic %K: where the close sits inside the recent high/low range,
//! `100 * (close - lowest_low) / (highest_high - lowest_low)`.

use super::{window_range, Indicator};
use crate::domain::Bar;

#[derive(Debug, Clone, Copy)]
pub struct StochasticK {
    period: usize,
}

impl StochasticK {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "stochastic period must be >= 1");
        Self { period }
    }
}

impl Indicator for StochasticK {
    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        (0..bars.len())
            .map(|i| match window_range(bars, i, self.period) {
                Some((low, high)) if high > low => 100.0 * (bars[i].close - low) / (high - low),
                _ => f64::NAN,
            })
            .collect()
    }
}
