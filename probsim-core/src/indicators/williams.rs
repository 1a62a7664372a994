//! Williams %R: `-100 * (highest_high - close) / (highest_high - lowest_low)`.
//! Ranges over `[-100, 0]`.

use super::{window_range, Indicator};
use crate::domain::Bar;

#[derive(Debug, Clone, Copy)]
pub struct WilliamsR {
    period: usize,
}

impl WilliamsR {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "Williams %R period must be >= 1");
        Self { period }
    }
}

impl Indicator for WilliamsR {
    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        (0..bars.len())
            .map(|i| match window_range(bars, i, self.period) {
                Some((low, high)) if high > low => -100.0 * (high - bars[i].close) / (high - low),
                _ => f64::NAN,
            })
            .collect()
    }
}
