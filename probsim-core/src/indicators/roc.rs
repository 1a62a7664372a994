//! Price rate of change: fractional change over `period` bars,
//! `(close[t] - close[t-period]) / close[t-period]`.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone, Copy)]
pub struct Roc {
    period: usize,
}

impl Roc {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ROC period must be >= 1");
        Self { period }
    }
}

impl Indicator for Roc {
    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut out = vec![f64::NAN; bars.len()];
        for (i, slot) in out.iter_mut().enumerate().skip(self.period) {
            let base = bars[i - self.period].close;
            if base != 0.0 {
                *slot = (bars[i].close - base) / base;
            }
        }
        out
    }
}
