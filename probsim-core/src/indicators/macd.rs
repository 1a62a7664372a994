//! MACD line: fast EMA minus slow EMA of the close.

use super::ema::ema_of_series;
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone, Copy)]
pub struct Macd {
    fast: usize,
    slow: usize,
}

impl Macd {
    pub fn new(fast: usize, slow: usize) -> Self {
        assert!(fast >= 1 && slow > fast, "MACD needs 1 <= fast < slow");
        Self { fast, slow }
    }
}

impl Indicator for Macd {
    fn lookback(&self) -> usize {
        self.slow - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let fast = ema_of_series(&closes, self.fast);
        let slow = ema_of_series(&closes, self.slow);
        fast.iter().zip(&slow).map(|(f, s)| f - s).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn nan_until_slow_ema_seeds() {
        let closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let out = Macd::new(2, 5).compute(&make_bars(&closes));
        assert!(out[3].is_nan());
        assert!(out[4].is_finite());
    }

    #[test]
    fn uptrend_is_positive() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + 2.0 * i as f64).collect();
        let out = Macd::new(3, 8).compute(&make_bars(&closes));
        assert!(out[29] > 0.0);
    }

    #[test]
    fn flat_is_zero() {
        let out = Macd::new(2, 4).compute(&make_bars(&[5.0; 8]));
        assert!(out[7].abs() < 1e-12);
    }
}
