//! On-balance volume: running total of volume, added on up closes and
//! subtracted on down closes. Starts at zero on the first bar.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone, Copy, Default)]
pub struct OnBalanceVolume;

impl Indicator for OnBalanceVolume {
    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut out = Vec::with_capacity(bars.len());
        let mut total = 0.0;
        for (i, bar) in bars.iter().enumerate() {
            if i > 0 {
                let prev = bars[i - 1].close;
                if bar.close > prev {
                    total += bar.volume;
                } else if bar.close < prev {
                    total -= bar.volume;
                }
            }
            out.push(total);
        }
        out
    }
}
