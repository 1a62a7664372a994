//! Relative Strength Index with Wilder smoothing.
//!
//! `RSI = 100 - 100 / (1 + avg_gain / avg_loss)`. A flat window reads 50.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone, Copy)]
pub struct Rsi {
    period: usize,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self { period }
    }
}

impl Indicator for Rsi {
    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let p = self.period;
        let mut out = vec![f64::NAN; n];
        if n <= p {
            return out;
        }

        let deltas: Vec<f64> = bars.windows(2).map(|w| w[1].close - w[0].close).collect();
        if deltas[..p].iter().any(|d| d.is_nan()) {
            return out;
        }

        let mut avg_gain = deltas[..p].iter().map(|d| d.max(0.0)).sum::<f64>() / p as f64;
        let mut avg_loss = deltas[..p].iter().map(|d| (-d).max(0.0)).sum::<f64>() / p as f64;
        out[p] = rsi_value(avg_gain, avg_loss);

        let k = 1.0 / p as f64;
        for i in (p + 1)..n {
            let d = deltas[i - 1];
            if d.is_nan() {
                break;
            }
            avg_gain += k * (d.max(0.0) - avg_gain);
            avg_loss += k * ((-d).max(0.0) - avg_loss);
            out[i] = rsi_value(avg_gain, avg_loss);
        }
        out
    }
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    match (avg_gain == 0.0, avg_loss == 0.0) {
        (true, true) => 50.0,
        (_, true) => 100.0,
        (true, _) => 0.0,
        _ => 100.0 - 100.0 / (1.0 + avg_gain / avg_loss),
    }
}
