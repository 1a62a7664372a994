//! Exponential moving average, seeded with the simple average of the first
//! `period` closes. `alpha = 2 / (period + 1)`.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone, Copy)]
pub struct Ema {
    period: usize,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self { period }
    }
}

impl Indicator for Ema {
    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        ema_of_series(&closes, self.period)
    }
}

/// EMA of an arbitrary series. A NaN input taints every later output.
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let seed_window = &values[..period];
    if seed_window.iter().any(|v| v.is_nan()) {
        return out;
    }
    let mut prev = seed_window.iter().sum::<f64>() / period as f64;
    out[period - 1] = prev;

    let alpha = 2.0 / (period as f64 + 1.0);
    for (slot, &v) in out.iter_mut().zip(values).skip(period) {
        if v.is_nan() {
            break;
        }
        prev = alpha * v + (1.0 - alpha) * prev;
        *slot = prev;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn period_one_tracks_close() {
        let out = Ema::new(1).compute(&make_bars(&[5.0, 7.0, 9.0]));
        assert_eq!(out, vec![5.0, 7.0, 9.0]);
    }

    #[test]
    fn seeded_with_sma() {
        // alpha = 0.5, seed = mean(10, 11, 12) = 11
        let out = ema_of_series(&[10.0, 11.0, 12.0, 13.0, 14.0], 3);
        assert!(out[1].is_nan());
        assert_approx(out[2], 11.0, DEFAULT_EPSILON);
        assert_approx(out[3], 12.0, DEFAULT_EPSILON);
        assert_approx(out[4], 13.0, DEFAULT_EPSILON);
    }

    #[test]
    fn nan_after_seed_stops_series() {
        let out = ema_of_series(&[10.0, 11.0, 12.0, f64::NAN, 14.0], 3);
        assert_approx(out[2], 11.0, DEFAULT_EPSILON);
        assert!(out[3].is_nan());
        assert!(out[4].is_nan());
    }

    #[test]
    fn short_input_is_all_nan() {
        assert!(ema_of_series(&[1.0, 2.0], 3).iter().all(|v| v.is_nan()));
        assert_eq!(Ema::new(20).lookback(), 19);
    }
}
