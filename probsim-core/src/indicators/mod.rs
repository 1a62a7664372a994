//! Technical indicators used to derive model features from raw OHLCV bars.
//!
//! Every indicator maps a bar slice to a series of the same length. Values
//! inside the warmup window are NaN; `derive_feature_records` drops NaN
//! values so those days simply lack the feature.

pub mod ema;
pub mod macd;
pub mod obv;
pub mod roc;
pub mod rsi;
pub mod stochastic;
pub mod williams;

pub use ema::Ema;
pub use macd::Macd;
pub use obv::OnBalanceVolume;
pub use roc::Roc;
pub use rsi::Rsi;
pub use stochastic::StochasticK;
pub use williams::WilliamsR;

use crate::domain::{Bar, DailyRecord};
use crate::features::CLASSIC_FEATURES;

/// An indicator computed over a whole bar series at once.
pub trait Indicator: Send + Sync {
    /// Number of leading bars that produce NaN.
    fn lookback(&self) -> usize;

    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// The indicator set behind the classic feature columns, paired with the
/// column name each one fills.
pub fn classic_indicators() -> Vec<(&'static str, Box<dyn Indicator>)> {
    let [rsi, k, r, roc, macd, obv] = CLASSIC_FEATURES;
    vec![
        (rsi, Box::new(Rsi::new(14)) as Box<dyn Indicator>),
        (k, Box::new(StochasticK::new(14))),
        (r, Box::new(WilliamsR::new(14))),
        (roc, Box::new(Roc::new(9))),
        (macd, Box::new(Macd::new(12, 26))),
        (obv, Box::new(OnBalanceVolume)),
    ]
}

/// Index of the first bar at which every classic feature is defined.
pub fn classic_warmup() -> usize {
    classic_indicators()
        .iter()
        .map(|(_, ind)| ind.lookback())
        .max()
        .unwrap_or(0)
}

/// Turn bars into daily records carrying the classic feature columns.
///
/// Bars must be sorted by date. Warmup values are left out of the feature map.
pub fn derive_feature_records(bars: &[Bar]) -> Vec<DailyRecord> {
    let columns: Vec<(&str, Vec<f64>)> = classic_indicators()
        .into_iter()
        .map(|(name, ind)| (name, ind.compute(bars)))
        .collect();

    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let mut record = DailyRecord::new(bar.date, bar.close);
            for (name, values) in &columns {
                let v = values[i];
                if v.is_finite() {
                    record.features.insert((*name).to_string(), v);
                }
            }
            record
        })
        .collect()
}

/// Lowest low and highest high over the `period` bars ending at `i`.
pub(crate) fn window_range(bars: &[Bar], i: usize, period: usize) -> Option<(f64, f64)> {
    let start = (i + 1).checked_sub(period)?;
    let mut low = f64::INFINITY;
    let mut high = f64::NEG_INFINITY;
    for bar in &bars[start..=i] {
        if bar.low.is_nan() || bar.high.is_nan() {
            return None;
        }
        low = low.min(bar.low);
        high = high.max(bar.high);
    }
    Some((low, high))
}

/// Synthetic bars from closes: open = previous close, range of one point
/// either side, constant volume.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
