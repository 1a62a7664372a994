use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Holdings value of one asset at the close of one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetValue {
    pub symbol: String,
    pub holdings: f64,
    pub value: f64,
    /// False when the asset was skipped and `value` was carried forward.
    pub traded: bool,
}

/// One row of the simulation output series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationStep {
    pub day: usize,
    pub date: Option<NaiveDate>,
    /// Per-asset holdings values, in configured asset order.
    pub assets: Vec<AssetValue>,
    pub cash: f64,
    /// cash + sum(holdings value) - initial capital.
    pub net_value: f64,
    /// Sum of the day's closing prices (diagnostic only).
    pub price_sum: f64,
}

impl SimulationStep {
    pub fn holdings_value(&self) -> f64 {
        self.assets.iter().map(|a| a.value).sum()
    }

    pub fn value_of(&self, symbol: &str) -> Option<f64> {
        self.assets.iter().find(|a| a.symbol == symbol).map(|a| a.value)
    }
}
