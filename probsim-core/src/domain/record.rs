//! DailyRecord: one asset's feature row and closing price for one day.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single day of market data for one asset.
///
/// Features are keyed by name. A feature that is absent from the map (empty
/// CSV cell, indicator still warming up) makes the asset skip that day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub close: f64,
    pub features: BTreeMap<String, f64>,
}

impl DailyRecord {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            close,
            features: BTreeMap::new(),
        }
    }

    /// Builder-style feature insertion.
    pub fn with_feature(mut self, name: impl Into<String>, value: f64) -> Self {
        self.features.insert(name.into(), value);
        self
    }

    pub fn feature(&self, name: &str) -> Option<f64> {
        self.features.get(name).copied()
    }

    /// A close price the ledger can divide by.
    pub fn has_valid_close(&self) -> bool {
        self.close.is_finite() && self.close > 0.0
    }
}
