//! Feature schema: the explicit, ordered list of named model inputs.

use crate::domain::DailyRecord;
use serde::{Deserialize, Serialize};

/// Ordered feature names. The order is the order of the model's input vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSchema {
    names: Vec<String>,
}

/// The column set the reference models were trained on.
pub const CLASSIC_FEATURES: [&str; 6] = [
    "RSI",
    "k_percent",
    "r_percent",
    "Price_Rate_Of_Change",
    "MACD",
    "On Balance Volume",
];

impl FeatureSchema {
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn classic() -> Self {
        Self::new(CLASSIC_FEATURES)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// First name that appears more than once, if any.
    pub fn duplicate(&self) -> Option<&str> {
        self.names
            .iter()
            .enumerate()
            .find(|(i, n)| self.names[..*i].contains(n))
            .map(|(_, n)| n.as_str())
    }

    /// Build the ordered input vector for one record.
    ///
    /// Returns the first missing feature name on failure. A NaN value counts
    /// as missing.
    pub fn extract(&self, record: &DailyRecord) -> Result<Vec<f64>, String> {
        self.names
            .iter()
            .map(|name| match record.feature(name) {
                Some(v) if !v.is_nan() => Ok(v),
                _ => Err(name.clone()),
            })
            .collect()
    }
}
