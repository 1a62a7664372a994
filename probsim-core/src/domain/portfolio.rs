//! PortfolioState: shared cash balance plus per-asset holdings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate portfolio state.
///
/// Holdings are quantities in (fractional) shares. Trade execution conserves
/// `cash + holdings * price` at the trade price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioState {
    pub cash: f64,
    pub initial_capital: f64,
    pub holdings: BTreeMap<String, f64>,
}

impl PortfolioState {
    /// New state with all of `symbols` at zero holdings.
    pub fn new<S: AsRef<str>>(initial_capital: f64, symbols: &[S]) -> Self {
        Self {
            cash: initial_capital,
            initial_capital,
            holdings: symbols
                .iter()
                .map(|s| (s.as_ref().to_string(), 0.0))
                .collect(),
        }
    }

    pub fn holdings_of(&self, symbol: &str) -> f64 {
        self.holdings.get(symbol).copied().unwrap_or(0.0)
    }
}
