use super::decision::Action;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Record of one executed (non-Hold) trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub day: usize,
    pub date: Option<NaiveDate>,
    pub symbol: String,
    pub action: Action,
    /// Currency actually transacted (after any cash clamp).
    pub amount: f64,
    /// Currency the policy asked for.
    pub requested: f64,
    pub shares: f64,
    pub price: f64,
    pub holdings_after: f64,
    pub cash_after: f64,
    /// True when the buy was reduced to the available cash.
    pub clamped: bool,
}
