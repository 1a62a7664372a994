//! Market snapshot provider trait and structured error types.
//!
//! The engine reads market data only through `MarketSnapshotProvider`, so
//! tests can hand it an in-memory table and the runner can hand it aligned
//! CSV data.

use crate::domain::DailyRecord;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum DataError {
    #[error("no symbols supplied")]
    NoSymbols,

    #[error("symbol '{symbol}' has no records")]
    EmptySeries { symbol: String },

    #[error("invalid date range: {start} is after {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
}

/// Day-indexed access to per-asset daily records.
pub trait MarketSnapshotProvider: Send + Sync {
    /// Number of trading days.
    fn day_count(&self) -> usize;

    /// Calendar date of `day`, if the provider is date-indexed.
    fn date(&self, day: usize) -> Option<NaiveDate>;

    /// The record for `symbol` on `day`, or `None` if there is no data.
    fn snapshot(&self, symbol: &str, day: usize) -> Option<&DailyRecord>;
}
