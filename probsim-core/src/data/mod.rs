//! Market data access: the snapshot provider trait and calendar alignment.

pub mod align;
pub mod provider;

pub use align::{align_records, AlignedData, AlignmentMode};
pub use provider::{DataError, MarketSnapshotProvider};
