//! Reporting and artifact export pipeline.

pub mod export;
pub mod summary;

pub use export::{save_artifacts, write_sweep_csv, ArtifactPaths, RunManifest};
pub use summary::{format_summary, format_sweep_table};
