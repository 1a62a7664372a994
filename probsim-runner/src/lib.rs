//! probsim runner: simulation orchestration on top of `probsim-core`.
//!
//! This crate provides:
//! - TOML configuration with content-addressed run ids
//! - CSV loading (feature files or OHLCV with derived indicators), synthetic
//!   data, and dataset hashing
//! - Model adapters (constant, logistic artifact, momentum baseline)
//! - A single-run runner producing a `SimulationReport`
//! - Performance metrics and threshold sweeps
//! - Artifact export (JSON, CSV, Parquet) and terminal summaries

pub mod config;
pub mod data_loader;
pub mod metrics;
pub mod models;
pub mod reporting;
pub mod runner;
pub mod sweep;

pub use config::{AssetConfig, ConfigError, ModelSpec, SimulationConfig, SimulationSection};
pub use data_loader::{load_universe, LoadError, LoadedData};
pub use metrics::PerformanceMetrics;
pub use models::{build_model, LogisticArtifact, LogisticModel, ModelLoadError, MomentumModel};
pub use reporting::{format_summary, format_sweep_table, save_artifacts, ArtifactPaths};
pub use runner::{
    build_engine, build_models, run_from_config, run_with_data, RunError, SimulationReport,
};
pub use sweep::{ParamSweep, SweepResults, ThresholdGrid};
