//! Runner: wires config, data, models, and the engine into one report.
//!
//! Two entry points:
//! - `run_from_config()`: loads data from the configured CSVs, then runs.
//!   Used by the CLI.
//! - `run_with_data()`: takes pre-loaded data and pre-built models. Used by
//!   sweeps so each grid point reuses the same inputs.

use chrono::{DateTime, Utc};
use probsim_core::engine::{EngineError, SimulationEngine, SimulationResult, TrackedAsset};
use probsim_core::model::SignalModel;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::config::{ConfigError, SimulationConfig};
use crate::data_loader::{load_universe, LoadError, LoadedData};
use crate::metrics::PerformanceMetrics;
use crate::models::{build_model, ModelLoadError};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Load(#[from] LoadError),
    #[error("model error: {0}")]
    Model(#[from] ModelLoadError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

/// A model shared by every run that uses the same config.
pub type SharedModel = (String, Arc<dyn SignalModel>);

/// Complete output of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: String,
    pub dataset_hash: String,
    pub config: SimulationConfig,
    pub result: SimulationResult,
    pub metrics: PerformanceMetrics,
    pub generated_at: DateTime<Utc>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Load data and models for `config` and run it once.
pub fn run_from_config(config: &SimulationConfig) -> Result<SimulationReport, RunError> {
    config.validate()?;
    let data = load_universe(config)?;
    let models = build_models(config)?;
    run_with_data(config, &data, &models)
}

/// Build one model per asset, in configured order.
pub fn build_models(config: &SimulationConfig) -> Result<Vec<SharedModel>, RunError> {
    let schema = config.schema();
    config
        .assets
        .iter()
        .map(|asset| {
            let model = build_model(&asset.model, &schema, &config.base_dir)?;
            Ok((asset.symbol.clone(), model))
        })
        .collect()
}

/// Assemble an engine from `config` and already-built models.
pub fn build_engine(
    config: &SimulationConfig,
    models: &[SharedModel],
) -> Result<SimulationEngine, RunError> {
    let assets = models
        .iter()
        .map(|(symbol, model)| {
            let model: Box<dyn SignalModel> = Box::new(Arc::clone(model));
            TrackedAsset::new(symbol.clone(), model)
        })
        .collect();
    Ok(SimulationEngine::new(
        config.engine_config(),
        assets,
        config.schema(),
    )?)
}

/// Run against pre-loaded data. Every call starts from fresh portfolio state.
pub fn run_with_data(
    config: &SimulationConfig,
    data: &LoadedData,
    models: &[SharedModel],
) -> Result<SimulationReport, RunError> {
    let run_id = config.run_id()?;
    let engine = build_engine(config, models)?;
    let result = engine.run(&data.aligned)?;
    let metrics = PerformanceMetrics::compute(&result, config.simulation.initial_capital);

    tracing::info!(
        run_id = %&run_id[..12],
        days = metrics.trading_days,
        final_net_value = metrics.final_net_value,
        total_return = metrics.total_return,
        "run complete"
    );

    Ok(SimulationReport {
        schema_version: SCHEMA_VERSION,
        run_id,
        dataset_hash: data.dataset_hash.clone(),
        config: config.clone(),
        result,
        metrics,
        generated_at: Utc::now(),
    })
}
