//! Serializable simulation configuration, loaded from TOML.
//!
//! ```toml
//! features = ["RSI", "k_percent", "r_percent", "Price_Rate_Of_Change", "MACD", "On Balance Volume"]
//!
//! [simulation]
//! initial_capital = 1000.0
//! sample_size = 75
//!
//! [policy]
//! up_threshold = 0.6
//!
//! [[assets]]
//! symbol = "AAPL"
//! data = "data/AAPL_price_data.csv"
//! model = { type = "logistic", path = "models/AAPL_model.json" }
//! ```
//!
//! Relative `data` and model paths resolve against the config file's
//! directory.

use chrono::NaiveDate;
use probsim_core::data::AlignmentMode;
use probsim_core::engine::EngineConfig;
use probsim_core::features::{FeatureSchema, CLASSIC_FEATURES};
use probsim_core::ledger::CashPolicy;
use probsim_core::policy::{PolicyConfig, PolicyError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Content-addressed identifier of a configuration.
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid policy: {0}")]
    Policy(#[from] PolicyError),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Run-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSection {
    pub initial_capital: f64,
    /// Simulate only the last `n` aligned days.
    pub sample_size: Option<usize>,
    pub alignment: AlignmentMode,
    pub cash_policy: CashPolicy,
    /// Inclusive date filter applied before `sample_size`.
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            initial_capital: 1_000.0,
            sample_size: None,
            alignment: AlignmentMode::Intersection,
            cash_policy: CashPolicy::Clamp,
            start_date: None,
            end_date: None,
        }
    }
}

/// How an asset's probabilities are produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelSpec {
    /// Fixed `(1 - prob_up, prob_up)` regardless of features.
    Constant { prob_up: f64 },
    /// Logistic regression artifact in JSON.
    Logistic { path: PathBuf },
    /// `p_up = sigmoid(scale * feature)`.
    Momentum { feature: String, scale: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetConfig {
    pub symbol: String,
    /// CSV file with a `date` and `close` column.
    pub data: PathBuf,
    /// Compute the classic indicator columns from OHLCV instead of reading
    /// precomputed feature columns.
    #[serde(default)]
    pub derive_features: bool,
    pub model: ModelSpec,
}

/// Everything needed to reproduce one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_features")]
    pub features: Vec<String>,
    #[serde(default)]
    pub simulation: SimulationSection,
    #[serde(default)]
    pub policy: PolicyConfig,
    pub assets: Vec<AssetConfig>,
    /// Directory relative paths resolve against. Not part of the run id.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

fn default_features() -> Vec<String> {
    CLASSIC_FEATURES.iter().map(|s| s.to_string()).collect()
}

impl SimulationConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(config)
    }

    /// Parse and validate a TOML string. Relative paths resolve against the
    /// current directory.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let sim = &self.simulation;
        if !sim.initial_capital.is_finite() || sim.initial_capital <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "initial_capital must be positive, got {}",
                sim.initial_capital
            )));
        }
        if sim.sample_size == Some(0) {
            return Err(ConfigError::Invalid("sample_size must be at least 1".into()));
        }
        if let (Some(start), Some(end)) = (sim.start_date, sim.end_date) {
            if start > end {
                return Err(ConfigError::Invalid(format!(
                    "start_date {start} is after end_date {end}"
                )));
            }
        }
        self.policy.validate()?;

        if self.features.is_empty() {
            return Err(ConfigError::Invalid("features must not be empty".into()));
        }
        if let Some(dup) = self.schema().duplicate() {
            return Err(ConfigError::Invalid(format!("duplicate feature '{dup}'")));
        }

        if self.assets.is_empty() {
            return Err(ConfigError::Invalid("at least one asset is required".into()));
        }
        let mut seen = HashSet::new();
        for asset in &self.assets {
            if asset.symbol.trim().is_empty() {
                return Err(ConfigError::Invalid("asset symbol must not be empty".into()));
            }
            if !seen.insert(asset.symbol.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate asset '{}'",
                    asset.symbol
                )));
            }
            match &asset.model {
                ModelSpec::Constant { prob_up } if !(0.0..=1.0).contains(prob_up) => {
                    return Err(ConfigError::Invalid(format!(
                        "{}: prob_up must be within [0, 1], got {prob_up}",
                        asset.symbol
                    )));
                }
                ModelSpec::Momentum { feature, scale } => {
                    if !self.features.contains(feature) {
                        return Err(ConfigError::Invalid(format!(
                            "{}: momentum feature '{feature}' is not in the feature list",
                            asset.symbol
                        )));
                    }
                    if !scale.is_finite() {
                        return Err(ConfigError::Invalid(format!(
                            "{}: momentum scale must be finite",
                            asset.symbol
                        )));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Deterministic BLAKE3 id over the canonical JSON form.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }

    pub fn schema(&self) -> FeatureSchema {
        FeatureSchema::new(self.features.iter().cloned())
    }

    pub fn symbols(&self) -> Vec<String> {
        self.assets.iter().map(|a| a.symbol.clone()).collect()
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            initial_capital: self.simulation.initial_capital,
            policy: self.policy,
            cash_policy: self.simulation.cash_policy,
            sample_size: self.simulation.sample_size,
        }
    }

    /// Resolve a path from the config against `base_dir`.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}
