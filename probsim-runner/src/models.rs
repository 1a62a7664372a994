//! Model adapters: turn a `ModelSpec` into a `SignalModel` the engine can
//! query.
//!
//! The logistic artifact is plain JSON so models trained elsewhere can be
//! exported without a shared binary format:
//!
//! ```json
//! { "feature_names": ["RSI", "MACD"], "weights": [0.8, -1.2], "bias": 0.1,
//!   "scaler_means": [50.0, 0.0], "scaler_stds": [10.0, 1.5] }
//! ```

use crate::config::ModelSpec;
use probsim_core::features::FeatureSchema;
use probsim_core::model::{sigmoid, ConstantModel, ModelError, Probabilities, SignalModel};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("failed to read model {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse model {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid model artifact: {0}")]
    Invalid(String),

    #[error("model was trained on features {found:?}, config lists {expected:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("feature '{0}' is not in the schema")]
    UnknownFeature(String),
}

/// Serialized logistic regression: weights over standardized features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticArtifact {
    pub feature_names: Vec<String>,
    pub weights: Vec<f64>,
    pub bias: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaler_means: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaler_stds: Option<Vec<f64>>,
}

impl LogisticArtifact {
    pub fn from_file(path: &Path) -> Result<Self, ModelLoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| ModelLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ModelLoadError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ModelLoadError> {
        let json = serde_json::to_string_pretty(self).map_err(|source| ModelLoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(|source| ModelLoadError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Per-feature standardization, `(x - mean) / std`.
#[derive(Debug, Clone)]
struct FeatureScaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl FeatureScaler {
    fn transform(&self, x: f64, i: usize) -> f64 {
        let std = self.stds[i];
        // A constant training column has std 0; leave it centred only.
        if std == 0.0 {
            x - self.means[i]
        } else {
            (x - self.means[i]) / std
        }
    }
}

/// `p_up = sigmoid(w · scale(x) + b)`.
#[derive(Debug, Clone)]
pub struct LogisticModel {
    name: String,
    weights: Vec<f64>,
    bias: f64,
    scaler: Option<FeatureScaler>,
}

impl LogisticModel {
    pub fn from_artifact(name: impl Into<String>, artifact: LogisticArtifact) -> Result<Self, ModelLoadError> {
        let n = artifact.weights.len();
        if n == 0 {
            return Err(ModelLoadError::Invalid("no weights".into()));
        }
        if artifact.feature_names.len() != n {
            return Err(ModelLoadError::Invalid(format!(
                "{} feature names for {n} weights",
                artifact.feature_names.len()
            )));
        }
        if artifact.weights.iter().any(|w| !w.is_finite()) || !artifact.bias.is_finite() {
            return Err(ModelLoadError::Invalid("non-finite weight or bias".into()));
        }
        let scaler = match (artifact.scaler_means, artifact.scaler_stds) {
            (None, None) => None,
            (Some(means), Some(stds)) if means.len() == n && stds.len() == n => {
                if stds.iter().any(|s| *s < 0.0 || !s.is_finite()) {
                    return Err(ModelLoadError::Invalid("scaler stds must be finite and >= 0".into()));
                }
                Some(FeatureScaler { means, stds })
            }
            _ => {
                return Err(ModelLoadError::Invalid(
                    "scaler_means and scaler_stds must both be present with one entry per weight"
                        .into(),
                ))
            }
        };
        Ok(Self {
            name: name.into(),
            weights: artifact.weights,
            bias: artifact.bias,
            scaler,
        })
    }

    /// Load an artifact and check it was trained on `schema`'s features, in
    /// the same order.
    pub fn load(path: &Path, schema: &FeatureSchema) -> Result<Self, ModelLoadError> {
        let artifact = LogisticArtifact::from_file(path)?;
        if artifact.feature_names != schema.names() {
            return Err(ModelLoadError::SchemaMismatch {
                expected: schema.names().to_vec(),
                found: artifact.feature_names,
            });
        }
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "logistic".into());
        Self::from_artifact(name, artifact)
    }

    fn logit(&self, features: &[f64]) -> f64 {
        let dot: f64 = features
            .iter()
            .zip(&self.weights)
            .enumerate()
            .map(|(i, (x, w))| {
                let x = match &self.scaler {
                    Some(s) => s.transform(*x, i),
                    None => *x,
                };
                w * x
            })
            .sum();
        dot + self.bias
    }
}

impl SignalModel for LogisticModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict_probabilities(&self, features: &[f64]) -> Result<Probabilities, ModelError> {
        check_inputs(features, self.weights.len())?;
        Ok(Probabilities::from_up(sigmoid(self.logit(features))))
    }
}

/// `p_up = sigmoid(scale * x[index])`. A zero-training baseline.
#[derive(Debug, Clone)]
pub struct MomentumModel {
    name: String,
    index: usize,
    width: usize,
    scale: f64,
}

impl MomentumModel {
    pub fn new(feature: &str, scale: f64, schema: &FeatureSchema) -> Result<Self, ModelLoadError> {
        let index = schema
            .names()
            .iter()
            .position(|n| n == feature)
            .ok_or_else(|| ModelLoadError::UnknownFeature(feature.to_string()))?;
        Ok(Self {
            name: format!("momentum_{feature}"),
            index,
            width: schema.len(),
            scale,
        })
    }
}

impl SignalModel for MomentumModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict_probabilities(&self, features: &[f64]) -> Result<Probabilities, ModelError> {
        check_inputs(features, self.width)?;
        Ok(Probabilities::from_up(sigmoid(self.scale * features[self.index])))
    }
}

fn check_inputs(features: &[f64], expected: usize) -> Result<(), ModelError> {
    if features.len() != expected {
        return Err(ModelError::FeatureCount {
            expected,
            actual: features.len(),
        });
    }
    if let Some(i) = features.iter().position(|x| !x.is_finite()) {
        return Err(ModelError::NonFiniteFeature(i));
    }
    Ok(())
}

/// Build the model a `ModelSpec` describes. Relative artifact paths resolve against
/// `base_dir`.
pub fn build_model(
    spec: &ModelSpec,
    schema: &FeatureSchema,
    base_dir: &Path,
) -> Result<Arc<dyn SignalModel>, ModelLoadError> {
    let model: Arc<dyn SignalModel> = match spec {
        ModelSpec::Constant { prob_up } => Arc::new(ConstantModel::new(*prob_up)),
        ModelSpec::Logistic { path } => {
            let path = if path.is_absolute() {
                path.clone()
            } else {
                base_dir.join(path)
            };
            Arc::new(LogisticModel::load(&path, schema)?)
        }
        ModelSpec::Momentum { feature, scale } => {
            Arc::new(MomentumModel::new(feature, *scale, schema)?)
        }
    };
    tracing::info!(model = model.name(), "model loaded");
    Ok(model)
}
