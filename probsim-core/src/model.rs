//! Signal model capability: ordered feature vector in, two-class distribution out.
//!
//! The engine depends only on this trait. Concrete model formats live behind
//! adapters (see `probsim-runner::models`).

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("expected {expected} features, got {actual}")]
    FeatureCount { expected: usize, actual: usize },

    #[error("non-finite feature value at position {0}")]
    NonFiniteFeature(usize),

    #[error("model produced an invalid distribution: down={down}, up={up}")]
    InvalidOutput { down: f64, up: f64 },

    #[error("model error: {0}")]
    Other(String),
}

/// Probability of class 0 (down) and class 1 (up).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Probabilities {
    pub down: f64,
    pub up: f64,
}

impl Probabilities {
    pub fn new(down: f64, up: f64) -> Self {
        Self { down, up }
    }

    /// Complementary pair from an up-probability.
    pub fn from_up(up: f64) -> Self {
        Self { down: 1.0 - up, up }
    }

    pub fn is_finite(&self) -> bool {
        self.down.is_finite() && self.up.is_finite()
    }
}

/// A trained classifier the engine can query once per asset per day.
///
/// `Send + Sync` so one loaded model can be shared across parallel sweep runs.
pub trait SignalModel: Send + Sync {
    /// Human-readable name of this model.
    fn name(&self) -> &str;

    /// Predict `(down, up)` for one ordered feature vector.
    fn predict_probabilities(&self, features: &[f64]) -> Result<Probabilities, ModelError>;
}

/// Lets one loaded model back several engines at once.
impl<M: SignalModel + ?Sized> SignalModel for Arc<M> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn predict_probabilities(&self, features: &[f64]) -> Result<Probabilities, ModelError> {
        (**self).predict_probabilities(features)
    }
}

/// Always returns the same distribution, regardless of features.
#[derive(Debug, Clone)]
pub struct ConstantModel {
    probs: Probabilities,
    name: String,
}

impl ConstantModel {
    pub fn new(prob_up: f64) -> Self {
        Self {
            probs: Probabilities::from_up(prob_up),
            name: format!("constant_{prob_up}"),
        }
    }

    /// A distribution whose halves need not sum to one.
    pub fn with_pair(down: f64, up: f64) -> Self {
        Self {
            probs: Probabilities::new(down, up),
            name: format!("constant_{down}_{up}"),
        }
    }
}

impl SignalModel for ConstantModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict_probabilities(&self, _features: &[f64]) -> Result<Probabilities, ModelError> {
        Ok(self.probs)
    }
}

/// Logistic function.
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
