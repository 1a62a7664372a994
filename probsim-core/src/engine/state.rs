//! Engine configuration, skip bookkeeping, and run result types.

use crate::domain::{Action, Fill, PortfolioState, SimulationStep};
use crate::ledger::CashPolicy;
use crate::model::SignalModel;
use crate::policy::{PolicyConfig, PolicyError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Fatal, startup-time engine errors. Per-asset per-day problems are skips,
/// never errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no assets configured")]
    NoAssets,

    #[error("duplicate asset symbol '{0}'")]
    DuplicateSymbol(String),

    #[error("feature schema is empty")]
    EmptyFeatureSchema,

    #[error("duplicate feature '{0}' in schema")]
    DuplicateFeature(String),

    #[error("initial capital must be positive and finite, got {0}")]
    NonPositiveCapital(f64),

    #[error("sample size must be at least 1")]
    ZeroSampleSize,

    #[error("market data has no trading days")]
    NoTradingDays,

    #[error(transparent)]
    Policy(#[from] PolicyError),
}

/// Configuration for a single simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub initial_capital: f64,
    pub policy: PolicyConfig,
    pub cash_policy: CashPolicy,
    /// Simulate only the most recent `n` days the provider offers.
    pub sample_size: Option<usize>,
}

impl EngineConfig {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            policy: PolicyConfig::default(),
            cash_policy: CashPolicy::default(),
            sample_size: None,
        }
    }

    pub fn with_policy(mut self, policy: PolicyConfig) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_cash_policy(mut self, cash_policy: CashPolicy) -> Self {
        self.cash_policy = cash_policy;
        self
    }

    pub fn with_sample_size(mut self, n: usize) -> Self {
        self.sample_size = Some(n);
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(1_000.0)
    }
}

/// One asset under simulation: a symbol and the model that scores it.
pub struct TrackedAsset {
    pub symbol: String,
    pub model: Box<dyn SignalModel>,
}

impl TrackedAsset {
    pub fn new(symbol: impl Into<String>, model: Box<dyn SignalModel>) -> Self {
        Self {
            symbol: symbol.into(),
            model,
        }
    }
}

impl fmt::Debug for TrackedAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedAsset")
            .field("symbol", &self.symbol)
            .field("model", &self.model.name())
            .finish()
    }
}

/// Why an asset sat out a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// No record for this asset on this day.
    DataUnavailable,
    /// A schema feature was absent from the record.
    MissingFeature(String),
    /// Close price was zero, negative, or not a number.
    InvalidPrice(f64),
    /// The model rejected the input or produced a non-finite output.
    ModelInference(String),
    /// The ledger refused the trade, e.g. a non-finite amount.
    TradeRejected(String),
}

impl SkipReason {
    pub fn kind(&self) -> &'static str {
        match self {
            SkipReason::DataUnavailable => "data_unavailable",
            SkipReason::MissingFeature(_) => "missing_feature",
            SkipReason::InvalidPrice(_) => "invalid_price",
            SkipReason::ModelInference(_) => "model_inference",
            SkipReason::TradeRejected(_) => "trade_rejected",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::DataUnavailable => write!(f, "no data"),
            SkipReason::MissingFeature(name) => write!(f, "missing feature '{name}'"),
            SkipReason::InvalidPrice(p) => write!(f, "invalid close {p}"),
            SkipReason::ModelInference(msg) => write!(f, "model inference failed: {msg}"),
            SkipReason::TradeRejected(msg) => write!(f, "trade rejected: {msg}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkipEvent {
    pub day: usize,
    pub date: Option<NaiveDate>,
    pub symbol: String,
    pub reason: SkipReason,
}

/// How many times the policy chose each action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCounts {
    pub buy: usize,
    pub sell: usize,
    pub hold: usize,
}

impl ActionCounts {
    pub fn record(&mut self, action: Action) {
        match action {
            Action::Buy => self.buy += 1,
            Action::Sell => self.sell += 1,
            Action::Hold => self.hold += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.buy + self.sell + self.hold
    }
}

/// Everything a run produced. Owned by the caller; the engine keeps nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Asset symbols in configured order.
    pub symbols: Vec<String>,
    pub steps: Vec<SimulationStep>,
    pub final_state: PortfolioState,
    pub fills: Vec<Fill>,
    pub skips: Vec<SkipEvent>,
    pub actions: ActionCounts,
    pub clamped_buys: usize,
}

impl SimulationResult {
    pub fn day_count(&self) -> usize {
        self.steps.len()
    }

    pub fn dates(&self) -> Vec<Option<NaiveDate>> {
        self.steps.iter().map(|s| s.date).collect()
    }

    /// Daily holdings value of one asset, or `None` for an unknown symbol.
    pub fn asset_series(&self, symbol: &str) -> Option<Vec<f64>> {
        let idx = self.symbols.iter().position(|s| s == symbol)?;
        Some(self.steps.iter().map(|s| s.assets[idx].value).collect())
    }

    pub fn net_value_series(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.net_value).collect()
    }

    pub fn price_sum_series(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.price_sum).collect()
    }

    pub fn cash_series(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.cash).collect()
    }

    /// Total portfolio value (cash + holdings) per day.
    pub fn equity_series(&self) -> Vec<f64> {
        let initial = self.final_state.initial_capital;
        self.steps.iter().map(|s| s.net_value + initial).collect()
    }

    pub fn final_net_value(&self) -> f64 {
        self.steps.last().map_or(0.0, |s| s.net_value)
    }

    pub fn skips_for<'a>(&'a self, symbol: &'a str) -> impl Iterator<Item = &'a SkipEvent> + 'a {
        self.skips.iter().filter(move |s| s.symbol == symbol)
    }
}
