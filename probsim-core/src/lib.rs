//! probsim core: domain types, decision policy, ledger, and the daily
//! simulation loop.
//!
//! This crate contains the heart of the simulator:
//! - Domain types (daily records, decisions, fills, portfolio state, steps)
//! - `DecisionPolicy`: probability pair to sized action
//! - `Ledger`: cash/holdings mutation that conserves value
//! - `SignalModel` trait and the ordered `FeatureSchema`
//! - Calendar alignment and the `MarketSnapshotProvider` trait
//! - Indicators for deriving classic features from OHLCV bars
//! - `SimulationEngine`: the multi-asset lockstep loop

pub mod data;
pub mod domain;
pub mod engine;
pub mod features;
pub mod indicators;
pub mod ledger;
pub mod model;
pub mod policy;

pub use data::{align_records, AlignedData, AlignmentMode, DataError, MarketSnapshotProvider};
pub use domain::{Action, DailyRecord, Decision, Fill, PortfolioState, SimulationStep};
pub use engine::{
    EngineConfig, EngineError, SimulationEngine, SimulationResult, SkipEvent, SkipReason,
    TrackedAsset,
};
pub use features::FeatureSchema;
pub use ledger::{CashPolicy, Ledger, TradeError};
pub use model::{ModelError, Probabilities, SignalModel};
pub use policy::{DecisionPolicy, PolicyConfig, PolicyError};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything a parallel sweep shares or returns is
    /// Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<DailyRecord>();
        require_sync::<DailyRecord>();
        require_send::<Fill>();
        require_sync::<Fill>();
        require_send::<PortfolioState>();
        require_sync::<PortfolioState>();
        require_send::<SimulationStep>();
        require_sync::<SimulationStep>();

        require_send::<AlignedData>();
        require_sync::<AlignedData>();
        require_send::<FeatureSchema>();
        require_sync::<FeatureSchema>();
        require_send::<DecisionPolicy>();
        require_sync::<DecisionPolicy>();

        require_send::<EngineConfig>();
        require_sync::<EngineConfig>();
        require_send::<TrackedAsset>();
        require_sync::<TrackedAsset>();
        require_send::<SimulationEngine>();
        require_sync::<SimulationEngine>();
        require_send::<SimulationResult>();
        require_sync::<SimulationResult>();
    }

    /// The model boundary sees only the feature vector, never portfolio
    /// state.
    #[test]
    fn signal_model_has_no_portfolio_parameter() {
        fn _check_trait_object_builds(
            model: &dyn SignalModel,
            features: &[f64],
        ) -> Result<Probabilities, ModelError> {
            model.predict_probabilities(features)
        }
    }
}
