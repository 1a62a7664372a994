//! Simulation engine: the multi-asset, lockstep daily loop and its result
//! types.

pub mod loop_runner;
pub mod state;

pub use loop_runner::SimulationEngine;
pub use state::{
    ActionCounts, EngineConfig, EngineError, SimulationResult, SkipEvent, SkipReason,
    TrackedAsset,
};
