//! Domain types for probsim

pub mod bar;
pub mod decision;
pub mod fill;
pub mod portfolio;
pub mod record;
pub mod step;

pub use bar::Bar;
pub use decision::{Action, Decision};
pub use fill::Fill;
pub use portfolio::PortfolioState;
pub use record::DailyRecord;
pub use step::{AssetValue, SimulationStep};

/// Symbol type alias
pub type Symbol = String;
