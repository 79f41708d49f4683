//! Monte Carlo engine for reward chests and sequential upgrades, with the closed-form
//! probabilities each run is compared against.

pub mod cli;
pub mod config;
pub mod error;
pub mod export_csv;
pub mod monte_carlo;
pub mod parallel;
pub mod scenario;
pub mod server;
pub mod sim;
pub mod stats;
pub mod telemetry;

pub use error::{ConfigError, RunError, ValidationErrors};
pub use monte_carlo::{run_chest_batch, run_upgrade_batch, ChestReport, UpgradeReport};
pub use parallel::WorkerPool;
pub use scenario::{ChestScenario, UpgradeScenario};
