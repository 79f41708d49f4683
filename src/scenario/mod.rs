//! Caller-facing configuration for both engines, with stock defaults and validation.

pub mod chests;
pub mod upgrade;

pub use chests::{default_talisman_tiers, ChestScenario, TierInput};
pub use upgrade::{
    default_aids, default_levels, AidOption, LevelInput, LevelTableRow, UpgradeScenario,
};
