pub mod chest;
pub mod rng;
pub mod upgrade;

pub use chest::{simulate_journey, ActorJourney, ChestDrawStep, RewardTier, TierId, TierTable};
pub use rng::{entropy_seed, Rng, UniformSource};
pub use upgrade::{
    simulate_upgrade, UpgradeAttemptResult, UpgradeLevel, UpgradePath, DEFAULT_MAX_ATTEMPTS,
};
