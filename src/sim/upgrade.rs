//! Sequential upgrade attempts: advance level by level from `start` to `target`; any failed roll
//! ends the attempt and drops the actor back to `start`.

use serde::Serialize;

use crate::sim::rng::UniformSource;

/// Per-actor attempt cap used when a scenario does not set one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpgradeLevel {
    pub level: u32,
    pub base_success_rate: f64,
    pub boost: f64,
    /// Named aid that contributed to `boost`, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aid: Option<String>,
}

impl UpgradeLevel {
    pub fn effective_rate(&self) -> f64 {
        (self.base_success_rate + self.boost).min(1.0)
    }
}

/// Validated levels `start+1 ..= target`, in order.
/// Build one through [crate::scenario::UpgradeScenario::validate].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpgradePath {
    start_level: u32,
    target_level: u32,
    steps: Vec<UpgradeLevel>,
}

impl UpgradePath {
    pub(crate) fn from_validated(start_level: u32, target_level: u32, steps: Vec<UpgradeLevel>) -> Self {
        Self {
            start_level,
            target_level,
            steps,
        }
    }

    pub fn start_level(&self) -> u32 {
        self.start_level
    }

    pub fn target_level(&self) -> u32 {
        self.target_level
    }

    pub fn levels_to_gain(&self) -> u32 {
        self.target_level - self.start_level
    }

    pub fn steps(&self) -> &[UpgradeLevel] {
        &self.steps
    }

    pub fn effective_rates(&self) -> impl Iterator<Item = f64> + '_ {
        self.steps.iter().map(UpgradeLevel::effective_rate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpgradeAttemptResult {
    pub attempts_until_success: u32,
    pub succeeded: bool,
    /// Individual level-up rolls across all attempts.
    pub total_rolls: u64,
}

/// Runs one actor until the target is reached or `max_attempts` attempts are spent.
pub fn simulate_upgrade(
    path: &UpgradePath,
    max_attempts: u32,
    source: &mut impl UniformSource,
) -> UpgradeAttemptResult {
    let mut total_rolls = 0_u64;
    for attempt in 1..=max_attempts {
        let mut reached = true;
        for step in &path.steps {
            total_rolls += 1;
            if source.next_unit() >= step.effective_rate() {
                reached = false;
                break;
            }
        }
        if reached {
            return UpgradeAttemptResult {
                attempts_until_success: attempt,
                succeeded: true,
                total_rolls,
            };
        }
    }
    UpgradeAttemptResult {
        attempts_until_success: max_attempts,
        succeeded: false,
        total_rolls,
    }
}
