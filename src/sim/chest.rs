//! Reward draws: weighted tier sampling and single-actor journeys.

use serde::Serialize;

use crate::sim::rng::UniformSource;

/// Position of a tier in its [TierTable].
pub type TierId = usize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RewardTier {
    pub name: String,
    pub probability: f64,
    pub value: f64,
}

/// Validated, order-preserving tier list. Probabilities sum to 1 within tolerance.
/// Build one through [crate::scenario::ChestScenario::validate].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierTable {
    tiers: Vec<RewardTier>,
}

impl TierTable {
    pub(crate) fn from_validated(tiers: Vec<RewardTier>) -> Self {
        Self { tiers }
    }

    pub fn tiers(&self) -> &[RewardTier] {
        &self.tiers
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Inverse-CDF sample for a uniform `roll` in `[0, 1)`: the first tier whose running
    /// cumulative probability exceeds `roll`. Falls back to the last tier when rounding leaves
    /// the cumulative sum short of `roll`.
    pub fn sample(&self, roll: f64) -> TierId {
        let mut cumulative = 0.0;
        for (id, tier) in self.tiers.iter().enumerate() {
            cumulative += tier.probability;
            if roll < cumulative {
                return id;
            }
        }
        self.tiers.len().saturating_sub(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChestDrawStep {
    /// 1-based.
    pub index: u32,
    pub tier: TierId,
    pub tier_value: f64,
    pub running_average: f64,
    /// Per-tier totals so far, indexed by [TierId].
    pub cumulative_counts: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActorJourney {
    pub steps: Vec<ChestDrawStep>,
    pub final_average: f64,
    pub final_counts: Vec<u32>,
}

/// Opens `chests` containers for one actor.
pub fn simulate_journey(
    table: &TierTable,
    chests: u32,
    source: &mut impl UniformSource,
) -> ActorJourney {
    let mut counts = vec![0_u32; table.len()];
    let mut steps = Vec::with_capacity(chests as usize);
    let mut total_value = 0.0;

    for index in 1..=chests {
        let tier = table.sample(source.next_unit());
        let tier_value = table.tiers[tier].value;
        counts[tier] += 1;
        total_value += tier_value;
        steps.push(ChestDrawStep {
            index,
            tier,
            tier_value,
            running_average: total_value / index as f64,
            cumulative_counts: counts.clone(),
        });
    }

    let final_average = steps.last().map_or(0.0, |step| step.running_average);
    ActorJourney {
        steps,
        final_average,
        final_counts: counts,
    }
}
