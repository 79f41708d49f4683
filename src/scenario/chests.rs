use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ValidationErrors, RATE_SUM_TOLERANCE_PERCENT};
use crate::sim::{RewardTier, TierTable};

pub const DEFAULT_CHESTS_PER_ACTOR: u32 = 10;
pub const DEFAULT_CHEST_ACTORS: u32 = 100;
pub const DEFAULT_CONTAINER_PRICE: f64 = 240.0;
pub const DEFAULT_BUCKET_WIDTH: f64 = 0.5;
pub const DEFAULT_PERCENTILES: [u8; 3] = [5, 50, 95];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierInput {
    pub name: String,
    pub probability_percent: f64,
    pub value: f64,
}

/// Caller-supplied reward-draw configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChestScenario {
    pub tiers: Vec<TierInput>,
    pub chests_per_actor: u32,
    pub num_actors: u32,
    pub container_price: f64,
    pub percentiles: Vec<u8>,
    pub bucket_width: f64,
    pub seed: Option<u64>,
}

impl Default for ChestScenario {
    fn default() -> Self {
        Self {
            tiers: default_talisman_tiers(),
            chests_per_actor: DEFAULT_CHESTS_PER_ACTOR,
            num_actors: DEFAULT_CHEST_ACTORS,
            container_price: DEFAULT_CONTAINER_PRICE,
            percentiles: DEFAULT_PERCENTILES.to_vec(),
            bucket_width: DEFAULT_BUCKET_WIDTH,
            seed: None,
        }
    }
}

/// Stock ossuary drop table.
pub fn default_talisman_tiers() -> Vec<TierInput> {
    [
        ("+20% Talisman", 50.0, 20.0),
        ("+25% Talisman", 45.0, 25.0),
        ("+30% Talisman", 4.9, 30.0),
        ("+50% Talisman", 0.1, 50.0),
    ]
    .into_iter()
    .map(|(name, probability_percent, value)| TierInput {
        name: name.to_string(),
        probability_percent,
        value,
    })
    .collect()
}

impl ChestScenario {
    /// Sum of configured tier rates, in percent.
    pub fn total_rate_percent(&self) -> f64 {
        self.tiers.iter().map(|tier| tier.probability_percent).sum()
    }

    /// Random draws the whole batch performs.
    pub fn total_draws(&self) -> u64 {
        u64::from(self.num_actors) * u64::from(self.chests_per_actor)
    }

    /// Upper bound on the dense histogram's bucket count. Final averages never leave the range
    /// of tier values, so the span of finite values over `bucket_width` bounds it. `None` when
    /// the width is unusable.
    pub fn histogram_span_buckets(&self) -> Option<u64> {
        if !self.bucket_width.is_finite() || self.bucket_width <= 0.0 {
            return None;
        }
        let (low, high) = self
            .tiers
            .iter()
            .map(|tier| tier.value)
            .filter(|value| value.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(low, high), value| {
                (low.min(value), high.max(value))
            });
        if low > high {
            return Some(0);
        }
        let span = (high / self.bucket_width).floor() - (low / self.bucket_width).floor() + 1.0;
        // Float-to-int casts saturate.
        Some(span as u64)
    }

    /// Checks every input and builds the tier table. All problems are reported together.
    pub fn validate(&self) -> Result<TierTable, ValidationErrors> {
        let mut errors = Vec::new();

        if self.tiers.is_empty() {
            errors.push(ConfigError::NoTiers);
        }
        let mut seen = HashSet::new();
        for (index, tier) in self.tiers.iter().enumerate() {
            let name = tier.name.trim();
            if name.is_empty() {
                errors.push(ConfigError::EmptyTierName { index });
            } else if !seen.insert(name) {
                errors.push(ConfigError::DuplicateTier(name.to_string()));
            }
            if !tier.probability_percent.is_finite()
                || !(0.0..=100.0).contains(&tier.probability_percent)
            {
                errors.push(ConfigError::TierRate {
                    name: tier.name.clone(),
                    percent: tier.probability_percent,
                });
            }
            if !tier.value.is_finite() {
                errors.push(ConfigError::TierValue {
                    name: tier.name.clone(),
                });
            }
        }
        let total = self.total_rate_percent();
        if !self.tiers.is_empty() && !((total - 100.0).abs() <= RATE_SUM_TOLERANCE_PERCENT) {
            errors.push(ConfigError::RateSum { total });
        }

        if self.chests_per_actor == 0 {
            errors.push(ConfigError::ZeroCount {
                field: "chests_per_actor",
            });
        }
        if self.num_actors == 0 {
            errors.push(ConfigError::ZeroCount { field: "num_actors" });
        }
        if !self.container_price.is_finite() || self.container_price < 0.0 {
            errors.push(ConfigError::Price(self.container_price));
        }
        errors.extend(percentile_errors(&self.percentiles));
        if !self.bucket_width.is_finite() || self.bucket_width <= 0.0 {
            errors.push(ConfigError::BucketWidth(self.bucket_width));
        }

        ValidationErrors::check(errors)?;

        Ok(TierTable::from_validated(
            self.tiers
                .iter()
                .map(|tier| RewardTier {
                    name: tier.name.trim().to_string(),
                    probability: tier.probability_percent / 100.0,
                    value: tier.value,
                })
                .collect(),
        ))
    }
}

pub(crate) fn percentile_errors(percentiles: &[u8]) -> impl Iterator<Item = ConfigError> + '_ {
    percentiles
        .iter()
        .filter(|p| !(1..=99).contains(*p))
        .map(|&p| ConfigError::Percentile(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_span_follows_tier_values_and_width() {
        let scenario = ChestScenario::default();
        // 20.0 through 50.0 at width 0.5: keys 40..=100.
        assert_eq!(scenario.histogram_span_buckets(), Some(61));
        assert_eq!(scenario.total_draws(), 1000);

        let wide = ChestScenario {
            tiers: vec![
                TierInput {
                    name: "Dust".to_string(),
                    probability_percent: 50.0,
                    value: 0.0,
                },
                TierInput {
                    name: "Hoard".to_string(),
                    probability_percent: 50.0,
                    value: 1e12,
                },
            ],
            ..ChestScenario::default()
        };
        assert_eq!(wide.histogram_span_buckets(), Some(2_000_000_000_001));

        let broken = ChestScenario {
            bucket_width: 0.0,
            ..ChestScenario::default()
        };
        assert_eq!(broken.histogram_span_buckets(), None);
    }

    #[test]
    fn defaults_validate() {
        let table = ChestScenario::default().validate().unwrap();
        assert_eq!(table.len(), 4);
        assert!((table.tiers()[3].probability - 0.001).abs() < 1e-12);
    }

    #[test]
    fn rate_sum_outside_tolerance_is_rejected() {
        let mut scenario = ChestScenario::default();
        scenario.tiers[0].probability_percent = 49.0;
        let err = scenario.validate().unwrap_err();
        assert!(err.contains(|e| matches!(e, ConfigError::RateSum { total } if (total - 99.0).abs() < 1e-9)));
    }

    #[test]
    fn rate_sum_within_tolerance_is_accepted() {
        let mut scenario = ChestScenario::default();
        scenario.tiers[0].probability_percent = 50.005;
        assert!(scenario.validate().is_ok());
    }

    #[test]
    fn all_problems_are_collected() {
        let scenario = ChestScenario {
            tiers: vec![
                TierInput {
                    name: "a".to_string(),
                    probability_percent: 120.0,
                    value: 1.0,
                },
                TierInput {
                    name: "a".to_string(),
                    probability_percent: -20.0,
                    value: f64::NAN,
                },
            ],
            chests_per_actor: 0,
            num_actors: 0,
            container_price: -1.0,
            percentiles: vec![0, 50, 100],
            bucket_width: 0.0,
            seed: None,
        };
        let err = scenario.validate().unwrap_err();
        let fields: HashSet<&str> = err.errors().iter().map(ConfigError::field).collect();
        for field in [
            "tiers",
            "chests_per_actor",
            "num_actors",
            "container_price",
            "percentiles",
            "bucket_width",
        ] {
            assert!(fields.contains(field), "missing {field}");
        }
        assert!(err.contains(|e| matches!(e, ConfigError::DuplicateTier(name) if name == "a")));
        assert!(!err.contains(|e| matches!(e, ConfigError::RateSum { .. })));
    }

    #[test]
    fn partial_yaml_falls_back_to_defaults() {
        let scenario: ChestScenario = serde_yaml::from_str("num_actors: 5\nseed: 9\n").unwrap();
        assert_eq!(scenario.num_actors, 5);
        assert_eq!(scenario.seed, Some(9));
        assert_eq!(scenario.tiers, default_talisman_tiers());
    }
}
