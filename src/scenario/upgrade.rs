use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ValidationErrors};
use crate::scenario::chests::{percentile_errors, DEFAULT_PERCENTILES};
use crate::sim::{UpgradeLevel, UpgradePath, DEFAULT_MAX_ATTEMPTS};

pub const DEFAULT_UPGRADE_ACTORS: u32 = 1000;
pub const DEFAULT_CONFIDENCE_PERCENT: f64 = 95.0;
pub const MIN_CONFIDENCE_PERCENT: f64 = 1.0;
pub const MAX_CONFIDENCE_PERCENT: f64 = 99.99;

/// Stock base success rates for +1 through +9, in percent.
pub const DEFAULT_BASE_RATES_PERCENT: [f64; 9] = [95.0, 90.0, 85.0, 70.0, 60.0, 50.0, 30.0, 20.0, 10.0];

/// Named boost that can be applied to a level, e.g. a talisman.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AidOption {
    pub name: String,
    /// Fraction added to the base rate.
    pub boost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelInput {
    pub level: u32,
    pub base_rate_percent: f64,
    /// Explicit extra fraction, added to any aid boost.
    #[serde(default)]
    pub boost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aid: Option<String>,
}

/// One row of the level table: every configured level, start-independent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelTableRow {
    pub level: u32,
    pub base_success_rate: f64,
    pub boost: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aid: Option<String>,
    pub effective_rate: f64,
    /// Product of effective rates from the lowest configured level through this one.
    pub compound_rate: f64,
}

/// Caller-supplied sequential-upgrade configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeScenario {
    pub levels: Vec<LevelInput>,
    pub aids: Vec<AidOption>,
    pub start_level: u32,
    pub target_level: u32,
    pub confidence_percent: f64,
    pub num_actors: u32,
    pub max_attempts: u32,
    pub percentiles: Vec<u8>,
    pub seed: Option<u64>,
}

impl Default for UpgradeScenario {
    fn default() -> Self {
        Self {
            levels: default_levels(),
            aids: default_aids(),
            start_level: 0,
            target_level: DEFAULT_BASE_RATES_PERCENT.len() as u32,
            confidence_percent: DEFAULT_CONFIDENCE_PERCENT,
            num_actors: DEFAULT_UPGRADE_ACTORS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            percentiles: DEFAULT_PERCENTILES.to_vec(),
            seed: None,
        }
    }
}

pub fn default_aids() -> Vec<AidOption> {
    [
        ("None", 0.0),
        ("+18% Talisman", 0.18),
        ("+20% Talisman", 0.20),
        ("+25% Talisman", 0.25),
        ("+30% Talisman", 0.30),
        ("+50% Talisman", 0.50),
    ]
    .into_iter()
    .map(|(name, boost)| AidOption {
        name: name.to_string(),
        boost,
    })
    .collect()
}

/// Stock base rates with the recommended talisman for each level.
pub fn default_levels() -> Vec<LevelInput> {
    DEFAULT_BASE_RATES_PERCENT
        .iter()
        .enumerate()
        .map(|(offset, &base_rate_percent)| {
            let level = offset as u32 + 1;
            let aid = match level {
                1..=4 => "None",
                5 | 6 => "+18% Talisman",
                7 => "+20% Talisman",
                8 => "+25% Talisman",
                _ => "+30% Talisman",
            };
            LevelInput {
                level,
                base_rate_percent,
                boost: 0.0,
                aid: Some(aid.to_string()),
            }
        })
        .collect()
}

impl UpgradeScenario {
    /// Confidence as a fraction, clamped to the supported range. The flag is set when clamping
    /// changed the value.
    pub fn clamped_confidence(&self) -> (f64, bool) {
        let requested = if self.confidence_percent.is_nan() {
            DEFAULT_CONFIDENCE_PERCENT
        } else {
            self.confidence_percent
        };
        let clamped = requested.clamp(MIN_CONFIDENCE_PERCENT, MAX_CONFIDENCE_PERCENT);
        (clamped / 100.0, clamped != self.confidence_percent)
    }

    fn aid_boosts(&self) -> HashMap<&str, f64> {
        self.aids
            .iter()
            .map(|aid| (aid.name.trim(), aid.boost))
            .collect()
    }

    fn resolve(&self, input: &LevelInput, aids: &HashMap<&str, f64>) -> Result<UpgradeLevel, ConfigError> {
        let aid_boost = match input.aid.as_deref().map(str::trim) {
            None => 0.0,
            Some(name) => *aids.get(name).ok_or_else(|| ConfigError::UnknownAid {
                level: input.level,
                aid: name.to_string(),
            })?,
        };
        Ok(UpgradeLevel {
            level: input.level,
            base_success_rate: input.base_rate_percent / 100.0,
            boost: input.boost + aid_boost,
            aid: input.aid.as_ref().map(|name| name.trim().to_string()),
        })
    }

    /// Checks every input and builds the path from `start_level + 1` through `target_level`.
    pub fn validate(&self) -> Result<UpgradePath, ValidationErrors> {
        let mut errors = Vec::new();
        let aids = self.aid_boosts();

        if self.target_level <= self.start_level {
            errors.push(ConfigError::TargetNotAboveStart {
                start: self.start_level,
                target: self.target_level,
            });
        }

        let mut aid_names = HashSet::new();
        for aid in &self.aids {
            if !aid_names.insert(aid.name.trim()) {
                errors.push(ConfigError::DuplicateAid(aid.name.trim().to_string()));
            }
            if !aid.boost.is_finite() || aid.boost < 0.0 {
                errors.push(ConfigError::AidBoost {
                    aid: aid.name.clone(),
                    boost: aid.boost,
                });
            }
        }

        let mut by_level: BTreeMap<u32, UpgradeLevel> = BTreeMap::new();
        for input in &self.levels {
            if !input.base_rate_percent.is_finite()
                || !(0.0..=100.0).contains(&input.base_rate_percent)
            {
                errors.push(ConfigError::BaseRate {
                    level: input.level,
                    percent: input.base_rate_percent,
                });
            }
            if !input.boost.is_finite() || input.boost < 0.0 {
                errors.push(ConfigError::Boost {
                    level: input.level,
                    boost: input.boost,
                });
            }
            match self.resolve(input, &aids) {
                Ok(level) => {
                    if by_level.insert(input.level, level).is_some() {
                        errors.push(ConfigError::DuplicateLevel(input.level));
                    }
                }
                Err(error) => errors.push(error),
            }
        }

        if self.target_level > self.start_level {
            errors.extend(self.missing_levels());
        }

        if self.num_actors == 0 {
            errors.push(ConfigError::ZeroCount { field: "num_actors" });
        }
        if self.max_attempts == 0 {
            errors.push(ConfigError::ZeroCount {
                field: "max_attempts",
            });
        }
        errors.extend(percentile_errors(&self.percentiles));

        ValidationErrors::check(errors)?;

        let steps = by_level
            .range(self.start_level + 1..=self.target_level)
            .map(|(_, level)| level.clone())
            .collect();
        Ok(UpgradePath::from_validated(
            self.start_level,
            self.target_level,
            steps,
        ))
    }

    /// Gaps in `start_level + 1..=target_level`, one error per contiguous run.
    fn missing_levels(&self) -> Vec<ConfigError> {
        let configured: BTreeSet<u32> = self
            .levels
            .iter()
            .map(|input| input.level)
            .filter(|level| (self.start_level + 1..=self.target_level).contains(level))
            .collect();

        let mut gaps = Vec::new();
        let mut next = u64::from(self.start_level) + 1;
        for level in configured {
            if u64::from(level) > next {
                gaps.push(ConfigError::MissingLevels {
                    from: next as u32,
                    to: level - 1,
                });
            }
            next = u64::from(level) + 1;
        }
        if next <= u64::from(self.target_level) {
            gaps.push(ConfigError::MissingLevels {
                from: next as u32,
                to: self.target_level,
            });
        }
        gaps
    }

    /// All configured levels in ascending order with running compound rates. Levels with an
    /// unknown aid are listed without the aid boost.
    pub fn level_table(&self) -> Vec<LevelTableRow> {
        let aids = self.aid_boosts();
        let mut inputs: Vec<&LevelInput> = self.levels.iter().collect();
        inputs.sort_by_key(|input| input.level);

        let mut compound = 1.0;
        inputs
            .into_iter()
            .map(|input| {
                let level = self.resolve(input, &aids).unwrap_or_else(|_| UpgradeLevel {
                    level: input.level,
                    base_success_rate: input.base_rate_percent / 100.0,
                    boost: input.boost,
                    aid: None,
                });
                let effective_rate = level.effective_rate();
                compound *= effective_rate;
                LevelTableRow {
                    level: level.level,
                    base_success_rate: level.base_success_rate,
                    boost: level.boost,
                    aid: level.aid,
                    effective_rate,
                    compound_rate: compound,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_stock_strategy() {
        let path = UpgradeScenario::default().validate().unwrap();
        assert_eq!(path.steps().len(), 9);
        let rates: Vec<f64> = path.effective_rates().collect();
        let expected = [0.95, 0.90, 0.85, 0.70, 0.78, 0.68, 0.50, 0.45, 0.40];
        for (rate, want) in rates.iter().zip(expected) {
            assert!((rate - want).abs() < 1e-12, "{rate} vs {want}");
        }
        assert_eq!(path.steps()[4].aid.as_deref(), Some("+18% Talisman"));
    }

    #[test]
    fn path_covers_only_levels_above_start() {
        let scenario = UpgradeScenario {
            start_level: 6,
            target_level: 8,
            ..UpgradeScenario::default()
        };
        let path = scenario.validate().unwrap();
        let levels: Vec<u32> = path.steps().iter().map(|step| step.level).collect();
        assert_eq!(levels, vec![7, 8]);
        assert_eq!(path.levels_to_gain(), 2);
    }

    #[test]
    fn target_must_exceed_start() {
        let scenario = UpgradeScenario {
            start_level: 5,
            target_level: 5,
            ..UpgradeScenario::default()
        };
        let err = scenario.validate().unwrap_err();
        assert!(err.contains(|e| matches!(e, ConfigError::TargetNotAboveStart { start: 5, target: 5 })));
    }

    #[test]
    fn missing_duplicate_and_unknown_levels_are_reported_together() {
        let mut scenario = UpgradeScenario::default();
        scenario.levels.retain(|input| input.level != 3);
        scenario.levels.push(LevelInput {
            level: 2,
            base_rate_percent: 50.0,
            boost: 0.0,
            aid: None,
        });
        scenario.levels[0].aid = Some("Lucky Charm".to_string());
        scenario.levels[1].base_rate_percent = 140.0;
        scenario.max_attempts = 0;

        let err = scenario.validate().unwrap_err();
        assert!(err.contains(|e| *e == ConfigError::MissingLevels { from: 3, to: 3 }));
        assert!(err.contains(|e| *e == ConfigError::DuplicateLevel(2)));
        assert!(err.contains(|e| matches!(e, ConfigError::UnknownAid { level: 1, aid } if aid == "Lucky Charm")));
        assert!(err.contains(|e| matches!(e, ConfigError::BaseRate { level: 2, .. })));
        assert!(err.contains(|e| *e == ConfigError::ZeroCount { field: "max_attempts" }));
    }

    #[test]
    fn negative_boost_is_rejected() {
        let mut scenario = UpgradeScenario::default();
        scenario.levels[0].boost = -0.1;
        let err = scenario.validate().unwrap_err();
        assert!(err.contains(|e| matches!(e, ConfigError::Boost { level: 1, .. })));
    }

    #[test]
    fn aid_boosts_must_be_finite_and_non_negative() {
        let mut scenario = UpgradeScenario::default();
        scenario.aids.push(AidOption {
            name: "Cursed".to_string(),
            boost: -0.4,
        });
        scenario.aids.push(AidOption {
            name: "Broken".to_string(),
            boost: f64::NAN,
        });
        scenario.levels[0].aid = Some("Cursed".to_string());

        let err = scenario.validate().unwrap_err();
        assert!(err.contains(|e| matches!(e, ConfigError::AidBoost { aid, boost } if aid == "Cursed" && *boost == -0.4)));
        assert!(err.contains(|e| matches!(e, ConfigError::AidBoost { aid, .. } if aid == "Broken")));
        assert!(err.errors().iter().all(|e| e.field() == "aids"));
    }

    #[test]
    fn duplicate_aid_names_are_rejected() {
        let mut scenario = UpgradeScenario::default();
        scenario.aids.push(AidOption {
            name: " +30% Talisman ".to_string(),
            boost: 0.9,
        });
        let err = scenario.validate().unwrap_err();
        assert!(err.contains(|e| *e == ConfigError::DuplicateAid("+30% Talisman".to_string())));
    }

    #[test]
    fn missing_levels_collapse_into_ranges() {
        let scenario = UpgradeScenario {
            levels: vec![
                LevelInput {
                    level: 2,
                    base_rate_percent: 50.0,
                    boost: 0.0,
                    aid: None,
                },
                LevelInput {
                    level: 6,
                    base_rate_percent: 50.0,
                    boost: 0.0,
                    aid: None,
                },
            ],
            target_level: 20_000_000,
            ..UpgradeScenario::default()
        };
        let err = scenario.validate().unwrap_err();
        assert_eq!(
            err.errors(),
            &[
                ConfigError::MissingLevels { from: 1, to: 1 },
                ConfigError::MissingLevels { from: 3, to: 5 },
                ConfigError::MissingLevels { from: 7, to: 20_000_000 },
            ]
        );
    }

    #[test]
    fn missing_range_reaches_the_largest_level() {
        let scenario = UpgradeScenario {
            levels: Vec::new(),
            start_level: u32::MAX - 2,
            target_level: u32::MAX,
            ..UpgradeScenario::default()
        };
        let err = scenario.validate().unwrap_err();
        assert_eq!(
            err.errors(),
            &[ConfigError::MissingLevels {
                from: u32::MAX - 1,
                to: u32::MAX,
            }]
        );
    }

    #[test]
    fn confidence_is_clamped_into_range() {
        let mut scenario = UpgradeScenario::default();
        assert_eq!(scenario.clamped_confidence(), (0.95, false));
        scenario.confidence_percent = 100.0;
        let (confidence, clamped) = scenario.clamped_confidence();
        assert!((confidence - 0.9999).abs() < 1e-12);
        assert!(clamped);
        scenario.confidence_percent = 0.0;
        assert_eq!(scenario.clamped_confidence(), (0.01, true));
    }

    #[test]
    fn level_table_compounds_from_the_lowest_level() {
        let table = UpgradeScenario::default().level_table();
        assert_eq!(table.len(), 9);
        assert!((table[0].compound_rate - 0.95).abs() < 1e-12);
        assert!((table[1].compound_rate - 0.95 * 0.90).abs() < 1e-12);
        let product: f64 = table.iter().map(|row| row.effective_rate).product();
        assert!((table[8].compound_rate - product).abs() < 1e-12);
    }

    #[test]
    fn json_levels_accept_aid_names() {
        let json = r#"{
            "levels": [
                {"level": 1, "base_rate_percent": 40, "aid": "+50% Talisman"},
                {"level": 2, "base_rate_percent": 10, "boost": 0.05}
            ],
            "target_level": 2
        }"#;
        let scenario: UpgradeScenario = serde_json::from_str(json).unwrap();
        let path = scenario.validate().unwrap();
        let rates: Vec<f64> = path.effective_rates().collect();
        assert!((rates[0] - 0.9).abs() < 1e-12);
        assert!((rates[1] - 0.15).abs() < 1e-12);
    }
}
