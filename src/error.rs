use std::fmt;

use thiserror::Error;

use crate::parallel::PoolError;

/// Tolerance, in percentage points, on the sum of configured tier rates.
pub const RATE_SUM_TOLERANCE_PERCENT: f64 = 0.01;

/// A single rejected input. Raised before any simulation runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("no reward tiers configured")]
    NoTiers,
    #[error("tier #{index} has an empty name")]
    EmptyTierName { index: usize },
    #[error("duplicate tier name '{0}'")]
    DuplicateTier(String),
    #[error("tier '{name}' rate {percent}% is outside [0, 100]")]
    TierRate { name: String, percent: f64 },
    #[error("tier '{name}' value must be finite")]
    TierValue { name: String },
    #[error("tier rates total {total:.2}%, must equal 100% ({})", describe_rate_gap(.total))]
    RateSum { total: f64 },
    #[error("{field} must be at least 1")]
    ZeroCount { field: &'static str },
    #[error("container price {0} must be finite and non-negative")]
    Price(f64),
    #[error("percentile {0} is outside [1, 99]")]
    Percentile(u8),
    #[error("bucket width {0} must be finite and positive")]
    BucketWidth(f64),
    #[error("target level {target} must be higher than start level {start}")]
    TargetNotAboveStart { start: u32, target: u32 },
    #[error("{}", describe_missing_levels(.from, .to))]
    MissingLevels { from: u32, to: u32 },
    #[error("level {0} is configured more than once")]
    DuplicateLevel(u32),
    #[error("level {level} base rate {percent}% is outside [0, 100]")]
    BaseRate { level: u32, percent: f64 },
    #[error("level {level} boost {boost} must be finite and non-negative")]
    Boost { level: u32, boost: f64 },
    #[error("level {level} references unknown aid '{aid}'")]
    UnknownAid { level: u32, aid: String },
    #[error("aid '{aid}' boost {boost} must be finite and non-negative")]
    AidBoost { aid: String, boost: f64 },
    #[error("duplicate aid name '{0}'")]
    DuplicateAid(String),
}

fn describe_rate_gap(total: &f64) -> String {
    let gap = 100.0 - *total;
    if gap > 0.0 {
        format!("{gap:.2}% short")
    } else {
        format!("{:.2}% over", -gap)
    }
}

fn describe_missing_levels(from: &u32, to: &u32) -> String {
    if from == to {
        format!("no success rate configured for level {from}")
    } else {
        format!("no success rates configured for levels {from} through {to}")
    }
}

impl ConfigError {
    /// Input field the error refers to, for grouping in API responses.
    pub fn field(&self) -> &'static str {
        match self {
            Self::NoTiers
            | Self::EmptyTierName { .. }
            | Self::DuplicateTier(_)
            | Self::TierRate { .. }
            | Self::TierValue { .. }
            | Self::RateSum { .. } => "tiers",
            Self::ZeroCount { field } => *field,
            Self::Price(_) => "container_price",
            Self::Percentile(_) => "percentiles",
            Self::BucketWidth(_) => "bucket_width",
            Self::TargetNotAboveStart { .. } => "target_level",
            Self::MissingLevels { .. }
            | Self::DuplicateLevel(_)
            | Self::BaseRate { .. }
            | Self::Boost { .. }
            | Self::UnknownAid { .. } => "levels",
            Self::AidBoost { .. } | Self::DuplicateAid(_) => "aids",
        }
    }
}

/// Every problem found in one configuration. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationErrors {
    errors: Vec<ConfigError>,
}

impl ValidationErrors {
    /// `Ok(())` when nothing was collected.
    pub fn check(errors: Vec<ConfigError>) -> Result<(), Self> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Self { errors })
        }
    }

    pub fn errors(&self) -> &[ConfigError] {
        &self.errors
    }

    pub fn contains(&self, predicate: impl Fn(&ConfigError) -> bool) -> bool {
        self.errors.iter().any(predicate)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid configuration: ")?;
        for (index, error) in self.errors.iter().enumerate() {
            if index > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Why a batch did not produce a report.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),
    #[error(transparent)]
    Pool(#[from] PoolError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_sum_message_reports_shortfall_and_excess() {
        let short = ConfigError::RateSum { total: 99.5 }.to_string();
        assert!(short.contains("0.50% short"), "{short}");

        let over = ConfigError::RateSum { total: 101.25 }.to_string();
        assert!(over.contains("1.25% over"), "{over}");
    }

    #[test]
    fn empty_error_list_is_ok() {
        assert!(ValidationErrors::check(Vec::new()).is_ok());
    }

    #[test]
    fn display_joins_all_errors() {
        let err = ValidationErrors::check(vec![
            ConfigError::NoTiers,
            ConfigError::ZeroCount { field: "num_actors" },
        ])
        .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("no reward tiers"));
        assert!(text.contains("num_actors must be at least 1"));
        assert_eq!(err.errors()[1].field(), "num_actors");
    }

    #[test]
    fn missing_levels_read_as_a_range() {
        let one = ConfigError::MissingLevels { from: 3, to: 3 }.to_string();
        assert_eq!(one, "no success rate configured for level 3");
        let many = ConfigError::MissingLevels { from: 10, to: 20_000_000 }.to_string();
        assert_eq!(many, "no success rates configured for levels 10 through 20000000");
    }
}
