//! Scenario files and process environment.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ValidationErrors;
use crate::scenario::{ChestScenario, UpgradeScenario};

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_MAX_ACTORS: u32 = 100_000;
/// Largest `num_actors × chests_per_actor` a single API request may ask for.
pub const DEFAULT_MAX_DRAWS: u64 = 10_000_000;
/// Largest chest histogram, in buckets, a single API request may produce.
pub const DEFAULT_MAX_BUCKETS: u64 = 10_000;

#[derive(Debug, Error)]
pub enum ScenarioFileError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unsupported scenario file {path}: expected .yaml, .yml or .json")]
    UnsupportedExtension { path: PathBuf },
}

/// Contents of a scenario file. Either section may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chests: Option<ChestScenario>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgrade: Option<UpgradeScenario>,
}

/// Validation outcome per section of a [ScenarioFile].
#[derive(Debug, Clone, PartialEq)]
pub struct FileCheck {
    pub chests: Option<Result<(), ValidationErrors>>,
    pub upgrade: Option<Result<(), ValidationErrors>>,
}

impl FileCheck {
    pub fn is_valid(&self) -> bool {
        [&self.chests, &self.upgrade]
            .into_iter()
            .flatten()
            .all(Result::is_ok)
    }
}

impl ScenarioFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioFileError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let parse_yaml = match extension.as_deref() {
            Some("yaml" | "yml") => true,
            Some("json") => false,
            _ => {
                return Err(ScenarioFileError::UnsupportedExtension {
                    path: path.to_path_buf(),
                })
            }
        };
        let text = fs::read_to_string(path).map_err(|source| ScenarioFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if parse_yaml {
            serde_yaml::from_str(&text).map_err(|source| ScenarioFileError::Yaml {
                path: path.to_path_buf(),
                source,
            })
        } else {
            serde_json::from_str(&text).map_err(|source| ScenarioFileError::Json {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    pub fn check(&self) -> FileCheck {
        FileCheck {
            chests: self
                .chests
                .as_ref()
                .map(|scenario| scenario.validate().map(drop)),
            upgrade: self
                .upgrade
                .as_ref()
                .map(|scenario| scenario.validate().map(drop)),
        }
    }
}

/// Server settings read from `RELIQUARY_*` variables.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind: String,
    pub workers: usize,
    pub static_dir: Option<PathBuf>,
    pub max_actors: u32,
    pub max_draws: u64,
    pub max_buckets: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            workers: 0,
            static_dir: None,
            max_actors: DEFAULT_MAX_ACTORS,
            max_draws: DEFAULT_MAX_DRAWS,
            max_buckets: DEFAULT_MAX_BUCKETS,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Unparseable numbers fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            bind: lookup("RELIQUARY_BIND")
                .filter(|value| !value.trim().is_empty())
                .unwrap_or(defaults.bind),
            workers: parse_var(&lookup, "RELIQUARY_WORKERS").unwrap_or(defaults.workers),
            static_dir: lookup("RELIQUARY_STATIC_DIR")
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from),
            max_actors: parse_var(&lookup, "RELIQUARY_MAX_ACTORS").unwrap_or(defaults.max_actors),
            max_draws: parse_var(&lookup, "RELIQUARY_MAX_DRAWS").unwrap_or(defaults.max_draws),
            max_buckets: parse_var(&lookup, "RELIQUARY_MAX_BUCKETS").unwrap_or(defaults.max_buckets),
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|value| value.trim().parse().ok())
}
