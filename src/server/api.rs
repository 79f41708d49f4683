use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::config::{ServerConfig, DEFAULT_MAX_ACTORS, DEFAULT_MAX_BUCKETS, DEFAULT_MAX_DRAWS};
use crate::error::{RunError, ValidationErrors};
use crate::monte_carlo::{run_chest_batch, run_upgrade_batch, ChestReport, UpgradeReport};
use crate::parallel::WorkerPool;
use crate::scenario::{ChestScenario, UpgradeScenario};

/// Settings shared by every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiContext {
    pub pool: WorkerPool,
    /// Largest `num_actors` a single request may ask for.
    pub max_actors: u32,
    /// Largest `num_actors × chests_per_actor` for a chest request.
    pub max_draws: u64,
    /// Largest chest histogram a request may produce.
    pub max_buckets: u64,
}

impl Default for ApiContext {
    fn default() -> Self {
        Self {
            pool: WorkerPool::default(),
            max_actors: DEFAULT_MAX_ACTORS,
            max_draws: DEFAULT_MAX_DRAWS,
            max_buckets: DEFAULT_MAX_BUCKETS,
        }
    }
}

impl From<&ServerConfig> for ApiContext {
    fn from(config: &ServerConfig) -> Self {
        Self {
            pool: WorkerPool::with_workers(config.workers),
            max_actors: config.max_actors,
            max_draws: config.max_draws,
            max_buckets: config.max_buckets,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    pub field: &'static str,
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationErrorResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub errors: Vec<ValidationIssue>,
}

impl ValidationErrorResponse {
    fn new(errors: Vec<ValidationIssue>) -> Self {
        Self {
            status: "error",
            message: "Validation failed",
            errors,
        }
    }
}

impl From<&ValidationErrors> for ValidationErrorResponse {
    fn from(errors: &ValidationErrors) -> Self {
        let mut issues: Vec<ValidationIssue> = Vec::new();
        for error in errors.errors() {
            let field = error.field();
            let message = error.to_string();
            match issues.iter_mut().find(|issue| issue.field == field) {
                Some(issue) => issue.messages.push(message),
                None => issues.push(ValidationIssue {
                    field,
                    messages: vec![message],
                }),
            }
        }
        Self::new(issues)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulateResponse<R> {
    pub status: &'static str,
    pub run_id: String,
    pub generated_at: String,
    pub report: R,
}

impl<R> SimulateResponse<R> {
    fn new(report: R) -> Self {
        Self {
            status: "ok",
            run_id: uuid::Uuid::new_v4().to_string(),
            generated_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            report,
        }
    }
}

#[derive(Debug)]
pub enum SimulatePayloadError {
    Parse(serde_json::Error),
    Validation(ValidationErrorResponse),
    Internal(String),
}

impl fmt::Display for SimulatePayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "{err}"),
            Self::Validation(_) => write!(f, "invalid simulation request"),
            Self::Internal(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for SimulatePayloadError {}

impl From<RunError> for SimulatePayloadError {
    fn from(err: RunError) -> Self {
        match err {
            RunError::Invalid(errors) => {
                warn!(%errors, "simulation request rejected");
                Self::Validation(ValidationErrorResponse::from(&errors))
            }
            RunError::Pool(err) => Self::Internal(err.to_string()),
        }
    }
}

pub fn health_payload() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&serde_json::json!({
        "status": "ok",
        "service": "reliquary-api",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub fn chest_defaults_payload() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&ChestScenario::default())
}

pub fn upgrade_defaults_payload() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&UpgradeScenario::default())
}

/// An empty body selects the stock configuration.
fn parse_body<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, SimulatePayloadError> {
    let body = if body.trim().is_empty() { "{}" } else { body };
    serde_json::from_str(body).map_err(SimulatePayloadError::Parse)
}

fn too_large(field: &'static str, limit: impl fmt::Display, what: &str) -> ValidationIssue {
    ValidationIssue {
        field,
        messages: vec![format!("{what} must be at most {limit}")],
    }
}

fn refuse_oversized(issues: Vec<ValidationIssue>) -> Result<(), SimulatePayloadError> {
    if issues.is_empty() {
        return Ok(());
    }
    let fields: Vec<&str> = issues.iter().map(|issue| issue.field).collect();
    warn!(?fields, "simulation request too large");
    Err(SimulatePayloadError::Validation(ValidationErrorResponse::new(issues)))
}

fn actor_issue(num_actors: u32, context: &ApiContext) -> Option<ValidationIssue> {
    (num_actors > context.max_actors)
        .then(|| too_large("num_actors", context.max_actors, "num_actors"))
}

fn guard_chests(scenario: &ChestScenario, context: &ApiContext) -> Result<(), SimulatePayloadError> {
    let mut issues: Vec<ValidationIssue> = actor_issue(scenario.num_actors, context).into_iter().collect();
    if scenario.total_draws() > context.max_draws {
        issues.push(too_large(
            "chests_per_actor",
            context.max_draws,
            "num_actors × chests_per_actor",
        ));
    }
    if scenario
        .histogram_span_buckets()
        .is_some_and(|buckets| buckets > context.max_buckets)
    {
        issues.push(too_large(
            "bucket_width",
            context.max_buckets,
            "histogram bucket count (tier value span / bucket_width)",
        ));
    }
    refuse_oversized(issues)
}

fn to_json<R: Serialize>(report: R) -> Result<String, SimulatePayloadError> {
    serde_json::to_string(&SimulateResponse::new(report))
        .map_err(|err| SimulatePayloadError::Internal(format!("failed to encode report: {err}")))
}

pub fn chest_simulate_payload(body: &str, context: &ApiContext) -> Result<String, SimulatePayloadError> {
    let scenario: ChestScenario = parse_body(body)?;
    guard_chests(&scenario, context)?;
    let report: ChestReport = run_chest_batch(&scenario, &context.pool)?;
    to_json(report)
}

pub fn upgrade_simulate_payload(body: &str, context: &ApiContext) -> Result<String, SimulatePayloadError> {
    let scenario: UpgradeScenario = parse_body(body)?;
    refuse_oversized(actor_issue(scenario.num_actors, context).into_iter().collect())?;
    let report: UpgradeReport = run_upgrade_batch(&scenario, &context.pool)?;
    to_json(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    #[test]
    fn validation_issues_group_by_field() {
        let errors = ValidationErrors::check(vec![
            ConfigError::ZeroCount { field: "num_actors" },
            ConfigError::NoTiers,
            ConfigError::Percentile(0),
            ConfigError::Percentile(100),
        ])
        .unwrap_err();
        let response = ValidationErrorResponse::from(&errors);
        assert_eq!(response.message, "Validation failed");
        let fields: Vec<&str> = response.errors.iter().map(|issue| issue.field).collect();
        assert_eq!(fields, vec!["num_actors", "tiers", "percentiles"]);
        assert_eq!(response.errors[2].messages.len(), 2);
    }

    #[test]
    fn oversized_requests_are_refused_before_running() {
        let context = ApiContext {
            max_actors: 10,
            ..ApiContext::default()
        };
        let err = chest_simulate_payload(r#"{"num_actors": 11}"#, &context).unwrap_err();
        match err {
            SimulatePayloadError::Validation(response) => {
                assert_eq!(response.errors[0].field, "num_actors");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn long_journeys_and_wide_histograms_are_refused() {
        let context = ApiContext {
            max_draws: 1_000,
            max_buckets: 100,
            ..ApiContext::default()
        };
        let body = r#"{
            "num_actors": 100,
            "chests_per_actor": 11,
            "bucket_width": 0.001
        }"#;
        match chest_simulate_payload(body, &context).unwrap_err() {
            SimulatePayloadError::Validation(response) => {
                let fields: Vec<&str> = response.errors.iter().map(|issue| issue.field).collect();
                assert_eq!(fields, vec!["chests_per_actor", "bucket_width"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("report holds no encodable data"))
        }
    }

    #[test]
    fn encode_failure_is_internal() {
        match to_json(Unencodable).unwrap_err() {
            SimulatePayloadError::Internal(message) => {
                assert!(message.contains("report holds no encodable data"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_body_runs_defaults() {
        let context = ApiContext {
            pool: WorkerPool::with_workers(1),
            ..ApiContext::default()
        };
        let payload = upgrade_simulate_payload("", &context).unwrap();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["report"]["num_actors"], 1000);
        assert_eq!(value["run_id"].as_str().map(str::len), Some(36));
    }
}
