//! Process-wide tracing setup for the binaries.

use std::env;

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "reliquary=info";

/// Filter directives from `RELIQUARY_LOG`, then `RUST_LOG`, then the crate default.
pub fn filter_directives(lookup: impl Fn(&str) -> Option<String>) -> String {
    ["RELIQUARY_LOG", "RUST_LOG"]
        .into_iter()
        .filter_map(|key| lookup(key))
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

/// Installs a stderr fmt subscriber. A second call is a no-op.
pub fn init_tracing() {
    let directives = filter_directives(|key| env::var(key).ok());
    let filter = EnvFilter::try_new(&directives).unwrap_or_else(|err| {
        eprintln!("ignoring invalid log filter '{directives}': {err}");
        EnvFilter::new(DEFAULT_FILTER)
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_variable_wins_over_rust_log() {
        let directives = filter_directives(|key| match key {
            "RELIQUARY_LOG" => Some("reliquary=debug".to_string()),
            "RUST_LOG" => Some("warn".to_string()),
            _ => None,
        });
        assert_eq!(directives, "reliquary=debug");
    }

    #[test]
    fn blank_values_fall_through_to_default() {
        let directives = filter_directives(|key| match key {
            "RELIQUARY_LOG" => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(directives, DEFAULT_FILTER);
    }
}
