//! CSV export of per-actor results.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::monte_carlo::{ChestReport, UpgradeReport};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to create {path}: {source}")]
    Create {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush CSV: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Serialize)]
struct JourneyRow<'a> {
    actor: usize,
    chest: u32,
    tier: &'a str,
    tier_value: f64,
    running_average: f64,
}

#[derive(Debug, Serialize)]
struct AttemptRow {
    actor: usize,
    attempts_until_success: u32,
    succeeded: bool,
    total_rolls: u64,
}

/// One row per actor per chest.
pub fn write_journeys<W: Write>(report: &ChestReport, writer: W) -> Result<(), ExportError> {
    let mut csv = csv::Writer::from_writer(writer);
    for (actor, journey) in report.all_journeys.iter().enumerate() {
        for step in &journey.steps {
            let tier = report
                .tiers
                .get(step.tier)
                .map_or("", |tier| tier.name.as_str());
            csv.serialize(JourneyRow {
                actor,
                chest: step.index,
                tier,
                tier_value: step.tier_value,
                running_average: step.running_average,
            })?;
        }
    }
    csv.flush()?;
    Ok(())
}

/// One row per actor.
pub fn write_attempts<W: Write>(report: &UpgradeReport, writer: W) -> Result<(), ExportError> {
    let mut csv = csv::Writer::from_writer(writer);
    for (actor, result) in report.simulated_attempts_per_actor.iter().enumerate() {
        csv.serialize(AttemptRow {
            actor,
            attempts_until_success: result.attempts_until_success,
            succeeded: result.succeeded,
            total_rolls: result.total_rolls,
        })?;
    }
    csv.flush()?;
    Ok(())
}

pub fn create(path: &Path) -> Result<File, ExportError> {
    File::create(path).map_err(|source| ExportError::Create {
        path: path.display().to_string(),
        source,
    })
}
