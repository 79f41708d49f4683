use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::warn;

use crate::config::{ScenarioFile, ServerConfig};
use crate::error::{RunError, ValidationErrors};
use crate::export_csv::{self, ExportError};
use crate::monte_carlo::{run_chest_batch, run_upgrade_batch, ChestReport, UpgradeReport};
use crate::parallel::WorkerPool;
use crate::scenario::{ChestScenario, UpgradeScenario};
use crate::server;
use crate::stats::row_for_tier;

#[derive(Debug, Parser)]
#[command(
    name = "reliquary",
    version,
    about = "Monte Carlo simulator for reward chests and sequential upgrades"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the JSON API and console page
    Serve {
        #[arg(long, env = "RELIQUARY_BIND")]
        bind: Option<String>,
        #[arg(long)]
        workers: Option<usize>,
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
    /// Open reward chests for many actors
    Chests(ChestArgs),
    /// Run sequential upgrade attempts for many actors
    Upgrade(UpgradeArgs),
    /// Check a scenario file without running it
    Validate { file: PathBuf },
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Scenario file (.yaml, .yml or .json)
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub seed: Option<u64>,
    #[arg(long)]
    pub actors: Option<u32>,
    /// Worker threads; 0 uses every core
    #[arg(long, env = "RELIQUARY_WORKERS", default_value_t = 0)]
    pub workers: usize,
    /// Print a tab-separated summary instead of JSON
    #[arg(long)]
    pub table: bool,
    /// Also write per-actor rows to this CSV file
    #[arg(long)]
    pub csv: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct ChestArgs {
    #[command(flatten)]
    pub run: RunArgs,
    /// Chests opened per actor
    #[arg(long)]
    pub chests: Option<u32>,
    /// Container price used for effective cost
    #[arg(long)]
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Args)]
pub struct UpgradeArgs {
    #[command(flatten)]
    pub run: RunArgs,
    #[arg(long)]
    pub start: Option<u32>,
    #[arg(long)]
    pub target: Option<u32>,
    /// Confidence level in percent
    #[arg(long)]
    pub confidence: Option<f64>,
}

/// Runs the CLI and returns the process exit code: 0 success, 1 failure, 2 usage error.
pub fn run_with_args(args: &[String]) -> i32 {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return err.exit_code();
        }
    };

    match cli.command {
        Command::Serve {
            bind,
            workers,
            static_dir,
        } => handle_serve(bind, workers, static_dir),
        Command::Chests(args) => handle_chests(&args),
        Command::Upgrade(args) => handle_upgrade(&args),
        Command::Validate { file } => handle_validate(&file),
    }
}

fn handle_serve(bind: Option<String>, workers: Option<usize>, static_dir: Option<PathBuf>) -> i32 {
    let mut config = ServerConfig::from_env();
    if let Some(bind) = bind {
        config.bind = bind;
    }
    if let Some(workers) = workers {
        config.workers = workers;
    }
    if static_dir.is_some() {
        config.static_dir = static_dir;
    }
    match server::run_server(config) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("server error: {err}");
            1
        }
    }
}

fn load_file(path: Option<&Path>) -> Result<ScenarioFile, i32> {
    let Some(path) = path else {
        return Ok(ScenarioFile::default());
    };
    ScenarioFile::load(path).map_err(|err| {
        eprintln!("{err}");
        1
    })
}

fn handle_chests(args: &ChestArgs) -> i32 {
    let file = match load_file(args.run.config.as_deref()) {
        Ok(file) => file,
        Err(code) => return code,
    };
    let mut scenario = file.chests.unwrap_or_default();
    apply_chest_overrides(&mut scenario, args);

    let report = match run_chest_batch(&scenario, &WorkerPool::with_workers(args.run.workers)) {
        Ok(report) => report,
        Err(err) => return report_run_error(&err),
    };
    if let Some(path) = &args.run.csv {
        if let Err(code) = export(path, |file| export_csv::write_journeys(&report, file)) {
            return code;
        }
    }
    if args.run.table {
        print!("{}", chest_table(&report));
        0
    } else {
        print_json(&report)
    }
}

fn handle_upgrade(args: &UpgradeArgs) -> i32 {
    let file = match load_file(args.run.config.as_deref()) {
        Ok(file) => file,
        Err(code) => return code,
    };
    let mut scenario = file.upgrade.unwrap_or_default();
    apply_upgrade_overrides(&mut scenario, args);

    let report = match run_upgrade_batch(&scenario, &WorkerPool::with_workers(args.run.workers)) {
        Ok(report) => report,
        Err(err) => return report_run_error(&err),
    };
    if let Some(path) = &args.run.csv {
        if let Err(code) = export(path, |file| export_csv::write_attempts(&report, file)) {
            return code;
        }
    }
    if args.run.table {
        print!("{}", upgrade_table(&report));
        0
    } else {
        print_json(&report)
    }
}

fn handle_validate(path: &Path) -> i32 {
    let file = match load_file(Some(path)) {
        Ok(file) => file,
        Err(code) => return code,
    };
    if file.chests.is_none() && file.upgrade.is_none() {
        eprintln!("{}: no chests or upgrade section", path.display());
        return 1;
    }

    let check = file.check();
    for (section, outcome) in [("chests", &check.chests), ("upgrade", &check.upgrade)] {
        match outcome {
            Some(Ok(())) => println!("{section}: ok"),
            Some(Err(errors)) => print_validation(section, errors),
            None => {}
        }
    }
    if check.is_valid() {
        println!("validation passed: {}", path.display());
        0
    } else {
        1
    }
}

pub fn apply_chest_overrides(scenario: &mut ChestScenario, args: &ChestArgs) {
    if let Some(seed) = args.run.seed {
        scenario.seed = Some(seed);
    }
    if let Some(actors) = args.run.actors {
        scenario.num_actors = actors;
    }
    if let Some(chests) = args.chests {
        scenario.chests_per_actor = chests;
    }
    if let Some(price) = args.price {
        scenario.container_price = price;
    }
}

pub fn apply_upgrade_overrides(scenario: &mut UpgradeScenario, args: &UpgradeArgs) {
    if let Some(seed) = args.run.seed {
        scenario.seed = Some(seed);
    }
    if let Some(actors) = args.run.actors {
        scenario.num_actors = actors;
    }
    if let Some(start) = args.start {
        scenario.start_level = start;
    }
    if let Some(target) = args.target {
        scenario.target_level = target;
    }
    if let Some(confidence) = args.confidence {
        scenario.confidence_percent = confidence;
    }
}

fn report_run_error(err: &RunError) -> i32 {
    match err {
        RunError::Invalid(errors) => {
            warn!(%errors, "scenario rejected");
            print_validation("scenario", errors);
        }
        RunError::Pool(err) => eprintln!("{err}"),
    }
    1
}

fn print_validation(section: &str, errors: &ValidationErrors) {
    eprintln!("{section}: {} issue(s)", errors.errors().len());
    for error in errors.errors() {
        eprintln!("- {}: {error}", error.field());
    }
}

fn export(
    path: &Path,
    write: impl FnOnce(std::fs::File) -> Result<(), ExportError>,
) -> Result<(), i32> {
    export_csv::create(path)
        .and_then(write)
        .map_err(|err| {
            eprintln!("csv export failed: {err}");
            1
        })
}

fn print_json(report: &impl Serialize) -> i32 {
    match serde_json::to_string_pretty(report) {
        Ok(payload) => {
            println!("{payload}");
            0
        }
        Err(err) => {
            eprintln!("failed to serialize report: {err}");
            1
        }
    }
}

pub fn chest_table(report: &ChestReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "seed\t{}\nactors\t{}\nchests\t{}",
        report.seed, report.num_actors, report.chests_per_actor
    );
    let _ = writeln!(out, "\npercentile\tthreshold\tactor");
    for snapshot in &report.percentile_snapshots {
        let _ = writeln!(
            out,
            "{}\t{:.4}\t{}",
            snapshot.percentile, snapshot.threshold_value, snapshot.actor_index
        );
    }
    let _ = writeln!(out, "\ntier\texpected_pct\tactual_pct\texpected_per_actor\tactual_per_actor");
    for row in &report.per_tier_expected_vs_actual {
        let _ = writeln!(
            out,
            "{}\t{:.3}\t{:.3}\t{:.3}\t{:.3}",
            row.name,
            row.expected_percent,
            row.actual_percent,
            row.expected_per_actor,
            row.actual_per_actor
        );
    }
    let _ = writeln!(out, "\ntier\tor_better\tcost\tempirical_or_better\tempirical_cost");
    // Empirical ties may rank differently, so rows are matched by tier.
    for theoretical in &report.or_better_cost_table.theoretical {
        let name = report
            .tiers
            .get(theoretical.tier)
            .map_or("?", |tier| tier.name.as_str());
        let Some(empirical) = row_for_tier(&report.or_better_cost_table.empirical, theoretical.tier)
        else {
            continue;
        };
        let _ = writeln!(
            out,
            "{}\t{:.4}\t{}\t{:.4}\t{}",
            name,
            theoretical.or_better_probability,
            theoretical.effective_cost,
            empirical.or_better_probability,
            empirical.effective_cost
        );
    }
    out
}

pub fn upgrade_table(report: &UpgradeReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "seed\t{}\nactors\t{}\nlevels\t+{} -> +{}",
        report.seed, report.num_actors, report.start_level, report.target_level
    );
    let _ = writeln!(
        out,
        "success_probability\t{:.6}\nexpected_attempts\t{}\nattempts_at_{:.2}%\t{}",
        report.theoretical_success_probability,
        report.expected_attempts,
        report.confidence * 100.0,
        report.confidence_attempts
    );
    let _ = writeln!(
        out,
        "mean_attempts\t{:.3}\nsuccess_rate\t{:.4}\ncapped_actors\t{}",
        report.summary.mean_attempts, report.summary.success_rate, report.summary.capped_actors
    );
    let _ = writeln!(out, "\npercentile\tattempts\trolls\tlevels_per_roll");
    for snapshot in &report.percentile_snapshots {
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{:.4}",
            snapshot.percentile,
            snapshot.threshold_value,
            snapshot.total_rolls,
            snapshot.levels_per_roll
        );
    }
    out
}
