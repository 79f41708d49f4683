//! Measure draw and upgrade-roll throughput and optionally append one line to a log file for
//! trend tracking.
//!
//! Usage:
//!   cargo run --release --bin benchmark_simulator
//!   cargo run --release --bin benchmark_simulator -- --log
//!
//! --log  Append one row to benchmark_log.csv (date, draws_per_sec, upgrade_actors_per_sec, rolls_per_sec).

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use reliquary::scenario::{ChestScenario, UpgradeScenario};
use reliquary::sim::{simulate_journey, simulate_upgrade, Rng};

const LOG_PATH: &str = "benchmark_log.csv";
const MIN_DURATION: Duration = Duration::from_secs(2);

fn main() -> ExitCode {
    let log = std::env::args().any(|a| a == "--log");

    let table = match ChestScenario::default().validate() {
        Ok(table) => table,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    let path = match UpgradeScenario::default().validate() {
        Ok(path) => path,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let chests_per_journey = 100_u32;
    let mut rng = Rng::new(7);
    let start = Instant::now();
    let mut journeys: u64 = 0;
    while start.elapsed() < MIN_DURATION {
        std::hint::black_box(simulate_journey(&table, chests_per_journey, &mut rng));
        journeys += 1;
    }
    let draws_per_sec = (journeys * u64::from(chests_per_journey)) as f64 / start.elapsed().as_secs_f64();

    let start = Instant::now();
    let mut actors: u64 = 0;
    let mut rolls: u64 = 0;
    while start.elapsed() < MIN_DURATION {
        let result = simulate_upgrade(&path, 1000, &mut rng);
        rolls += result.total_rolls;
        actors += 1;
    }
    let elapsed = start.elapsed().as_secs_f64();
    let actors_per_sec = actors as f64 / elapsed;
    let rolls_per_sec = rolls as f64 / elapsed;

    println!("Simulator benchmark:");
    println!("  Draws/s:          {:.0}", draws_per_sec);
    println!("  Upgrade actors/s: {:.2}", actors_per_sec);
    println!("  Upgrade rolls/s:  {:.0}", rolls_per_sec);

    if log {
        if let Err(err) = append_log(draws_per_sec, actors_per_sec, rolls_per_sec) {
            eprintln!("failed to append to {LOG_PATH}: {err}");
            return ExitCode::FAILURE;
        }
        println!("Appended to {LOG_PATH}");
    }
    ExitCode::SUCCESS
}

fn append_log(draws_per_sec: f64, actors_per_sec: f64, rolls_per_sec: f64) -> io::Result<()> {
    let date = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    let mut file = OpenOptions::new().create(true).append(true).open(LOG_PATH)?;
    if file.metadata().map(|m| m.len() == 0).unwrap_or(true) {
        file.write_all(b"date,draws_per_sec,upgrade_actors_per_sec,rolls_per_sec\n")?;
    }
    writeln!(
        file,
        "{},{:.4},{:.4},{:.4}",
        date, draws_per_sec, actors_per_sec, rolls_per_sec
    )?;
    file.flush()
}
