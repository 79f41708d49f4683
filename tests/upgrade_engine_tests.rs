use reliquary::parallel::WorkerPool;
use reliquary::scenario::{LevelInput, UpgradeScenario};
use reliquary::stats::{attempts_for_confidence, Estimate};
use reliquary::{run_upgrade_batch, ConfigError, RunError};

fn single_level(rate_percent: f64, actors: u32, seed: u64) -> UpgradeScenario {
    UpgradeScenario {
        levels: vec![LevelInput {
            level: 1,
            base_rate_percent: rate_percent,
            boost: 0.0,
            aid: None,
        }],
        start_level: 0,
        target_level: 1,
        num_actors: actors,
        max_attempts: 10_000,
        seed: Some(seed),
        ..UpgradeScenario::default()
    }
}

#[test]
fn single_level_attempts_are_geometric() {
    for (rate, seed) in [(50.0, 1_u64), (20.0, 2), (80.0, 3)] {
        let report = run_upgrade_batch(&single_level(rate, 40_000, seed), &WorkerPool::default()).unwrap();
        let p = rate / 100.0;
        let expected = 1.0 / p;
        let standard_error = ((1.0 - p).sqrt() / p) / (40_000_f64).sqrt();
        let mean = report.summary.mean_attempts;
        assert!(
            (mean - expected).abs() < 5.0 * standard_error,
            "rate {rate}: mean {mean}, expected {expected}"
        );
        assert_eq!(report.summary.capped_actors, 0);
    }
}

#[test]
fn coin_flip_at_seventy_five_percent_needs_two_attempts() {
    assert_eq!(attempts_for_confidence(0.5, 0.75), Estimate::Finite(2));
    let mut scenario = single_level(50.0, 10, 1);
    scenario.confidence_percent = 75.0;
    let report = run_upgrade_batch(&scenario, &WorkerPool::default()).unwrap();
    assert_eq!(report.confidence_attempts, Estimate::Finite(2));
}

#[test]
fn stock_path_matches_compound_probability() {
    let scenario = UpgradeScenario {
        num_actors: 2_000,
        seed: Some(10),
        ..UpgradeScenario::default()
    };
    let report = run_upgrade_batch(&scenario, &WorkerPool::default()).unwrap();
    let p: f64 = [0.95, 0.90, 0.85, 0.70, 0.78, 0.68, 0.50, 0.45, 0.40]
        .iter()
        .product();
    assert!((report.theoretical_success_probability - p).abs() < 1e-12);
    assert!((report.level_table[8].compound_rate - p).abs() < 1e-12);

    let geometric_sum: f64 = report
        .geometric_distribution
        .iter()
        .map(|point| point.probability)
        .sum();
    let last = report.geometric_distribution.last().unwrap();
    assert!((geometric_sum - last.cumulative_probability).abs() < 1e-9);
    assert!(last.cumulative_probability >= 0.95 - 1e-12);
}

#[test]
fn fixed_seed_is_reproducible_across_worker_counts() {
    let scenario = UpgradeScenario {
        num_actors: 1_500,
        seed: Some(31),
        ..UpgradeScenario::default()
    };
    let one = run_upgrade_batch(&scenario, &WorkerPool::with_workers(1)).unwrap();
    let three = run_upgrade_batch(&scenario, &WorkerPool::with_workers(3)).unwrap();
    assert_eq!(one.simulated_attempts_per_actor, three.simulated_attempts_per_actor);
    assert_eq!(one.percentile_snapshots, three.percentile_snapshots);
    assert_eq!(one.simulated_vs_expected_histogram, three.simulated_vs_expected_histogram);
}

#[test]
fn attempt_histogram_bins_cover_every_actor() {
    let scenario = UpgradeScenario {
        num_actors: 3_000,
        seed: Some(4),
        ..UpgradeScenario::default()
    };
    let report = run_upgrade_batch(&scenario, &WorkerPool::default()).unwrap();
    let bins = &report.simulated_vs_expected_histogram;
    assert!(bins.len() <= 20);
    assert_eq!(bins.iter().map(|bin| bin.count).sum::<u64>(), 3_000);
    assert!(bins.windows(2).all(|w| w[0].end + 1 == w[1].start));
    let min = report
        .simulated_attempts_per_actor
        .iter()
        .map(|r| u64::from(r.attempts_until_success))
        .min()
        .unwrap();
    assert_eq!(bins[0].start, min);
}

#[test]
fn certain_path_finishes_in_one_attempt() {
    let report = run_upgrade_batch(&single_level(100.0, 50, 6), &WorkerPool::default()).unwrap();
    assert_eq!(report.expected_attempts, Estimate::Finite(1.0));
    assert_eq!(report.confidence_attempts, Estimate::Finite(1));
    assert_eq!(report.simulated_vs_expected_histogram.len(), 1);
    assert!(report
        .simulated_attempts_per_actor
        .iter()
        .all(|r| r.attempts_until_success == 1 && r.total_rolls == 1));
}

#[test]
fn near_impossible_path_reports_unbounded_sentinels() {
    let mut scenario = single_level(0.0, 5, 1);
    scenario.max_attempts = 50;
    let report = run_upgrade_batch(&scenario, &WorkerPool::default()).unwrap();
    assert_eq!(report.expected_attempts, Estimate::Unbounded);
    assert_eq!(report.confidence_attempts, Estimate::Unbounded);
    assert_eq!(report.summary.capped_actors, 5);
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["expected_attempts"], "unbounded");
}

#[test]
fn target_not_above_start_is_rejected() {
    let scenario = UpgradeScenario {
        start_level: 4,
        target_level: 4,
        ..UpgradeScenario::default()
    };
    match run_upgrade_batch(&scenario, &WorkerPool::default()) {
        Err(RunError::Invalid(errors)) => {
            assert!(errors.contains(|e| matches!(e, ConfigError::TargetNotAboveStart { .. })));
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
}
