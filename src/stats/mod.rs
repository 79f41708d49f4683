pub mod estimate;
pub mod geometric;
pub mod histogram;
pub mod normal;
pub mod or_better;
pub mod overlay;
pub mod percentile;

pub use estimate::Estimate;
pub use geometric::{
    attempts_for_confidence, chained_success_probability, expected_attempts, geometric_series,
    GeometricPoint,
};
pub use histogram::{bin_attempts, build_dense_histogram, build_histogram, AttemptBin, Bucket};
pub use normal::{normal_cdf, normal_cdf_at};
pub use or_better::{or_better_table, row_for_tier, OrBetterRow, TierOdds};
pub use overlay::{apply_geometric_overlay, apply_normal_overlay, DrawMoments};
pub use percentile::{nearest_match, percentile_index, percentile_threshold, sorted_ascending};
