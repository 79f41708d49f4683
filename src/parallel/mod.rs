pub mod batch;
pub mod pool;
pub mod progress;

pub use batch::{actor_batches, batch_ranges};
pub use pool::{PoolError, WorkerPool};
pub use progress::Progress;
