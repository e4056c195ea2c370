pub mod batch;
pub mod pool;

pub use batch::{batch_ranges, run_simulation_batches, simulate_unit};
pub use pool::WorkerPool;
