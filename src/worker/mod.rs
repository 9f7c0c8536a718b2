//! Workers: the loops that claim and execute queued jobs.

pub mod executor;
pub mod pool;
pub mod runner;

pub use executor::{DelayExecutor, ExecutionError, Executor};
pub use pool::WorkerPool;
pub use runner::{Tick, Worker, WorkerConfig};
