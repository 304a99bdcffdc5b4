//! Executor infrastructure - Bounded pool for deferred work

mod config;
mod pool;

pub use config::{ExecutorConfig, RejectionPolicy};
pub use pool::{ExecutorStats, Job, TaskExecutor};
