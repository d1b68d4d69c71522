//! The extraction pipeline: per-provider circuit breaking, the job
//! state machine, and the worker pool draining the job queue.

pub mod circuit;
pub mod runner;
pub mod worker;

pub use circuit::{CircuitBreaker, ProviderHealth};
pub use runner::JobRunner;
pub use worker::{spawn_workers, JobQueue};
