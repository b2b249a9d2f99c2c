//! Infrastructure layer: fetch job execution, output queues, job metadata,
//! runtime configuration.

pub mod config;
pub mod jobs;
pub mod meta;
pub mod queue;
#[cfg(feature = "redis")]
pub mod runtime;

#[cfg(test)]
mod integration_tests;

pub use config::RuntimeConfig;
pub use jobs::{
    FetchJob, FetchJobRequest, JobContext, JobResult, RunState, execute_fetch_job,
};
pub use meta::{InMemoryJobMetaStore, JobMeta, JobMetaStore, MetaError};
pub use queue::{InMemoryItemQueue, ItemQueue};
#[cfg(feature = "redis")]
pub use runtime::{RedisRuntime, RuntimeError};
