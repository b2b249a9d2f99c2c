//! Per-job persistent metadata.
//!
//! The job runtime keeps a small key-value document per job that outlives the
//! job itself. Failed fetch jobs store their partial result there, so an
//! operator (or a retry policy) can see how far the run got.

pub mod in_memory;
#[cfg(feature = "redis")]
pub mod redis_hash;

pub use in_memory::InMemoryJobMetaStore;
#[cfg(feature = "redis")]
pub use redis_hash::RedisJobMetaStore;

use std::sync::Arc;

use serde_json::{Map, Value as JsonValue};

use harvest_core::JobId;

/// Metadata document of a job.
pub type JobMeta = Map<String, JsonValue>;

/// Job metadata store error.
#[derive(Debug, thiserror::Error)]
pub enum MetaError {
    #[error("metadata serialization error: {0}")]
    Serialization(String),

    #[error("metadata connection error: {0}")]
    Connection(String),

    #[error("metadata command error: {0}")]
    Command(String),

    #[error("metadata storage error: {0}")]
    Storage(String),
}

/// Persistence for job metadata documents.
pub trait JobMetaStore: Send + Sync {
    /// Replace the stored metadata of `job_id`.
    fn save_meta(&self, job_id: JobId, meta: &JobMeta) -> Result<(), MetaError>;

    /// Load the stored metadata of `job_id`, if any was saved.
    fn load_meta(&self, job_id: JobId) -> Result<Option<JobMeta>, MetaError>;
}

impl<S: JobMetaStore + ?Sized> JobMetaStore for Arc<S> {
    fn save_meta(&self, job_id: JobId, meta: &JobMeta) -> Result<(), MetaError> {
        (**self).save_meta(job_id, meta)
    }

    fn load_meta(&self, job_id: JobId) -> Result<Option<JobMeta>, MetaError> {
        (**self).load_meta(job_id)
    }
}
