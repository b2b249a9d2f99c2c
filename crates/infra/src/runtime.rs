//! Redis-backed job runtime wiring.

use std::sync::Arc;

use tracing::{info, warn};

use harvest_backend::BackendRegistry;
use harvest_core::{JobError, JobId, QueueError};

use crate::config::RuntimeConfig;
use crate::jobs::{FetchJobRequest, JobContext, JobResult, execute_fetch_job};
use crate::meta::{JobMetaStore, MetaError, RedisJobMetaStore};
use crate::queue::RedisItemQueue;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Meta(#[from] MetaError),
}

/// Queue and metadata adapters shared by all jobs of a worker.
#[derive(Clone)]
pub struct RedisRuntime {
    config: RuntimeConfig,
    queue: Arc<RedisItemQueue>,
    meta_store: Arc<RedisJobMetaStore>,
}

impl RedisRuntime {
    pub fn connect(config: &RuntimeConfig) -> Result<Self, RuntimeError> {
        let queue = RedisItemQueue::new(&config.redis_url)?;
        let meta_store =
            RedisJobMetaStore::new(&config.redis_url, Some(config.meta_prefix.clone()))?;

        info!(redis_url = %config.redis_url, "redis job runtime ready");
        Ok(Self {
            config: config.clone(),
            queue: Arc::new(queue),
            meta_store: Arc::new(meta_store),
        })
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Worker context for `job_id`, seeded with its stored metadata.
    pub fn context(&self, job_id: JobId) -> Result<JobContext, RuntimeError> {
        let meta = self.meta_store.load_meta(job_id)?.unwrap_or_default();
        Ok(JobContext::new(job_id, self.queue.clone(), self.meta_store.clone()).with_meta(meta))
    }

    /// Execute a fetch job. An empty `items_queue` falls back to the
    /// configured default queue.
    pub fn execute(
        &self,
        job_id: JobId,
        registry: &BackendRegistry,
        mut request: FetchJobRequest,
    ) -> Result<JobResult, JobError> {
        if request.items_queue.is_empty() {
            request.items_queue = self.config.items_queue.clone();
        }

        let mut ctx = match self.context(job_id) {
            Ok(ctx) => ctx,
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "could not load job metadata; starting empty");
                JobContext::new(job_id, self.queue.clone(), self.meta_store.clone())
            }
        };
        execute_fetch_job(&mut ctx, registry, &request)
    }
}
