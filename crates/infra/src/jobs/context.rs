//! Worker-side view of the job being executed.

use std::sync::Arc;

use harvest_core::JobId;

use crate::meta::{JobMeta, JobMetaStore, MetaError};
use crate::queue::ItemQueue;

/// What the job runtime hands to a job: its identity, a queue connection and
/// the job's persistent metadata slot.
pub struct JobContext {
    job_id: JobId,
    queue: Arc<dyn ItemQueue>,
    meta_store: Arc<dyn JobMetaStore>,
    meta: JobMeta,
}

impl JobContext {
    pub fn new(
        job_id: JobId,
        queue: Arc<dyn ItemQueue>,
        meta_store: Arc<dyn JobMetaStore>,
    ) -> Self {
        Self {
            job_id,
            queue,
            meta_store,
            meta: JobMeta::new(),
        }
    }

    /// Start from a previously persisted metadata document.
    pub fn with_meta(mut self, meta: JobMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn queue(&self) -> Arc<dyn ItemQueue> {
        Arc::clone(&self.queue)
    }

    pub fn meta(&self) -> &JobMeta {
        &self.meta
    }

    pub fn meta_mut(&mut self) -> &mut JobMeta {
        &mut self.meta
    }

    /// Persist the current metadata document.
    pub fn save_meta(&self) -> Result<(), MetaError> {
        self.meta_store.save_meta(self.job_id, &self.meta)
    }
}

impl core::fmt::Debug for JobContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("JobContext")
            .field("job_id", &self.job_id)
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::InMemoryJobMetaStore;
    use crate::queue::InMemoryItemQueue;
    use serde_json::json;

    #[test]
    fn save_meta_persists_under_the_job_id() {
        let store = Arc::new(InMemoryJobMetaStore::new());
        let mut ctx = JobContext::new(JobId::new(), Arc::new(InMemoryItemQueue::new()), store.clone());

        ctx.meta_mut().insert("attempt".into(), json!(1));
        ctx.save_meta().unwrap();

        let saved = store.load_meta(ctx.job_id()).unwrap().unwrap();
        assert_eq!(saved["attempt"], json!(1));
        assert_eq!(ctx.meta()["attempt"], json!(1));
    }
}
