use std::collections::HashMap;
use std::sync::RwLock;

use harvest_core::JobId;

use super::{JobMeta, JobMetaStore, MetaError};

/// In-memory metadata store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryJobMetaStore {
    docs: RwLock<HashMap<JobId, JobMeta>>,
    saves: RwLock<u64>,
}

impl InMemoryJobMetaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `save_meta` calls across all jobs.
    pub fn save_count(&self) -> u64 {
        self.saves.read().map(|n| *n).unwrap_or(0)
    }
}

impl JobMetaStore for InMemoryJobMetaStore {
    fn save_meta(&self, job_id: JobId, meta: &JobMeta) -> Result<(), MetaError> {
        let mut docs = self
            .docs
            .write()
            .map_err(|_| MetaError::Storage("lock poisoned".to_string()))?;
        docs.insert(job_id, meta.clone());

        if let Ok(mut saves) = self.saves.write() {
            *saves += 1;
        }
        Ok(())
    }

    fn load_meta(&self, job_id: JobId) -> Result<Option<JobMeta>, MetaError> {
        let docs = self
            .docs
            .read()
            .map_err(|_| MetaError::Storage("lock poisoned".to_string()))?;
        Ok(docs.get(&job_id).cloned())
    }
}
