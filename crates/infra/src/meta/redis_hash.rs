//! Redis-backed job metadata.
//!
//! Each job gets a hash at `<prefix><job_id>`; the metadata document is stored
//! as JSON in its `meta` field, next to whatever else the job runtime keeps
//! there.

use std::sync::Arc;

use tracing::instrument;

use harvest_core::JobId;

use super::{JobMeta, JobMetaStore, MetaError};
use crate::config::DEFAULT_META_PREFIX;

const META_FIELD: &str = "meta";

#[derive(Debug, Clone)]
pub struct RedisJobMetaStore {
    client: Arc<redis::Client>,
    key_prefix: String,
}

impl RedisJobMetaStore {
    /// Create a store for `redis_url`.
    ///
    /// `key_prefix` defaults to [`DEFAULT_META_PREFIX`].
    pub fn new(redis_url: impl AsRef<str>, key_prefix: Option<String>) -> Result<Self, MetaError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| MetaError::Connection(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            key_prefix: key_prefix.unwrap_or_else(|| DEFAULT_META_PREFIX.to_string()),
        })
    }

    fn key(&self, job_id: JobId) -> String {
        format!("{}{}", self.key_prefix, job_id)
    }
}

impl JobMetaStore for RedisJobMetaStore {
    #[instrument(skip(self, meta), fields(job_id = %job_id), err)]
    fn save_meta(&self, job_id: JobId, meta: &JobMeta) -> Result<(), MetaError> {
        let payload =
            serde_json::to_string(meta).map_err(|e| MetaError::Serialization(e.to_string()))?;

        let mut conn = self
            .client
            .get_connection()
            .map_err(|e| MetaError::Connection(e.to_string()))?;

        let _: i64 = redis::cmd("HSET")
            .arg(self.key(job_id))
            .arg(META_FIELD)
            .arg(&payload)
            .query(&mut conn)
            .map_err(|e| MetaError::Command(format!("HSET failed: {e}")))?;

        Ok(())
    }

    fn load_meta(&self, job_id: JobId) -> Result<Option<JobMeta>, MetaError> {
        let mut conn = self
            .client
            .get_connection()
            .map_err(|e| MetaError::Connection(e.to_string()))?;

        let payload: Option<String> = redis::cmd("HGET")
            .arg(self.key(job_id))
            .arg(META_FIELD)
            .query(&mut conn)
            .map_err(|e| MetaError::Command(format!("HGET failed: {e}")))?;

        payload
            .map(|p| serde_json::from_str(&p).map_err(|e| MetaError::Serialization(e.to_string())))
            .transpose()
    }
}
