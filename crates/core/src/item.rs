//! Fetched records.
//!
//! An [`Item`] is what a backend produces and what ends up on the output
//! queue. The core schema is fixed so the job layer can rely on it
//! (identity, timestamps, offsets); anything backend-specific travels in
//! `extras`, which is flattened into the top-level JSON object.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::QueueError;
use crate::id::JobId;

/// A single fetched record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub backend_name: String,
    pub backend_version: String,
    pub category: String,
    pub origin: String,
    /// Unique identifier of the record within its origin.
    pub uuid: String,

    /// When the record was last updated at the source (epoch seconds).
    pub updated_on: f64,
    /// When the record was fetched (epoch seconds).
    pub timestamp: f64,

    /// Position marker for offset-based sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    #[serde(default)]
    pub search_fields: Map<String, JsonValue>,

    pub data: JsonValue,

    /// Version of the job runner that forwarded this item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub harvest_version: Option<String>,

    /// Job that forwarded this item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,

    #[serde(flatten)]
    pub extras: Map<String, JsonValue>,
}

impl Item {
    /// Create an item with the required identity fields.
    ///
    /// `timestamp` is set to now; everything optional starts empty.
    pub fn new(
        backend_name: impl Into<String>,
        backend_version: impl Into<String>,
        category: impl Into<String>,
        origin: impl Into<String>,
        uuid: impl Into<String>,
        updated_on: f64,
        data: JsonValue,
    ) -> Self {
        Self {
            backend_name: backend_name.into(),
            backend_version: backend_version.into(),
            category: category.into(),
            origin: origin.into(),
            uuid: uuid.into(),
            updated_on,
            timestamp: epoch_seconds(Utc::now()),
            offset: None,
            tag: None,
            search_fields: Map::new(),
            data,
            harvest_version: None,
            job_id: None,
            extras: Map::new(),
        }
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.extras.insert(key.into(), value);
        self
    }

    /// Source update time as a UTC datetime.
    ///
    /// Returns `None` when `updated_on` is not representable (NaN or out of range).
    pub fn updated_on_datetime(&self) -> Option<DateTime<Utc>> {
        from_epoch_seconds(self.updated_on)
    }

    /// Stamp the item with the runner version and the job forwarding it.
    pub fn annotate(&mut self, version: &str, job_id: JobId) {
        self.harvest_version = Some(version.to_string());
        self.job_id = Some(job_id);
    }

    /// Serialize to the output-queue wire format.
    pub fn to_bytes(&self) -> Result<Vec<u8>, QueueError> {
        serde_json::to_vec(self).map_err(|e| QueueError::Serialization(e.to_string()))
    }

    /// Deserialize from the output-queue wire format.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, QueueError> {
        serde_json::from_slice(bytes).map_err(|e| QueueError::Serialization(e.to_string()))
    }
}

/// Seconds since the Unix epoch, with sub-second precision.
pub fn epoch_seconds(at: DateTime<Utc>) -> f64 {
    at.timestamp() as f64 + f64::from(at.timestamp_subsec_micros()) / 1_000_000.0
}

/// Inverse of [`epoch_seconds`], rounded to the microsecond.
pub fn from_epoch_seconds(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let micros = (secs * 1_000_000.0).round();
    if micros < i64::MIN as f64 || micros > i64::MAX as f64 {
        return None;
    }
    Utc.timestamp_micros(micros as i64).single()
}
