//! Outcome of a fetch job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use harvest_core::{FetchSummary, JobId, TaskId};

/// Latest known state of a fetch job.
///
/// `summary` stays `None` until the job has pushed at least one item or its
/// item stream has ended. Once set it is only ever replaced as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: JobId,
    pub task_id: TaskId,
    pub backend: String,
    pub category: String,
    pub summary: Option<FetchSummary>,
}

/// Where a resumable backend could pick up after this job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumePoint {
    pub from_date: Option<DateTime<Utc>>,
    pub offset: Option<i64>,
}

impl JobResult {
    pub fn new(
        job_id: JobId,
        task_id: TaskId,
        backend: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            job_id,
            task_id,
            backend: backend.into(),
            category: category.into(),
            summary: None,
        }
    }

    pub fn fetched(&self) -> u64 {
        self.summary.as_ref().map_or(0, |s| s.fetched)
    }

    pub fn skipped(&self) -> u64 {
        self.summary.as_ref().map_or(0, |s| s.skipped)
    }

    /// Flat document stored in job metadata.
    ///
    /// Identity fields are always present; statistics only once a summary
    /// was captured.
    pub fn to_mapping(&self) -> Map<String, JsonValue> {
        let mut map = Map::new();
        map.insert("job_id".into(), JsonValue::String(self.job_id.to_string()));
        map.insert("task_id".into(), JsonValue::String(self.task_id.to_string()));
        map.insert("backend".into(), JsonValue::String(self.backend.clone()));
        map.insert("category".into(), JsonValue::String(self.category.clone()));

        if let Some(summary) = &self.summary {
            map.extend(summary.to_mapping());
        }
        map
    }

    /// Highest watermarks reached, if any item was fetched.
    pub fn resume_point(&self) -> Option<ResumePoint> {
        let summary = self.summary.as_ref()?;
        if summary.max_updated_on.is_none() && summary.max_offset.is_none() {
            return None;
        }
        Some(ResumePoint {
            from_date: summary.max_updated_on,
            offset: summary.max_offset,
        })
    }
}
