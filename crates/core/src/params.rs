//! Parameters a fetch job is launched with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Backend-specific arguments (e.g. a repository URI, a start date).
///
/// The job layer treats this as opaque; only backends interpret it.
pub type BackendArgs = Map<String, JsonValue>;

/// Archive settings for a run.
///
/// Omitting the whole struct means "no archiving". An empty `archive_path` is
/// a caller error, rejected when the archive is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveArgs {
    pub archive_path: String,
    /// Replay raw responses from the archive instead of contacting the source.
    #[serde(default)]
    pub fetch_from_archive: bool,
    /// Only replay archives created after this instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_after: Option<DateTime<Utc>>,
}

impl ArchiveArgs {
    /// Capture raw responses into the archive at `path` while fetching live.
    pub fn capture(path: impl Into<String>) -> Self {
        Self {
            archive_path: path.into(),
            fetch_from_archive: false,
            archived_after: None,
        }
    }

    /// Replay raw responses stored in the archive at `path`.
    pub fn replay(path: impl Into<String>, archived_after: Option<DateTime<Utc>>) -> Self {
        Self {
            archive_path: path.into(),
            fetch_from_archive: true,
            archived_after,
        }
    }

    /// Lower bound for replayed archives; only meaningful when replaying.
    pub fn replay_bound(&self) -> Option<DateTime<Utc>> {
        if self.fetch_from_archive {
            self.archived_after
        } else {
            None
        }
    }
}
