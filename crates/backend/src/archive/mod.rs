//! Raw-response archive.
//!
//! An archive is one capture session: the raw responses a backend received
//! during a live fetch, keyed by request, together with the parameters the
//! backend ran with. Replaying an archive rebuilds the backend from those
//! parameters and feeds it the stored responses, so items can be regenerated
//! without contacting the data source again.
//!
//! ## Components
//!
//! - `ArchiveStore`: storage boundary (in-memory or filesystem)
//! - `ArchiveManager`: shared handle a job binds to for one run

pub mod fs;
pub mod in_memory;

pub use fs::FsArchiveStore;
pub use in_memory::InMemoryArchiveStore;

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use harvest_core::{ArchiveError, BackendArgs, JobError};

use crate::backend::Request;
use crate::registry::BackendHandle;

/// Description of one capture session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveMetadata {
    pub archive_id: String,
    pub origin: String,
    pub backend_name: String,
    pub backend_version: String,
    pub category: String,
    /// Arguments the backend ran with; used to rebuild it on replay.
    pub backend_args: BackendArgs,
    pub created_at: DateTime<Utc>,
}

/// Filter used to find archives to replay.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveQuery<'a> {
    pub origin: &'a str,
    pub backend_name: &'a str,
    pub category: &'a str,
    /// Only archives created at or after this instant match.
    pub archived_after: Option<DateTime<Utc>>,
}

impl ArchiveQuery<'_> {
    pub fn matches(&self, metadata: &ArchiveMetadata) -> bool {
        metadata.origin == self.origin
            && metadata.backend_name == self.backend_name
            && metadata.category == self.category
            && self
                .archived_after
                .map_or(true, |after| metadata.created_at >= after)
    }
}

/// Storage boundary for archives.
pub trait ArchiveStore: Send + Sync {
    /// Register a new, empty archive.
    fn create_archive(&self, metadata: &ArchiveMetadata) -> Result<(), ArchiveError>;

    /// Store the raw response obtained for `request`.
    fn store(&self, archive_id: &str, request: &Request, body: &str) -> Result<(), ArchiveError>;

    /// Retrieve the raw response stored for `request`.
    fn retrieve(&self, archive_id: &str, request: &Request) -> Result<String, ArchiveError>;

    /// Archives matching `query`, oldest first.
    fn search(&self, query: &ArchiveQuery<'_>) -> Result<Vec<ArchiveMetadata>, ArchiveError>;
}

impl<S: ArchiveStore + ?Sized> ArchiveStore for Arc<S> {
    fn create_archive(&self, metadata: &ArchiveMetadata) -> Result<(), ArchiveError> {
        (**self).create_archive(metadata)
    }

    fn store(&self, archive_id: &str, request: &Request, body: &str) -> Result<(), ArchiveError> {
        (**self).store(archive_id, request, body)
    }

    fn retrieve(&self, archive_id: &str, request: &Request) -> Result<String, ArchiveError> {
        (**self).retrieve(archive_id, request)
    }

    fn search(&self, query: &ArchiveQuery<'_>) -> Result<Vec<ArchiveMetadata>, ArchiveError> {
        (**self).search(query)
    }
}

/// Handle to the archive a job records into or replays from.
///
/// Clones share the same store.
#[derive(Clone)]
pub struct ArchiveManager {
    location: String,
    store: Arc<dyn ArchiveStore>,
}

impl ArchiveManager {
    /// Open (or create) a filesystem archive rooted at `location`.
    ///
    /// An empty location is rejected; callers that do not want archiving
    /// should not open a manager at all.
    pub fn open(location: &str) -> Result<Self, JobError> {
        if location.is_empty() {
            return Err(JobError::invalid_argument("archive manager path cannot be empty"));
        }

        let store = FsArchiveStore::open(Path::new(location))?;
        Ok(Self {
            location: location.to_string(),
            store: Arc::new(store),
        })
    }

    /// Wrap an existing store.
    pub fn with_store(location: impl Into<String>, store: Arc<dyn ArchiveStore>) -> Self {
        Self {
            location: location.into(),
            store,
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Start a new capture session for a live fetch.
    pub fn create_archive(
        &self,
        origin: &str,
        backend: &BackendHandle,
        category: &str,
        backend_args: &BackendArgs,
    ) -> Result<ArchiveMetadata, ArchiveError> {
        let metadata = ArchiveMetadata {
            archive_id: Uuid::now_v7().to_string(),
            origin: origin.to_string(),
            backend_name: backend.name().to_string(),
            backend_version: backend.version().to_string(),
            category: category.to_string(),
            backend_args: backend_args.clone(),
            created_at: Utc::now(),
        };
        self.store.create_archive(&metadata)?;
        Ok(metadata)
    }

    pub fn store(&self, archive_id: &str, request: &Request, body: &str) -> Result<(), ArchiveError> {
        self.store.store(archive_id, request, body)
    }

    pub fn retrieve(&self, archive_id: &str, request: &Request) -> Result<String, ArchiveError> {
        self.store.retrieve(archive_id, request)
    }

    pub fn search(&self, query: &ArchiveQuery<'_>) -> Result<Vec<ArchiveMetadata>, ArchiveError> {
        self.store.search(query)
    }
}

impl core::fmt::Debug for ArchiveManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ArchiveManager")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}
