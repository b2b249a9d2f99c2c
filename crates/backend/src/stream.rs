//! Lazy item production.
//!
//! [`ItemStream`] drives a backend one item at a time and keeps the fetch
//! summary up to date as it goes. It is an [`Iterator`] over
//! `Result<Item, BackendError>`:
//!
//! - **Finite**: ends when the backend (or every replayed archive) is exhausted
//! - **Single pass**: a new stream must be built to fetch again
//! - **Fused**: after an error or exhaustion it keeps returning `None`
//!
//! The summary is available through [`ItemStream::summary`] at any point;
//! it is `None` until something has been observed.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use tracing::debug;

use harvest_core::{BackendArgs, BackendError, FetchSummary, Item};

use crate::archive::{ArchiveManager, ArchiveMetadata, ArchiveQuery};
use crate::backend::{FetchBackend, FetchContext};
use crate::registry::BackendHandle;
use crate::source::ResponseSource;

/// Lifecycle of a stream.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StreamState {
    Streaming,
    Exhausted,
    Failed,
}

struct ActiveFetch {
    fetcher: Box<dyn FetchBackend>,
    source: ResponseSource,
}

/// Options that select live fetching or archive replay.
#[derive(Debug, Clone, Default)]
pub struct StreamOptions {
    pub archive: Option<ArchiveManager>,
    pub fetch_from_archive: bool,
    /// Only replay archives created after this instant.
    pub archived_after: Option<DateTime<Utc>>,
}

/// Sequence of items produced by one backend run.
pub struct ItemStream {
    backend: BackendHandle,
    category: String,
    archive: Option<ArchiveManager>,
    active: Option<ActiveFetch>,
    /// Archives still to be replayed, oldest first.
    pending: VecDeque<ArchiveMetadata>,
    summary: FetchSummary,
    state: StreamState,
}

impl ItemStream {
    /// Prepare a stream for `backend` with the given arguments.
    ///
    /// Live mode builds the backend right away and, when an archive is
    /// given, opens a new capture session. Replay mode looks up the archives
    /// to replay; backends are rebuilt per archive as the stream advances.
    pub fn new(
        backend: BackendHandle,
        args: &BackendArgs,
        category: &str,
        options: StreamOptions,
    ) -> Result<Self, BackendError> {
        if !backend.supports_category(category) {
            return Err(BackendError::UnsupportedCategory {
                backend: backend.name().to_string(),
                category: category.to_string(),
            });
        }

        let StreamOptions {
            archive,
            fetch_from_archive,
            archived_after,
        } = options;

        let mut stream = Self {
            backend,
            category: category.to_string(),
            archive: archive.clone(),
            active: None,
            pending: VecDeque::new(),
            summary: FetchSummary::new(),
            state: StreamState::Streaming,
        };

        let instance = backend.build(args)?;

        if fetch_from_archive {
            let archive = archive.ok_or(BackendError::ArchiveRequired)?;
            let query = ArchiveQuery {
                origin: instance.fetcher.origin(),
                backend_name: backend.name(),
                category,
                archived_after,
            };
            stream.pending = archive.search(&query)?.into();
            debug!(
                backend = backend.name(),
                origin = query.origin,
                archives = stream.pending.len(),
                "replaying items from archive"
            );
            return Ok(stream);
        }

        let source = match archive {
            Some(archive) => {
                let metadata =
                    archive.create_archive(instance.fetcher.origin(), &backend, category, args)?;
                ResponseSource::recording(instance.transport, archive, metadata.archive_id)
            }
            None => ResponseSource::live(instance.transport),
        };

        stream.active = Some(ActiveFetch {
            fetcher: instance.fetcher,
            source,
        });
        Ok(stream)
    }

    pub fn backend(&self) -> &BackendHandle {
        &self.backend
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == StreamState::Exhausted
    }

    /// Statistics gathered so far.
    ///
    /// `None` until an item was produced or skipped, or the stream ended.
    pub fn summary(&self) -> Option<&FetchSummary> {
        let observed = self.summary.fetched > 0 || self.summary.skipped > 0;
        if observed || self.state == StreamState::Exhausted {
            Some(&self.summary)
        } else {
            None
        }
    }

    /// Start replaying the next pending archive, if any.
    fn activate_next_archive(&mut self) -> Result<bool, BackendError> {
        let Some(metadata) = self.pending.pop_front() else {
            return Ok(false);
        };
        let archive = self.archive.clone().ok_or(BackendError::ArchiveRequired)?;

        let instance = self.backend.build(&metadata.backend_args)?;
        debug!(
            backend = self.backend.name(),
            archive_id = %metadata.archive_id,
            created_at = %metadata.created_at,
            "replaying archive"
        );
        self.active = Some(ActiveFetch {
            fetcher: instance.fetcher,
            source: ResponseSource::replay(instance.transport, archive, metadata.archive_id),
        });
        Ok(true)
    }

    fn fail(&mut self, err: BackendError) -> Option<Result<Item, BackendError>> {
        self.state = StreamState::Failed;
        self.active = None;
        self.pending.clear();
        Some(Err(err))
    }
}

impl Iterator for ItemStream {
    type Item = Result<Item, BackendError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.state != StreamState::Streaming {
                return None;
            }

            let Some(active) = self.active.as_mut() else {
                match self.activate_next_archive() {
                    Ok(true) => continue,
                    Ok(false) => {
                        self.state = StreamState::Exhausted;
                        debug!(
                            backend = self.backend.name(),
                            fetched = self.summary.fetched,
                            skipped = self.summary.skipped,
                            "item stream exhausted"
                        );
                        return None;
                    }
                    Err(e) => return self.fail(e),
                }
            };

            let mut ctx = FetchContext::new(&mut active.source, &mut self.summary);
            match active.fetcher.next_item(&mut ctx) {
                Ok(Some(item)) => {
                    self.summary.update(&item);
                    return Some(Ok(item));
                }
                Ok(None) => self.active = None,
                Err(e) => return self.fail(e),
            }
        }
    }
}

impl std::iter::FusedIterator for ItemStream {}

impl core::fmt::Debug for ItemStream {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ItemStream")
            .field("backend", &self.backend.name())
            .field("category", &self.category)
            .field("state", &self.state)
            .field("pending_archives", &self.pending.len())
            .finish_non_exhaustive()
    }
}
