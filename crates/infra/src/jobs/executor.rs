//! Fetch job executor.
//!
//! A [`FetchJob`] binds one backend and category to an output queue. Each
//! call to [`FetchJob::run`] drives a fresh [`ItemStream`] to completion,
//! stamping every item and appending it to the queue in production order.

use std::sync::Arc;

use tracing::debug;

use harvest_backend::{ArchiveManager, BackendHandle, BackendRegistry, ItemStream, StreamOptions};
use harvest_core::{ArchiveArgs, BackendArgs, JobError, JobId, TaskId};

use super::result::JobResult;
use crate::queue::ItemQueue;

/// Version tag stamped on every forwarded item.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Lifecycle of the current run.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Initializing,
    Streaming,
    Completed,
    Failed,
}

pub struct FetchJob {
    job_id: JobId,
    task_id: TaskId,
    backend: BackendHandle,
    category: String,
    queue: Arc<dyn ItemQueue>,
    items_queue: String,
    /// Archive bound for the current run only.
    archive: Option<ArchiveManager>,
    /// Pre-opened manager, used when a run names its location.
    provided_archive: Option<ArchiveManager>,
    result: JobResult,
    stream: Option<ItemStream>,
    state: RunState,
}

impl FetchJob {
    /// Bind `backend_name` for `category`, pushing to `items_queue`.
    ///
    /// Fails with [`JobError::NotFound`] when the registry does not know the
    /// backend.
    pub fn new(
        job_id: JobId,
        task_id: TaskId,
        backend_name: &str,
        category: impl Into<String>,
        queue: Arc<dyn ItemQueue>,
        items_queue: impl Into<String>,
        registry: &BackendRegistry,
    ) -> Result<Self, JobError> {
        let backend = registry.resolve(backend_name)?;
        let category = category.into();
        let result = JobResult::new(job_id, task_id.clone(), backend.name(), category.clone());

        Ok(Self {
            job_id,
            task_id,
            backend,
            category,
            queue,
            items_queue: items_queue.into(),
            archive: None,
            provided_archive: None,
            result,
            stream: None,
            state: RunState::Idle,
        })
    }

    /// Bind the archive at `location` for the current run.
    ///
    /// A manager given to [`FetchJob::with_archive`] is used when its
    /// location matches; any other location is opened on the filesystem.
    pub fn initialize_archive(&mut self, location: &str) -> Result<(), JobError> {
        let provided = self
            .provided_archive
            .as_ref()
            .filter(|archive| !location.is_empty() && archive.location() == location);

        self.archive = Some(match provided {
            Some(archive) => archive.clone(),
            None => ArchiveManager::open(location)?,
        });
        Ok(())
    }

    /// Register an already opened archive manager for runs whose archive
    /// arguments name its location.
    pub fn with_archive(mut self, archive: ArchiveManager) -> Self {
        self.provided_archive = Some(archive);
        self
    }

    /// Fetch all items and push them to the output queue.
    ///
    /// The caller's `args` are never modified. On failure the items pushed so
    /// far stay in the queue and [`FetchJob::result`] reports them.
    pub fn run(
        &mut self,
        args: &BackendArgs,
        archive_args: Option<&ArchiveArgs>,
    ) -> Result<(), JobError> {
        let args = args.clone();

        self.state = RunState::Initializing;
        self.stream = None;
        self.archive = None;

        if let Some(archive_args) = archive_args {
            if let Err(e) = self.initialize_archive(&archive_args.archive_path) {
                self.state = RunState::Failed;
                return Err(e);
            }
        }

        self.result = JobResult::new(
            self.job_id,
            self.task_id.clone(),
            self.backend.name(),
            self.category.clone(),
        );

        let options = StreamOptions {
            archive: self.archive.clone(),
            fetch_from_archive: archive_args.is_some_and(|a| a.fetch_from_archive),
            archived_after: archive_args.and_then(ArchiveArgs::replay_bound),
        };

        debug!(
            job_id = %self.job_id,
            task_id = %self.task_id,
            backend = self.backend.name(),
            category = %self.category,
            from_archive = options.fetch_from_archive,
            "running fetch job"
        );

        match self.stream_items(&args, options) {
            Ok(()) => {
                self.state = RunState::Completed;
                Ok(())
            }
            Err(e) => {
                self.state = RunState::Failed;
                Err(e)
            }
        }
    }

    fn stream_items(&mut self, args: &BackendArgs, options: StreamOptions) -> Result<(), JobError> {
        let stream = self.stream.insert(ItemStream::new(
            self.backend,
            args,
            &self.category,
            options,
        )?);
        self.state = RunState::Streaming;

        while let Some(item) = stream.next() {
            // Every item yielded before a backend error has been pushed, so
            // the stream's summary (skips included) is accurate here.
            let mut item = match item {
                Ok(item) => item,
                Err(e) => {
                    self.result.summary = stream.summary().cloned();
                    return Err(e.into());
                }
            };
            item.annotate(VERSION, self.job_id);
            self.queue.push(&self.items_queue, item.to_bytes()?)?;
            self.result.summary = stream.summary().cloned();
        }

        self.result.summary = stream.summary().cloned();
        Ok(())
    }

    /// Latest result of the current (or last) run.
    pub fn result(&self) -> &JobResult {
        &self.result
    }

    pub fn into_result(self) -> JobResult {
        self.result
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn has_archiving(&self) -> bool {
        self.backend.supports_archiving()
    }

    pub fn has_resuming(&self) -> bool {
        self.backend.supports_resuming()
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn items_queue(&self) -> &str {
        &self.items_queue
    }
}

impl core::fmt::Debug for FetchJob {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FetchJob")
            .field("job_id", &self.job_id)
            .field("task_id", &self.task_id)
            .field("backend", &self.backend.name())
            .field("category", &self.category)
            .field("items_queue", &self.items_queue)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
