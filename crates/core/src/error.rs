//! Error model shared by every layer of a fetch job.

use thiserror::Error;

/// Failure raised while preparing or running a fetch job.
///
/// The first three variants are caller errors detected before any item is
/// produced. Everything else is a run failure: something broke while items
/// were being fetched or forwarded, so a partial result may exist.
#[derive(Debug, Error)]
pub enum JobError {
    /// A named element (usually a backend) is not known.
    #[error("{element} not found")]
    NotFound { element: String },

    /// A parameter has an invalid value (e.g. an empty archive path).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested operation is not supported by the bound backend.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The backend failed while producing items.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Pushing an item to the output queue failed.
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// The archive could not be opened or written.
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

impl JobError {
    pub fn not_found(element: impl Into<String>) -> Self {
        Self::NotFound {
            element: element.into(),
        }
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedOperation(msg.into())
    }

    /// Whether this error happened while the job was running.
    ///
    /// Run failures are the ones a supervisor may retry; the job's partial
    /// result is persisted before they are propagated.
    pub fn is_backend_failure(&self) -> bool {
        matches!(self, Self::Backend(_) | Self::Queue(_) | Self::Archive(_))
    }
}

/// Failure raised by a fetch backend or by the machinery feeding it.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend could not interpret a response or its arguments.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// The transport used to contact the data source failed.
    #[error("transport error: {0:#}")]
    Transport(anyhow::Error),

    /// The requested category is not one the backend produces.
    #[error("category '{category}' not supported by backend '{backend}'")]
    UnsupportedCategory { backend: String, category: String },

    /// Replay from the archive was requested without an archive.
    #[error("fetching from the archive requires an archive manager")]
    ArchiveRequired,

    /// Recording or replaying raw responses failed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

impl BackendError {
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    pub fn transport(err: impl Into<anyhow::Error>) -> Self {
        Self::Transport(err.into())
    }
}

/// Archive store failure.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive serialization error: {0}")]
    Serialization(String),

    #[error("archive not found: {0}")]
    ArchiveNotFound(String),

    /// No response was captured for the given request.
    #[error("no archived response for {0}")]
    ResponseNotFound(String),

    #[error("archive storage error: {0}")]
    Storage(String),
}

/// Output queue failure.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue serialization error: {0}")]
    Serialization(String),

    #[error("queue connection error: {0}")]
    Connection(String),

    #[error("queue command error: {0}")]
    Command(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_failures_are_classified() {
        assert!(JobError::from(BackendError::fetch("boom")).is_backend_failure());
        assert!(JobError::from(QueueError::Command("RPUSH".into())).is_backend_failure());
        assert!(!JobError::not_found("git").is_backend_failure());
        assert!(!JobError::invalid_argument("path").is_backend_failure());
        assert!(!JobError::unsupported("archive").is_backend_failure());
    }

    #[test]
    fn not_found_names_the_element() {
        assert_eq!(JobError::not_found("nntp").to_string(), "nntp not found");
    }
}
