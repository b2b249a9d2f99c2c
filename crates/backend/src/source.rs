//! Where raw responses come from during a fetch.

use tracing::trace;

use harvest_core::BackendError;

use crate::archive::ArchiveManager;
use crate::backend::{Request, Transport};

enum Mode {
    /// Straight to the data source.
    Live,
    /// Data source, with each response captured into an archive.
    Recording {
        archive: ArchiveManager,
        archive_id: String,
    },
    /// Responses read back from an archive; the transport is never used.
    Replay {
        archive: ArchiveManager,
        archive_id: String,
    },
}

/// Response provider handed to a backend through its fetch context.
pub struct ResponseSource {
    transport: Box<dyn Transport>,
    mode: Mode,
}

impl ResponseSource {
    pub fn live(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            mode: Mode::Live,
        }
    }

    pub fn recording(
        transport: Box<dyn Transport>,
        archive: ArchiveManager,
        archive_id: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            mode: Mode::Recording {
                archive,
                archive_id: archive_id.into(),
            },
        }
    }

    pub fn replay(
        transport: Box<dyn Transport>,
        archive: ArchiveManager,
        archive_id: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            mode: Mode::Replay {
                archive,
                archive_id: archive_id.into(),
            },
        }
    }

    pub fn is_replay(&self) -> bool {
        matches!(self.mode, Mode::Replay { .. })
    }

    pub fn fetch(&mut self, request: &Request) -> Result<String, BackendError> {
        match &self.mode {
            Mode::Live => self.transport.fetch(request),
            Mode::Recording {
                archive,
                archive_id,
            } => {
                let body = self.transport.fetch(request)?;
                archive.store(archive_id, request, &body)?;
                trace!(archive_id = %archive_id, uri = %request.uri, "response archived");
                Ok(body)
            }
            Mode::Replay {
                archive,
                archive_id,
            } => Ok(archive.retrieve(archive_id, request)?),
        }
    }
}

impl core::fmt::Debug for ResponseSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mode = match &self.mode {
            Mode::Live => "live",
            Mode::Recording { .. } => "recording",
            Mode::Replay { .. } => "replay",
        };
        f.debug_struct("ResponseSource").field("mode", &mode).finish()
    }
}
