//! `harvest-backend` — fetch backends and the machinery around them.
//!
//! - [`Backend`] / [`FetchBackend`] / [`Transport`]: the backend contract
//! - [`BackendRegistry`]: name → capability-tagged backend lookup
//! - [`ArchiveManager`]: raw-response capture and replay
//! - [`ItemStream`]: lazy, single-pass item production with a running summary

pub mod archive;
pub mod backend;
pub mod registry;
pub mod source;
pub mod stream;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use archive::{
    ArchiveManager, ArchiveMetadata, ArchiveQuery, ArchiveStore, FsArchiveStore,
    InMemoryArchiveStore,
};
pub use backend::{
    Backend, BackendInstance, Capabilities, FetchBackend, FetchContext, Request, Transport,
};
pub use registry::{BackendHandle, BackendRegistry};
pub use source::ResponseSource;
pub use stream::{ItemStream, StreamOptions, StreamState};
