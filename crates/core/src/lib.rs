//! `harvest-core` — building blocks shared by fetch jobs.
//!
//! This crate contains **pure data** (no I/O): identifiers, the fetched
//! [`Item`] record, the [`FetchSummary`] statistics block, run parameters and
//! the error model.

pub mod error;
pub mod id;
pub mod item;
pub mod params;
pub mod summary;

pub use error::{ArchiveError, BackendError, JobError, QueueError};
pub use id::{JobId, TaskId};
pub use item::{Item, epoch_seconds, from_epoch_seconds};
pub use params::{ArchiveArgs, BackendArgs};
pub use summary::FetchSummary;
