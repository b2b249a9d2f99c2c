//! Fetch jobs.
//!
//! ## Components
//!
//! - `FetchJob`: runs one backend/category and forwards its items to a queue
//! - `JobResult`: latest statistics of a job, persisted when it fails
//! - `JobContext`: what the job runtime provides (job id, queue, metadata)
//! - `execute_fetch_job`: runtime entry point tying the three together

pub mod context;
pub mod entry;
pub mod executor;
pub mod result;

pub use context::JobContext;
pub use entry::{FetchJobRequest, RESULT_META_KEY, execute_fetch_job};
pub use executor::{FetchJob, RunState, VERSION};
pub use result::{JobResult, ResumePoint};
