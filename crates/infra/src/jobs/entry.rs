//! Entry point called by the job runtime for a fetch job.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use harvest_backend::BackendRegistry;
use harvest_core::{ArchiveArgs, BackendArgs, JobError, TaskId};

use super::context::JobContext;
use super::executor::FetchJob;
use super::result::JobResult;

/// Metadata key holding the partial result of a failed job.
pub const RESULT_META_KEY: &str = "result";

/// Arguments of a fetch job, as enqueued by the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchJobRequest {
    pub backend: String,
    #[serde(default)]
    pub backend_args: BackendArgs,
    pub items_queue: String,
    pub task_id: TaskId,
    pub category: String,
    #[serde(default)]
    pub archive_args: Option<ArchiveArgs>,
}

/// Run a fetch job inside the worker context `ctx`.
///
/// Unknown backends and archive arguments for a backend without archiving
/// support fail before anything runs. Any other failure stores the partial
/// result under [`RESULT_META_KEY`] in the job metadata and is returned
/// unchanged.
pub fn execute_fetch_job(
    ctx: &mut JobContext,
    registry: &BackendRegistry,
    request: &FetchJobRequest,
) -> Result<JobResult, JobError> {
    let mut job = FetchJob::new(
        ctx.job_id(),
        request.task_id.clone(),
        &request.backend,
        request.category.clone(),
        ctx.queue(),
        request.items_queue.clone(),
        registry,
    )?;

    if !job.has_archiving() && request.archive_args.is_some() {
        return Err(JobError::unsupported(
            "archive attributes set but archive is not supported",
        ));
    }

    if let Err(err) = job.run(&request.backend_args, request.archive_args.as_ref()) {
        if !matches!(err, JobError::UnsupportedOperation(_)) {
            let result = job.result();
            ctx.meta_mut()
                .insert(RESULT_META_KEY.to_string(), JsonValue::Object(result.to_mapping()));
            if let Err(meta_err) = ctx.save_meta() {
                warn!(
                    job_id = %ctx.job_id(),
                    error = %meta_err,
                    "failed to persist job result"
                );
            }
            debug!(
                job_id = %ctx.job_id(),
                task_id = %request.task_id,
                backend = %request.backend,
                fetched = result.fetched(),
                error = %err,
                "fetch job failed"
            );
        }
        return Err(err);
    }

    let result = job.into_result();
    debug!(
        job_id = %ctx.job_id(),
        task_id = %request.task_id,
        backend = %request.backend,
        fetched = result.fetched(),
        skipped = result.skipped(),
        "fetch job completed"
    );
    Ok(result)
}
