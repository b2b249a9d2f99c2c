//! Integration tests for the full fetch pipeline.
//!
//! Tests: request → FetchJob → ItemStream → output queue / job metadata
//!
//! Verifies:
//! - Items reach the queue stamped and in production order
//! - Failures persist the partial result and surface the original error
//! - Archive capture can be replayed without touching the live source

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use serde_json::json;

    use harvest_backend::BackendRegistry;
    use harvest_backend::testing::{ArchivingBackend, PlainBackend, scripted_args};
    use harvest_core::{ArchiveArgs, BackendArgs, BackendError, JobError, JobId, TaskId};

    use crate::jobs::{
        FetchJob, FetchJobRequest, JobContext, RESULT_META_KEY, VERSION, execute_fetch_job,
    };
    use crate::meta::{InMemoryJobMetaStore, JobMetaStore};
    use crate::queue::InMemoryItemQueue;

    const QUEUE: &str = "items";

    struct Harness {
        queue: Arc<InMemoryItemQueue>,
        meta: Arc<InMemoryJobMetaStore>,
        registry: BackendRegistry,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_queue(InMemoryItemQueue::new())
        }

        fn with_queue(queue: InMemoryItemQueue) -> Self {
            harvest_observability::init();
            Self {
                queue: Arc::new(queue),
                meta: Arc::new(InMemoryJobMetaStore::new()),
                registry: BackendRegistry::new()
                    .with::<ArchivingBackend>()
                    .with::<PlainBackend>(),
            }
        }

        fn context(&self) -> JobContext {
            JobContext::new(JobId::new(), self.queue.clone(), self.meta.clone())
        }
    }

    fn request(backend: &str, backend_args: BackendArgs) -> FetchJobRequest {
        FetchJobRequest {
            backend: backend.to_string(),
            backend_args,
            items_queue: QUEUE.to_string(),
            task_id: TaskId::new("task-1"),
            category: "item".to_string(),
            archive_args: None,
        }
    }

    fn failing_args(items: u64, fail_after: u64) -> BackendArgs {
        let mut args = scripted_args(items);
        args.insert("fail_after".into(), json!(fail_after));
        args
    }

    #[test]
    fn successful_job_pushes_items_in_order() {
        let h = Harness::new();
        let mut ctx = h.context();

        let result = execute_fetch_job(&mut ctx, &h.registry, &request("archiving", scripted_args(3)))
            .unwrap();

        let items = h.queue.items(QUEUE).unwrap();
        let uuids: Vec<_> = items.iter().map(|i| i.uuid.as_str()).collect();
        assert_eq!(uuids, ["item-0", "item-1", "item-2"]);

        let mapping = result.to_mapping();
        assert_eq!(mapping["fetched"], json!(3));
        assert_eq!(mapping["skipped"], json!(0));
        assert_eq!(mapping["task_id"], json!("task-1"));
        assert_eq!(mapping["backend"], json!("archiving"));
        assert_eq!(mapping["last_uuid"], json!("item-2"));
        assert_eq!(h.meta.save_count(), 0);
    }

    #[test]
    fn pushed_count_matches_fetched_with_skips() {
        let h = Harness::new();
        let mut ctx = h.context();
        let mut args = scripted_args(6);
        args.insert("skip_odd".into(), json!(true));

        let result = execute_fetch_job(&mut ctx, &h.registry, &request("plain", args)).unwrap();

        assert_eq!(result.fetched(), 3);
        assert_eq!(result.skipped(), 3);
        assert_eq!(h.queue.len(QUEUE) as u64, result.fetched());
    }

    #[test]
    fn every_item_carries_version_and_job_id() {
        let h = Harness::new();
        let mut ctx = h.context();

        execute_fetch_job(&mut ctx, &h.registry, &request("plain", scripted_args(4))).unwrap();

        let items = h.queue.items(QUEUE).unwrap();
        assert_eq!(items.len(), 4);
        for item in items {
            assert_eq!(item.harvest_version.as_deref(), Some(VERSION));
            assert_eq!(item.job_id, Some(ctx.job_id()));
        }
    }

    #[test]
    fn unknown_backend_fails_without_side_effects() {
        let h = Harness::new();
        let mut ctx = h.context();

        let err = execute_fetch_job(&mut ctx, &h.registry, &request("missing", scripted_args(3)))
            .unwrap_err();

        assert!(matches!(err, JobError::NotFound { .. }));
        assert!(h.queue.is_empty(QUEUE));
        assert_eq!(h.meta.save_count(), 0);
    }

    #[test]
    fn empty_archive_path_is_invalid() {
        let h = Harness::new();
        let mut ctx = h.context();
        let mut req = request("archiving", scripted_args(3));
        req.archive_args = Some(ArchiveArgs::capture(""));

        let err = execute_fetch_job(&mut ctx, &h.registry, &req).unwrap_err();

        assert!(matches!(err, JobError::InvalidArgument(_)));
        assert!(h.queue.is_empty(QUEUE));

        assert_eq!(h.meta.save_count(), 1);
        let saved = h.meta.load_meta(ctx.job_id()).unwrap().unwrap();
        let result = saved[RESULT_META_KEY].as_object().unwrap();
        assert_eq!(result["backend"], json!("archiving"));
        assert!(!result.contains_key("fetched"));
    }

    #[test]
    fn skips_before_a_failure_are_persisted() {
        let h = Harness::new();
        let mut ctx = h.context();
        let mut args = failing_args(6, 2);
        args.insert("skip_odd".into(), json!(true));

        execute_fetch_job(&mut ctx, &h.registry, &request("plain", args)).unwrap_err();

        let saved = h.meta.load_meta(ctx.job_id()).unwrap().unwrap();
        assert_eq!(saved[RESULT_META_KEY]["fetched"], json!(2));
        assert_eq!(saved[RESULT_META_KEY]["skipped"], json!(2));
        assert_eq!(h.queue.len(QUEUE), 2);
    }

    #[test]
    fn archive_args_for_plain_backend_are_unsupported() {
        let h = Harness::new();
        let mut ctx = h.context();
        let dir = tempfile::tempdir().unwrap();
        let mut req = request("plain", scripted_args(3));
        req.archive_args = Some(ArchiveArgs::replay(dir.path().to_string_lossy(), None));

        let err = execute_fetch_job(&mut ctx, &h.registry, &req).unwrap_err();

        assert!(matches!(err, JobError::UnsupportedOperation(_)));
        assert!(h.queue.is_empty(QUEUE));
        assert_eq!(h.meta.save_count(), 0);
        assert!(ctx.meta().is_empty());
    }

    #[test]
    fn mid_stream_failure_persists_partial_result() {
        let h = Harness::new();
        let mut ctx = h.context();

        let err = execute_fetch_job(&mut ctx, &h.registry, &request("archiving", failing_args(5, 2)))
            .unwrap_err();

        assert!(matches!(err, JobError::Backend(BackendError::Fetch(_))));
        assert_eq!(h.queue.len(QUEUE), 2);

        let saved = h.meta.load_meta(ctx.job_id()).unwrap().unwrap();
        let result = &saved[RESULT_META_KEY];
        assert_eq!(result["fetched"], json!(2));
        assert_eq!(result["last_uuid"], json!("item-1"));
        assert_eq!(result["job_id"], json!(ctx.job_id().to_string()));
        assert_eq!(h.meta.save_count(), 1);
    }

    #[test]
    fn failure_before_first_item_persists_identity_only() {
        let h = Harness::new();
        let mut ctx = h.context();

        let err = execute_fetch_job(&mut ctx, &h.registry, &request("plain", failing_args(5, 0)))
            .unwrap_err();

        assert!(err.is_backend_failure());
        let saved = h.meta.load_meta(ctx.job_id()).unwrap().unwrap();
        let result = saved[RESULT_META_KEY].as_object().unwrap();
        assert_eq!(result["backend"], json!("plain"));
        assert!(!result.contains_key("fetched"));
    }

    #[test]
    fn queue_failure_aborts_the_run() {
        let h = Harness::with_queue(InMemoryItemQueue::bounded(2));
        let mut ctx = h.context();

        let err = execute_fetch_job(&mut ctx, &h.registry, &request("plain", scripted_args(5)))
            .unwrap_err();

        assert!(matches!(err, JobError::Queue(_)));
        assert_eq!(h.queue.len(QUEUE), 2);
        let saved = h.meta.load_meta(ctx.job_id()).unwrap().unwrap();
        assert_eq!(saved[RESULT_META_KEY]["fetched"], json!(2));
    }

    #[test]
    fn existing_metadata_is_kept_alongside_the_result() {
        let h = Harness::new();
        let mut ctx = h.context();
        ctx.meta_mut().insert("attempt".into(), json!(3));

        let _ = execute_fetch_job(&mut ctx, &h.registry, &request("plain", failing_args(2, 1)));

        let saved = h.meta.load_meta(ctx.job_id()).unwrap().unwrap();
        assert_eq!(saved["attempt"], json!(3));
        assert_eq!(saved[RESULT_META_KEY]["fetched"], json!(1));
    }

    #[test]
    fn second_run_discards_first_result() {
        let h = Harness::new();
        let mut job = FetchJob::new(
            JobId::new(),
            TaskId::new("task-1"),
            "archiving",
            "item",
            h.queue.clone(),
            QUEUE,
            &h.registry,
        )
        .unwrap();

        job.run(&scripted_args(3), None).unwrap();
        assert_eq!(job.result().fetched(), 3);

        job.run(&failing_args(3, 0), None).unwrap_err();
        assert!(job.result().summary.is_none());

        job.run(&scripted_args(1), None).unwrap();
        let summary = job.result().summary.as_ref().unwrap();
        assert_eq!(summary.fetched, 1);
        assert_eq!(summary.last_uuid.as_deref(), Some("item-0"));
        assert_eq!(h.queue.len(QUEUE), 4);
    }

    #[test]
    fn caller_args_are_not_mutated() {
        let h = Harness::new();
        let mut ctx = h.context();
        let req = request("archiving", scripted_args(2));
        let before = req.clone();

        execute_fetch_job(&mut ctx, &h.registry, &req).unwrap();

        assert_eq!(req, before);
    }

    #[test]
    fn captured_archive_replays_offline() {
        let h = Harness::new();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_string_lossy().into_owned();

        let mut capture = request("archiving", scripted_args(3));
        capture.archive_args = Some(ArchiveArgs::capture(path.clone()));
        execute_fetch_job(&mut h.context(), &h.registry, &capture).unwrap();

        let mut offline = scripted_args(0);
        offline.insert("offline".into(), json!(true));
        let mut replay = request("archiving", offline);
        replay.archive_args = Some(ArchiveArgs::replay(path, None));

        let mut ctx = h.context();
        let result = execute_fetch_job(&mut ctx, &h.registry, &replay).unwrap();

        assert_eq!(result.fetched(), 3);
        let items = h.queue.items(QUEUE).unwrap();
        assert_eq!(items.len(), 6);
        let replayed: Vec<_> = items[3..].iter().map(|i| i.uuid.as_str()).collect();
        assert_eq!(replayed, ["item-0", "item-1", "item-2"]);
        assert!(items[3..].iter().all(|i| i.job_id == Some(ctx.job_id())));
    }

    #[test]
    fn replay_skips_archives_not_after_the_bound() {
        let h = Harness::new();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_string_lossy().into_owned();

        let mut capture = request("archiving", scripted_args(2));
        capture.archive_args = Some(ArchiveArgs::capture(path.clone()));
        execute_fetch_job(&mut h.context(), &h.registry, &capture).unwrap();

        let mut replay = request("archiving", scripted_args(0));
        replay.archive_args = Some(ArchiveArgs::replay(path, Some(Utc::now() + Duration::hours(1))));
        let result = execute_fetch_job(&mut h.context(), &h.registry, &replay).unwrap();

        assert_eq!(result.fetched(), 0);
        assert_eq!(h.queue.len(QUEUE), 2);
    }
}
