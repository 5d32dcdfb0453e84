//! Job lifecycle against the in-memory store

use std::sync::Arc;

use scouting_store::InMemoryStore;

use crate::{BatchReport, JobError, JobStatus, ScrapeJobTracker, CANCELLED_BY_USER};

fn tracker() -> (Arc<InMemoryStore>, ScrapeJobTracker<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let tracker = ScrapeJobTracker::new(store.clone());
    (store, tracker)
}

fn batch(processed: i64, succeeded: i64, failed: i64) -> BatchReport {
    BatchReport { processed, succeeded, failed, last_error: None }
}

#[cfg(test)]
mod lifecycle_tests {
    use super::*;

    #[tokio::test]
    async fn test_only_one_active_job() {
        let (_, tracker) = tracker();
        let first = tracker.create_job(100, 10).await.unwrap();
        assert_eq!(first.status, JobStatus::Pending);

        let err = tracker.create_job(50, 10).await.unwrap_err();
        assert!(matches!(err, JobError::ActiveJobExists(ref detail) if detail.contains(&first.id.to_string())));

        tracker.cancel().await.unwrap();
        let second = tracker.create_job(50, 10).await.unwrap();
        assert_ne!(second.id, first.id);
    }

    #[tokio::test]
    async fn test_paused_job_blocks_creation() {
        let (_, tracker) = tracker();
        tracker.create_job(10, 5).await.unwrap();
        tracker.pause().await.unwrap();

        let err = tracker.create_job(10, 5).await.unwrap_err();
        assert!(err.is_state_conflict());
    }

    #[tokio::test]
    async fn test_invalid_create_parameters() {
        let (_, tracker) = tracker();
        assert!(matches!(tracker.create_job(-1, 10).await, Err(JobError::InvalidInput(_))));
        assert!(matches!(tracker.create_job(10, 0).await, Err(JobError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_pause_resume_cancel() {
        let (_, tracker) = tracker();
        let job = tracker.create_job(10, 5).await.unwrap();
        tracker.start(job.id).await.unwrap();

        let paused = tracker.pause().await.unwrap();
        assert_eq!(paused.status, JobStatus::Paused);

        let resumed = tracker.resume().await.unwrap();
        assert_eq!(resumed.status, JobStatus::Running);

        // Nothing is paused any more
        let err = tracker.resume().await.unwrap_err();
        assert!(matches!(err, JobError::NoEligibleJob { .. }));

        let cancelled = tracker.cancel().await.unwrap();
        assert_eq!(cancelled.status, JobStatus::Failed);
        assert_eq!(cancelled.last_error.as_deref(), Some(CANCELLED_BY_USER));
        assert!(cancelled.completed_at.is_some());

        assert!(matches!(tracker.cancel().await, Err(JobError::NoEligibleJob { .. })));
    }

    #[tokio::test]
    async fn test_pending_job_can_be_paused() {
        let (_, tracker) = tracker();
        tracker.create_job(10, 5).await.unwrap();

        let paused = tracker.pause().await.unwrap();
        assert_eq!(paused.status, JobStatus::Paused);
        assert!(paused.started_at.is_none());

        // Already paused, so there is nothing left to pause
        match tracker.pause().await {
            Err(JobError::NoEligibleJob { action, expected }) => {
                assert_eq!(action, crate::JobAction::Pause);
                assert_eq!(expected, "pending or running");
            }
            other => panic!("expected NoEligibleJob, got {other:?}"),
        }
        assert_eq!(tracker.status().await.unwrap().unwrap().status, JobStatus::Paused);
    }

    #[tokio::test]
    async fn test_no_job_to_pause() {
        let (_, tracker) = tracker();
        match tracker.pause().await {
            Err(JobError::NoEligibleJob { action, expected }) => {
                assert_eq!(action, crate::JobAction::Pause);
                assert_eq!(expected, "pending or running");
            }
            other => panic!("expected NoEligibleJob, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_start_only_from_pending() {
        let (_, tracker) = tracker();
        let job = tracker.create_job(10, 5).await.unwrap();

        let started = tracker.start(job.id).await.unwrap();
        assert_eq!(started.status, JobStatus::Running);
        let started_at = started.started_at.unwrap();

        assert!(matches!(tracker.start(job.id).await, Err(JobError::NoEligibleJob { .. })));

        // Resuming keeps the original start time
        tracker.pause().await.unwrap();
        let resumed = tracker.resume().await.unwrap();
        assert_eq!(resumed.started_at, Some(started_at));

        let unknown = uuid::Uuid::new_v4();
        assert!(matches!(tracker.start(unknown).await, Err(JobError::NotFound(id)) if id == unknown));
    }

    #[tokio::test]
    async fn test_fail_records_reason() {
        let (_, tracker) = tracker();
        let job = tracker.create_job(10, 5).await.unwrap();

        // Only running jobs can fail
        assert!(matches!(tracker.fail(job.id, "boom").await, Err(JobError::NoEligibleJob { .. })));

        tracker.start(job.id).await.unwrap();
        let failed = tracker.fail(job.id, "source site unreachable").await.unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.last_error.as_deref(), Some("source site unreachable"));
        assert!(failed.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_complete_running_job() {
        let (_, tracker) = tracker();
        let job = tracker.create_job(10, 5).await.unwrap();
        assert!(tracker.complete(job.id).await.is_err());

        tracker.start(job.id).await.unwrap();
        let done = tracker.complete(job.id).await.unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert!(done.completed_at.is_some());
    }
}

#[cfg(test)]
mod progress_tests {
    use super::*;

    #[tokio::test]
    async fn test_batches_accumulate_and_complete_the_job() {
        let (_, tracker) = tracker();
        let job = tracker.create_job(5, 2).await.unwrap();
        tracker.start(job.id).await.unwrap();

        let after_first = tracker.record_batch(job.id, &batch(2, 2, 0)).await.unwrap();
        assert_eq!(after_first.status, JobStatus::Running);
        assert_eq!(after_first.current_batch, 1);
        assert!(after_first.last_processed_at.is_some());

        let after_second = tracker.record_batch(job.id, &batch(2, 1, 1)).await.unwrap();
        assert_eq!(after_second.error_count, 1);
        assert!(after_second.last_error.as_deref().unwrap().contains("1 of 2"));

        let status = tracker.status().await.unwrap().unwrap();
        assert_eq!(status.processed_count, 4);
        assert_eq!(status.progress_percent, 80);

        let done = tracker.record_batch(job.id, &batch(1, 1, 0)).await.unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.processed_count, 5);
        assert_eq!(done.success_count, 4);
        assert_eq!(done.current_batch, 3);
        assert!(done.completed_at.is_some());

        let status = tracker.status().await.unwrap().unwrap();
        assert_eq!(status.progress_percent, 100);
    }

    #[tokio::test]
    async fn test_paused_job_rejects_batches() {
        let (_, tracker) = tracker();
        let job = tracker.create_job(10, 5).await.unwrap();
        tracker.start(job.id).await.unwrap();
        tracker.pause().await.unwrap();

        let err = tracker.record_batch(job.id, &batch(5, 5, 0)).await.unwrap_err();
        assert!(matches!(err, JobError::NoEligibleJob { .. }));
        assert_eq!(tracker.get(job.id).await.unwrap().processed_count, 0);
    }

    #[tokio::test]
    async fn test_negative_counters_rejected() {
        let (_, tracker) = tracker();
        let job = tracker.create_job(10, 5).await.unwrap();
        tracker.start(job.id).await.unwrap();
        assert!(matches!(
            tracker.record_batch(job.id, &batch(-1, 0, 0)).await,
            Err(JobError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_status_without_jobs_and_with_empty_job() {
        let (_, tracker) = tracker();
        assert!(tracker.status().await.unwrap().is_none());

        tracker.create_job(0, 5).await.unwrap();
        let status = tracker.status().await.unwrap().unwrap();
        assert_eq!(status.status, JobStatus::Pending);
        assert_eq!(status.progress_percent, 0);
    }

    #[tokio::test]
    async fn test_history_newest_first() {
        let (_, tracker) = tracker();
        let first = tracker.create_job(1, 1).await.unwrap();
        tracker.cancel().await.unwrap();
        let second = tracker.create_job(2, 1).await.unwrap();

        let history = tracker.history(10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, second.id);
        assert_eq!(history[1].id, first.id);

        assert_eq!(tracker.history(1).await.unwrap().len(), 1);
        assert!(matches!(tracker.get(uuid::Uuid::new_v4()).await, Err(JobError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_progress_serializes_camel_case() {
        let (_, tracker) = tracker();
        tracker.create_job(4, 2).await.unwrap();
        let status = tracker.status().await.unwrap().unwrap();

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["totalPlayers"], 4);
        assert_eq!(json["progressPercent"], 0);
        assert_eq!(json["status"], "pending");
    }
}

#[cfg(test)]
mod concurrency_tests {
    use super::*;

    #[tokio::test]
    async fn test_concurrent_pause_has_one_winner() {
        let (_, tracker) = tracker();
        let job = tracker.create_job(10, 5).await.unwrap();
        tracker.start(job.id).await.unwrap();

        let (a, b) = tokio::join!(tracker.pause(), tracker.pause());

        let wins = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(wins, 1);
        let loser = if a.is_err() { a } else { b };
        assert!(matches!(loser, Err(JobError::NoEligibleJob { .. })));
        assert_eq!(tracker.get(job.id).await.unwrap().status, JobStatus::Paused);
    }

    #[tokio::test]
    async fn test_concurrent_create_has_one_winner() {
        let (store, _) = tracker();
        let tracker = Arc::new(ScrapeJobTracker::new(store));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = tracker.clone();
                tokio::spawn(async move { tracker.create_job(10, 5).await })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn test_cancel_racing_resume() {
        let (_, tracker) = tracker();
        let job = tracker.create_job(10, 5).await.unwrap();
        tracker.start(job.id).await.unwrap();
        tracker.pause().await.unwrap();

        let (resumed, cancelled) = tokio::join!(tracker.resume(), tracker.cancel());

        // Cancel accepts both paused and running, so it always lands
        assert!(cancelled.is_ok());
        let final_job = tracker.get(job.id).await.unwrap();
        assert_eq!(final_job.status, JobStatus::Failed);
        if let Ok(r) = resumed {
            assert_eq!(r.status, JobStatus::Running);
        }
    }
}

#[cfg(test)]
mod interleaving_tests {
    use super::*;
    use scouting_store::{JobProgressDelta, JobStore, JobUpdate, ScrapingJob};
    use std::sync::atomic::{AtomicBool, Ordering};
    use uuid::Uuid;

    /// When a pause lands relative to the progress write
    #[derive(Clone, Copy)]
    enum PauseAt {
        BeforeProgress,
        AfterProgress,
    }

    /// Store that lets a `pause()` from another caller land next to a
    /// progress write
    struct InterleavingStore {
        inner: InMemoryStore,
        pause_at: PauseAt,
        pause_applied: AtomicBool,
    }

    impl InterleavingStore {
        fn new(pause_at: PauseAt) -> Self {
            Self { inner: InMemoryStore::new(), pause_at, pause_applied: AtomicBool::new(false) }
        }

        async fn pause(&self, id: Uuid) -> scouting_store::Result<()> {
            let paused = self
                .inner
                .transition_job(id, &[JobStatus::Pending, JobStatus::Running], JobStatus::Paused, &JobUpdate::default())
                .await?;
            self.pause_applied.store(paused.is_some(), Ordering::SeqCst);
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl JobStore for InterleavingStore {
        async fn insert_job_if_idle(&self, job: &ScrapingJob) -> scouting_store::Result<ScrapingJob> {
            self.inner.insert_job_if_idle(job).await
        }

        async fn latest_job(&self, statuses: &[JobStatus]) -> scouting_store::Result<Option<ScrapingJob>> {
            self.inner.latest_job(statuses).await
        }

        async fn get_job(&self, id: Uuid) -> scouting_store::Result<Option<ScrapingJob>> {
            self.inner.get_job(id).await
        }

        async fn list_jobs(&self, limit: usize) -> scouting_store::Result<Vec<ScrapingJob>> {
            self.inner.list_jobs(limit).await
        }

        async fn transition_job(
            &self,
            id: Uuid,
            expected: &[JobStatus],
            to: JobStatus,
            update: &JobUpdate,
        ) -> scouting_store::Result<Option<ScrapingJob>> {
            self.inner.transition_job(id, expected, to, update).await
        }

        async fn record_job_progress(
            &self,
            id: Uuid,
            expected: &[JobStatus],
            delta: &JobProgressDelta,
        ) -> scouting_store::Result<Option<ScrapingJob>> {
            if let PauseAt::BeforeProgress = self.pause_at {
                self.pause(id).await?;
            }
            let recorded = self.inner.record_job_progress(id, expected, delta).await?;
            if let PauseAt::AfterProgress = self.pause_at {
                self.pause(id).await?;
            }
            Ok(recorded)
        }
    }

    async fn running_job(store: &Arc<InterleavingStore>) -> (ScrapeJobTracker<InterleavingStore>, Uuid) {
        let tracker = ScrapeJobTracker::new(store.clone());
        let job = tracker.create_job(4, 4).await.unwrap();
        tracker.start(job.id).await.unwrap();
        (tracker, job.id)
    }

    #[tokio::test]
    async fn test_final_batch_completes_before_a_late_pause() {
        let store = Arc::new(InterleavingStore::new(PauseAt::AfterProgress));
        let (tracker, id) = running_job(&store).await;

        let returned = tracker.record_batch(id, &batch(4, 4, 0)).await.unwrap();

        // The completing batch already left the active states, so the pause loses
        assert!(!store.pause_applied.load(Ordering::SeqCst));
        let stored = tracker.get(id).await.unwrap();
        assert_eq!(returned.status, JobStatus::Completed);
        assert_eq!(stored.status, JobStatus::Completed);
        assert_eq!(stored.processed_count, 4);
        assert!(stored.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_pause_before_final_batch_rejects_it() {
        let store = Arc::new(InterleavingStore::new(PauseAt::BeforeProgress));
        let (tracker, id) = running_job(&store).await;

        let err = tracker.record_batch(id, &batch(4, 4, 0)).await.unwrap_err();

        assert!(store.pause_applied.load(Ordering::SeqCst));
        assert!(matches!(err, JobError::NoEligibleJob { .. }));
        let stored = tracker.get(id).await.unwrap();
        assert_eq!(stored.status, JobStatus::Paused);
        assert_eq!(stored.processed_count, 0);
    }

    #[tokio::test]
    async fn test_partial_batch_keeps_the_job_running() {
        let (_, tracker) = tracker();
        let job = tracker.create_job(4, 2).await.unwrap();
        tracker.start(job.id).await.unwrap();

        let returned = tracker.record_batch(job.id, &batch(2, 2, 0)).await.unwrap();
        assert_eq!(returned.status, JobStatus::Running);
        assert!(returned.completed_at.is_none());
        assert_eq!(tracker.get(job.id).await.unwrap().status, JobStatus::Running);
    }
}

#[cfg(test)]
mod property_tests {
    use crate::progress_percent;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_progress_percent_in_range(processed in 0i64..1_000_000, total in 0i64..1_000_000) {
            let percent = progress_percent(processed, total);
            prop_assert!((0..=100).contains(&percent));
            if total > 0 && processed >= total {
                prop_assert_eq!(percent, 100);
            }
        }
    }
}
