use std::sync::Arc;

use scouting_store::{JobProgressDelta, JobStatus, JobStore, JobUpdate, ScrapingJob, StoreError};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{JobError, Result};
use crate::state::JobAction;

/// Message stored on jobs cancelled through [`ScrapeJobTracker::cancel`]
pub const CANCELLED_BY_USER: &str = "cancelled by user";

/// Counters of one batch processed by the scraping worker
pub type BatchReport = JobProgressDelta;

/// Progress view of the latest job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgress {
    pub id: Uuid,
    pub status: JobStatus,
    pub total_players: i64,
    pub processed_count: i64,
    pub success_count: i64,
    pub error_count: i64,
    /// `round(processed / total × 100)`, capped at 100; 0 when there is nothing to process
    pub progress_percent: i64,
}

impl From<&ScrapingJob> for JobProgress {
    fn from(job: &ScrapingJob) -> Self {
        Self {
            id: job.id,
            status: job.status,
            total_players: job.total_players,
            processed_count: job.processed_count,
            success_count: job.success_count,
            error_count: job.error_count,
            progress_percent: progress_percent(job.processed_count, job.total_players),
        }
    }
}

pub fn progress_percent(processed: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    let percent = (processed.max(0) as f64 / total as f64 * 100.0).round() as i64;
    percent.min(100)
}

/// Drives the lifecycle of scraping jobs stored in a [`JobStore`]
pub struct ScrapeJobTracker<S> {
    store: Arc<S>,
}

impl<S: JobStore> ScrapeJobTracker<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create a pending job. Fails while another job is pending, running or paused.
    pub async fn create_job(&self, total_players: i64, batch_size: i64) -> Result<ScrapingJob> {
        if total_players < 0 {
            return Err(JobError::invalid_input("total_players must not be negative"));
        }
        if batch_size <= 0 {
            return Err(JobError::invalid_input("batch_size must be greater than 0"));
        }

        let job = ScrapingJob::pending(total_players, batch_size);
        match self.store.insert_job_if_idle(&job).await {
            Ok(job) => {
                info!("📝 Created scraping job {} for {} players", job.id, job.total_players);
                Ok(job)
            }
            Err(StoreError::AlreadyExists(_)) => {
                let active = self.store.latest_job(&JobStatus::ACTIVE).await?;
                let detail = match active {
                    Some(job) => format!("{} ({})", job.id, job.status),
                    None => "concurrent creation".to_string(),
                };
                Err(JobError::ActiveJobExists(detail))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// pending → running
    pub async fn start(&self, id: Uuid) -> Result<ScrapingJob> {
        let update = JobUpdate { mark_started: true, ..Default::default() };
        let job = self.transition(id, JobAction::Start, update).await?;
        info!("▶️ Started scraping job {}", job.id);
        Ok(job)
    }

    /// Pause the latest pending or running job
    pub async fn pause(&self) -> Result<ScrapingJob> {
        let job = self.transition_latest(JobAction::Pause, JobUpdate::default()).await?;
        info!("⏸️ Paused scraping job {}", job.id);
        Ok(job)
    }

    /// Resume the latest paused job
    pub async fn resume(&self) -> Result<ScrapingJob> {
        let job = self.transition_latest(JobAction::Resume, JobUpdate::default()).await?;
        info!("▶️ Resumed scraping job {}", job.id);
        Ok(job)
    }

    /// Fail the latest active job with [`CANCELLED_BY_USER`]
    pub async fn cancel(&self) -> Result<ScrapingJob> {
        let update = JobUpdate {
            mark_completed: true,
            last_error: Some(CANCELLED_BY_USER.to_string()),
            ..Default::default()
        };
        let job = self.transition_latest(JobAction::Cancel, update).await?;
        info!("🛑 Cancelled scraping job {}", job.id);
        Ok(job)
    }

    /// Add a processed batch to a running job. The job completes in the same
    /// store update once every player has been processed.
    pub async fn record_batch(&self, id: Uuid, report: &BatchReport) -> Result<ScrapingJob> {
        if report.processed < 0 || report.succeeded < 0 || report.failed < 0 {
            return Err(JobError::invalid_input("batch counters must not be negative"));
        }

        let mut delta = report.clone();
        if delta.failed > 0 && delta.last_error.is_none() {
            delta.last_error =
                Some(format!("{} of {} players failed in the last batch", delta.failed, delta.processed));
        }

        let action = JobAction::RecordBatch;
        let Some(job) = self.store.record_job_progress(id, action.sources(), &delta).await? else {
            return Err(self.rejection(id, action).await);
        };

        if delta.failed > 0 {
            warn!(
                "Scraping job {} batch {}: {} of {} players failed",
                job.id, job.current_batch, delta.failed, delta.processed
            );
        }

        if job.status == JobStatus::Completed {
            info!(
                "✅ Scraping job {} completed: {} processed, {} succeeded, {} failed",
                job.id, job.processed_count, job.success_count, job.error_count
            );
        }

        Ok(job)
    }

    /// running → completed
    pub async fn complete(&self, id: Uuid) -> Result<ScrapingJob> {
        let update = JobUpdate { mark_completed: true, ..Default::default() };
        let job = self.transition(id, JobAction::Complete, update).await?;
        info!("✅ Completed scraping job {}", job.id);
        Ok(job)
    }

    /// running → failed, recording `reason`
    pub async fn fail(&self, id: Uuid, reason: &str) -> Result<ScrapingJob> {
        let update = JobUpdate {
            mark_completed: true,
            last_error: Some(reason.to_string()),
            ..Default::default()
        };
        let job = self.transition(id, JobAction::Fail, update).await?;
        warn!("❌ Scraping job {} failed: {}", job.id, reason);
        Ok(job)
    }

    /// Progress of the most recently created job, if any
    pub async fn status(&self) -> Result<Option<JobProgress>> {
        let latest = self.store.latest_job(&JobStatus::ALL).await?;
        Ok(latest.as_ref().map(JobProgress::from))
    }

    pub async fn get(&self, id: Uuid) -> Result<ScrapingJob> {
        self.store.get_job(id).await?.ok_or(JobError::NotFound(id))
    }

    /// Most recent jobs first
    pub async fn history(&self, limit: usize) -> Result<Vec<ScrapingJob>> {
        Ok(self.store.list_jobs(limit).await?)
    }

    async fn transition(&self, id: Uuid, action: JobAction, update: JobUpdate) -> Result<ScrapingJob> {
        match self.store.transition_job(id, action.sources(), action.target(), &update).await? {
            Some(job) => Ok(job),
            None => Err(self.rejection(id, action).await),
        }
    }

    async fn transition_latest(&self, action: JobAction, update: JobUpdate) -> Result<ScrapingJob> {
        let Some(current) = self.store.latest_job(action.sources()).await? else {
            return Err(JobError::no_eligible_job(action));
        };

        // The status may have moved since the read; the store re-checks it
        self.store
            .transition_job(current.id, action.sources(), action.target(), &update)
            .await?
            .ok_or_else(|| JobError::no_eligible_job(action))
    }

    async fn rejection(&self, id: Uuid, action: JobAction) -> JobError {
        match self.store.get_job(id).await {
            Ok(Some(_)) => JobError::no_eligible_job(action),
            Ok(None) => JobError::NotFound(id),
            Err(e) => e.into(),
        }
    }
}
