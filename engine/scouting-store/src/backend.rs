//! Store traits consumed by the calculators and the job tracker

use crate::error::Result;
use crate::models::{
    AgeValues, Competition, CoverageCounts, JobProgressDelta, JobStatus, JobUpdate,
    NationalityValues, Player, RatingValues, ScrapingJob, Team, ValueDimension,
};
use uuid::Uuid;

/// Entity tables and their derived-value columns
///
/// Pages are keyset-ordered by primary id ascending: `after` is the last id
/// of the previous page (`None` for the first page). Snapshot reads return
/// every row that carries a base metric and are used for cohort aggregation.
#[async_trait::async_trait]
pub trait ScoutingStore: Send + Sync {
    /// Number of player rows
    async fn count_players(&self) -> Result<u64>;

    /// Next page of players
    async fn player_page(&self, after: Option<&str>, limit: usize) -> Result<Vec<Player>>;

    /// Players with a market value
    async fn player_valuation_snapshot(&self) -> Result<Vec<Player>>;

    /// Point read by id
    async fn get_player(&self, id: &str) -> Result<Option<Player>>;

    /// Write age-derived fields of one player
    async fn write_player_age_values(&self, id: &str, values: &AgeValues) -> Result<()>;

    /// Write nationality-derived fields of one player
    async fn write_player_nationality_values(
        &self,
        id: &str,
        values: &NationalityValues,
    ) -> Result<()>;

    async fn count_teams(&self) -> Result<u64>;

    async fn team_page(&self, after: Option<&str>, limit: usize) -> Result<Vec<Team>>;

    /// Teams with a market value or a rating
    async fn team_valuation_snapshot(&self) -> Result<Vec<Team>>;

    async fn write_team_values(&self, id: &str, values: &RatingValues) -> Result<()>;

    async fn count_competitions(&self) -> Result<u64>;

    async fn competition_page(&self, after: Option<&str>, limit: usize)
        -> Result<Vec<Competition>>;

    /// Competitions with a market value or a rating
    async fn competition_valuation_snapshot(&self) -> Result<Vec<Competition>>;

    async fn write_competition_values(&self, id: &str, values: &RatingValues) -> Result<()>;

    /// Rows carrying the dimension's cohort value and percentage
    async fn coverage(&self, dimension: ValueDimension) -> Result<CoverageCounts>;
}

/// Persisted scraping jobs
///
/// Every status change goes through [`JobStore::transition_job`], which only
/// applies when the stored status is still one of `expected`.
#[async_trait::async_trait]
pub trait JobStore: Send + Sync {
    /// Insert `job` unless a job in an active state exists.
    ///
    /// Fails with `StoreError::AlreadyExists` carrying the active job's id.
    async fn insert_job_if_idle(&self, job: &ScrapingJob) -> Result<ScrapingJob>;

    /// Most recently created job whose status is in `statuses`
    async fn latest_job(&self, statuses: &[JobStatus]) -> Result<Option<ScrapingJob>>;

    async fn get_job(&self, id: Uuid) -> Result<Option<ScrapingJob>>;

    /// Jobs ordered newest first
    async fn list_jobs(&self, limit: usize) -> Result<Vec<ScrapingJob>>;

    /// Compare-and-set status change. `None` when the job is missing or its
    /// status is no longer in `expected`.
    async fn transition_job(
        &self,
        id: Uuid,
        expected: &[JobStatus],
        to: JobStatus,
        update: &JobUpdate,
    ) -> Result<Option<ScrapingJob>>;

    /// Add a batch's counters, bump `current_batch` and stamp
    /// `last_processed_at`, only while the status is in `expected`.
    /// The same update completes the job once `processed_count` reaches
    /// `total_players`.
    async fn record_job_progress(
        &self,
        id: Uuid,
        expected: &[JobStatus],
        delta: &JobProgressDelta,
    ) -> Result<Option<ScrapingJob>>;
}
