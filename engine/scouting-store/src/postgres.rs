//! PostgreSQL store backend

use crate::backend::{JobStore, ScoutingStore};
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::models::{
    AgeValues, Competition, CoverageCounts, JobProgressDelta, JobStatus, JobUpdate,
    NationalityValues, Player, RatingValues, ScrapingJob, Team, ValueDimension,
};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

/// Store backed by a sqlx connection pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    status: String,
    total_players: i64,
    processed_count: i64,
    success_count: i64,
    error_count: i64,
    current_batch: i64,
    batch_size: i64,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    last_processed_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
    last_error: Option<String>,
}

impl TryFrom<JobRow> for ScrapingJob {
    type Error = StoreError;

    fn try_from(row: JobRow) -> Result<Self> {
        let status = row.status.parse::<JobStatus>().map_err(StoreError::corruption)?;
        Ok(ScrapingJob {
            id: row.id,
            status,
            total_players: row.total_players,
            processed_count: row.processed_count,
            success_count: row.success_count,
            error_count: row.error_count,
            current_batch: row.current_batch,
            batch_size: row.batch_size,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
            last_processed_at: row.last_processed_at,
            updated_at: row.updated_at,
            last_error: row.last_error,
        })
    }
}

fn status_names(statuses: &[JobStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

fn to_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn page_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn ensure_updated(
    result: sqlx::postgres::PgQueryResult,
    entity: &'static str,
    id: &str,
) -> Result<()> {
    if result.rows_affected() == 0 {
        return Err(StoreError::not_found(format!("{entity} {id}")));
    }
    Ok(())
}

const ACTIVE_FILTER: &str = "status IN ('pending', 'running', 'paused')";

impl PgStore {
    /// Connect using `config`, running migrations when enabled
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        config.validate().map_err(StoreError::config)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;

        let store = Self { pool };
        if config.run_migrations {
            store.migrate().await?;
        }

        tracing::info!("Postgres store connected (max_connections={})", config.max_connections);
        Ok(store)
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn count(&self, table: &'static str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {table}");
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(to_count(count))
    }

    async fn write_rating(
        &self,
        table: &'static str,
        prefix: &'static str,
        key: &'static str,
        id: &str,
        values: &RatingValues,
    ) -> Result<()> {
        let sql = format!(
            "UPDATE {table} SET {prefix}_cohort_value = $2, {prefix}_value_percent = $3, \
             {prefix}_value_norm = $4, {prefix}_rating_norm = $5, {prefix}_score = $6, \
             {prefix}_level = $7 WHERE {key} = $1"
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(values.cohort_value)
            .bind(values.value_percent)
            .bind(values.value_norm)
            .bind(values.rating_norm)
            .bind(values.score)
            .bind(values.level.as_deref())
            .execute(&self.pool)
            .await?;
        ensure_updated(result, prefix, id)
    }
}

#[async_trait::async_trait]
impl ScoutingStore for PgStore {
    async fn count_players(&self) -> Result<u64> {
        self.count("players").await
    }

    async fn player_page(&self, after: Option<&str>, limit: usize) -> Result<Vec<Player>> {
        let players = sqlx::query_as::<_, Player>(
            "SELECT * FROM players WHERE ($1::text IS NULL OR id_player > $1) \
             ORDER BY id_player LIMIT $2",
        )
        .bind(after)
        .bind(page_limit(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(players)
    }

    async fn player_valuation_snapshot(&self) -> Result<Vec<Player>> {
        let players = sqlx::query_as::<_, Player>(
            "SELECT * FROM players WHERE market_value IS NOT NULL ORDER BY id_player",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(players)
    }

    async fn get_player(&self, id: &str) -> Result<Option<Player>> {
        let player = sqlx::query_as::<_, Player>("SELECT * FROM players WHERE id_player = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(player)
    }

    async fn write_player_age_values(&self, id: &str, values: &AgeValues) -> Result<()> {
        let result = sqlx::query(
            "UPDATE players SET age_value = $2, age_value_percent = $3, age_coeff = $4 \
             WHERE id_player = $1",
        )
        .bind(id)
        .bind(values.age_value)
        .bind(values.age_value_percent)
        .bind(values.age_coeff)
        .execute(&self.pool)
        .await?;
        ensure_updated(result, "player", id)
    }

    async fn write_player_nationality_values(
        &self,
        id: &str,
        values: &NationalityValues,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE players SET nationality_value = $2, nationality_value_percent = $3 \
             WHERE id_player = $1",
        )
        .bind(id)
        .bind(values.nationality_value)
        .bind(values.nationality_value_percent)
        .execute(&self.pool)
        .await?;
        ensure_updated(result, "player", id)
    }

    async fn count_teams(&self) -> Result<u64> {
        self.count("teams").await
    }

    async fn team_page(&self, after: Option<&str>, limit: usize) -> Result<Vec<Team>> {
        let teams = sqlx::query_as::<_, Team>(
            "SELECT * FROM teams WHERE ($1::text IS NULL OR id_team > $1) \
             ORDER BY id_team LIMIT $2",
        )
        .bind(after)
        .bind(page_limit(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(teams)
    }

    async fn team_valuation_snapshot(&self) -> Result<Vec<Team>> {
        let teams = sqlx::query_as::<_, Team>(
            "SELECT * FROM teams WHERE team_value IS NOT NULL OR team_rating IS NOT NULL \
             ORDER BY id_team",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(teams)
    }

    async fn write_team_values(&self, id: &str, values: &RatingValues) -> Result<()> {
        self.write_rating("teams", "team", "id_team", id, values).await
    }

    async fn count_competitions(&self) -> Result<u64> {
        self.count("competitions").await
    }

    async fn competition_page(
        &self,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Competition>> {
        let competitions = sqlx::query_as::<_, Competition>(
            "SELECT * FROM competitions WHERE ($1::text IS NULL OR id_competition > $1) \
             ORDER BY id_competition LIMIT $2",
        )
        .bind(after)
        .bind(page_limit(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(competitions)
    }

    async fn competition_valuation_snapshot(&self) -> Result<Vec<Competition>> {
        let competitions = sqlx::query_as::<_, Competition>(
            "SELECT * FROM competitions \
             WHERE competition_value IS NOT NULL OR competition_rating IS NOT NULL \
             ORDER BY id_competition",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(competitions)
    }

    async fn write_competition_values(&self, id: &str, values: &RatingValues) -> Result<()> {
        self.write_rating("competitions", "competition", "id_competition", id, values).await
    }

    async fn coverage(&self, dimension: ValueDimension) -> Result<CoverageCounts> {
        let (table, value_col, percent_col) = match dimension {
            ValueDimension::Age => ("players", "age_value", "age_value_percent"),
            ValueDimension::Nationality => {
                ("players", "nationality_value", "nationality_value_percent")
            }
            ValueDimension::Team => ("teams", "team_cohort_value", "team_value_percent"),
            ValueDimension::Competition => {
                ("competitions", "competition_cohort_value", "competition_value_percent")
            }
        };
        let sql = format!("SELECT COUNT(*), COUNT({value_col}), COUNT({percent_col}) FROM {table}");
        let (total, with_value, with_percent): (i64, i64, i64) =
            sqlx::query_as(&sql).fetch_one(&self.pool).await?;

        Ok(CoverageCounts {
            total: to_count(total),
            with_value: to_count(with_value),
            with_percent: to_count(with_percent),
        })
    }
}

#[async_trait::async_trait]
impl JobStore for PgStore {
    async fn insert_job_if_idle(&self, job: &ScrapingJob) -> Result<ScrapingJob> {
        let sql = format!(
            "INSERT INTO scraping_jobs (id, status, total_players, processed_count, success_count, \
             error_count, current_batch, batch_size, created_at, updated_at) \
             SELECT $1::uuid, $2::text, $3::bigint, 0, 0, 0, 0, $4::bigint, $5::timestamptz, $5::timestamptz \
             WHERE NOT EXISTS (SELECT 1 FROM scraping_jobs WHERE {ACTIVE_FILTER}) \
             RETURNING *"
        );
        let inserted = sqlx::query_as::<_, JobRow>(&sql)
            .bind(job.id)
            .bind(job.status.as_str())
            .bind(job.total_players)
            .bind(job.batch_size)
            .bind(job.created_at)
            .fetch_optional(&self.pool)
            .await;

        match inserted {
            Ok(Some(row)) => row.try_into(),
            Ok(None) => {
                let active = self.latest_job(&JobStatus::ACTIVE).await?;
                let id = active.map(|j| j.id.to_string()).unwrap_or_default();
                Err(StoreError::already_exists(format!("active scraping job {id}")))
            }
            // Lost the race against a concurrent insert; the partial unique index caught it
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::already_exists("active scraping job"))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn latest_job(&self, statuses: &[JobStatus]) -> Result<Option<ScrapingJob>> {
        let row = sqlx::query_as::<_, JobRow>(
            "SELECT * FROM scraping_jobs WHERE status = ANY($1) ORDER BY created_at DESC LIMIT 1",
        )
        .bind(status_names(statuses))
        .fetch_optional(&self.pool)
        .await?;
        row.map(ScrapingJob::try_from).transpose()
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<ScrapingJob>> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM scraping_jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(ScrapingJob::try_from).transpose()
    }

    async fn list_jobs(&self, limit: usize) -> Result<Vec<ScrapingJob>> {
        let rows = sqlx::query_as::<_, JobRow>(
            "SELECT * FROM scraping_jobs ORDER BY created_at DESC LIMIT $1",
        )
        .bind(page_limit(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ScrapingJob::try_from).collect()
    }

    async fn transition_job(
        &self,
        id: Uuid,
        expected: &[JobStatus],
        to: JobStatus,
        update: &JobUpdate,
    ) -> Result<Option<ScrapingJob>> {
        let row = sqlx::query_as::<_, JobRow>(
            "UPDATE scraping_jobs SET status = $3, updated_at = now(), \
             started_at = CASE WHEN $4 THEN COALESCE(started_at, now()) ELSE started_at END, \
             completed_at = CASE WHEN $5 THEN now() ELSE completed_at END, \
             last_error = COALESCE($6, last_error) \
             WHERE id = $1 AND status = ANY($2) \
             RETURNING *",
        )
        .bind(id)
        .bind(status_names(expected))
        .bind(to.as_str())
        .bind(update.mark_started)
        .bind(update.mark_completed)
        .bind(update.last_error.as_deref())
        .fetch_optional(&self.pool)
        .await?;
        row.map(ScrapingJob::try_from).transpose()
    }

    async fn record_job_progress(
        &self,
        id: Uuid,
        expected: &[JobStatus],
        delta: &JobProgressDelta,
    ) -> Result<Option<ScrapingJob>> {
        let row = sqlx::query_as::<_, JobRow>(
            "UPDATE scraping_jobs SET processed_count = processed_count + $3, \
             success_count = success_count + $4, error_count = error_count + $5, \
             current_batch = current_batch + 1, last_processed_at = now(), updated_at = now(), \
             last_error = $6, \
             status = CASE WHEN processed_count + $3 >= total_players THEN 'completed' ELSE status END, \
             completed_at = CASE WHEN processed_count + $3 >= total_players THEN now() ELSE completed_at END \
             WHERE id = $1 AND status = ANY($2) \
             RETURNING *",
        )
        .bind(id)
        .bind(status_names(expected))
        .bind(delta.processed)
        .bind(delta.succeeded)
        .bind(delta.failed)
        .bind(delta.last_error.as_deref())
        .fetch_optional(&self.pool)
        .await?;
        row.map(ScrapingJob::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_row_conversion_rejects_unknown_status() {
        let now = Utc::now();
        let row = JobRow {
            id: Uuid::new_v4(),
            status: "cancelled".to_string(),
            total_players: 0,
            processed_count: 0,
            success_count: 0,
            error_count: 0,
            current_batch: 0,
            batch_size: 0,
            created_at: now,
            started_at: None,
            completed_at: None,
            last_processed_at: None,
            updated_at: now,
            last_error: None,
        };
        assert!(matches!(ScrapingJob::try_from(row), Err(StoreError::Corruption(_))));
    }

    #[test]
    fn test_status_names_and_limits() {
        assert_eq!(status_names(&JobStatus::ACTIVE), vec!["pending", "running", "paused"]);
        assert_eq!(page_limit(500), 500);
        assert_eq!(to_count(-1), 0);
    }
}
