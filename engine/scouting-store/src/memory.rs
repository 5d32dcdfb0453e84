//! In-memory store backend (tests, demos)
//!
//! Carries a small fault plan so callers can simulate failed writes and an
//! unreachable store.

use crate::backend::{JobStore, ScoutingStore};
use crate::error::{Result, StoreError};
use crate::models::{
    AgeValues, Competition, CoverageCounts, JobProgressDelta, JobStatus, JobUpdate,
    NationalityValues, Player, RatingValues, ScrapingJob, Team, ValueDimension,
};
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

#[derive(Debug, Default)]
struct FaultPlan {
    failing_writes: HashSet<String>,
    /// Pages still served before page fetches start failing
    page_budget: Option<usize>,
    snapshots_unavailable: bool,
}

/// Store backed by ordered maps
#[derive(Debug, Default)]
pub struct InMemoryStore {
    players: RwLock<BTreeMap<String, Player>>,
    teams: RwLock<BTreeMap<String, Team>>,
    competitions: RwLock<BTreeMap<String, Competition>>,
    jobs: Mutex<Vec<ScrapingJob>>,
    faults: Mutex<FaultPlan>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_player(&self, player: Player) {
        self.players.write().await.insert(player.id_player.clone(), player);
    }

    pub async fn insert_team(&self, team: Team) {
        self.teams.write().await.insert(team.id_team.clone(), team);
    }

    pub async fn insert_competition(&self, competition: Competition) {
        self.competitions.write().await.insert(competition.id_competition.clone(), competition);
    }

    pub async fn player(&self, id: &str) -> Option<Player> {
        self.players.read().await.get(id).cloned()
    }

    pub async fn team(&self, id: &str) -> Option<Team> {
        self.teams.read().await.get(id).cloned()
    }

    pub async fn competition(&self, id: &str) -> Option<Competition> {
        self.competitions.read().await.get(id).cloned()
    }

    /// Make every write to `id` fail
    pub async fn fail_writes_for(&self, id: impl Into<String>) {
        self.faults.lock().await.failing_writes.insert(id.into());
    }

    /// Serve `pages` more pages, then fail every page fetch
    pub async fn fail_pages_after(&self, pages: usize) {
        self.faults.lock().await.page_budget = Some(pages);
    }

    /// Make snapshot reads fail
    pub async fn fail_snapshots(&self) {
        self.faults.lock().await.snapshots_unavailable = true;
    }

    async fn check_write(&self, entity: &'static str, id: &str) -> Result<()> {
        if self.faults.lock().await.failing_writes.contains(id) {
            return Err(StoreError::WriteRejected {
                entity,
                id: id.to_string(),
                reason: "injected write failure".to_string(),
            });
        }
        Ok(())
    }

    async fn check_page(&self) -> Result<()> {
        let mut faults = self.faults.lock().await;
        match faults.page_budget.as_mut() {
            Some(0) => Err(StoreError::unavailable("page fetch failed")),
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    async fn check_snapshot(&self) -> Result<()> {
        if self.faults.lock().await.snapshots_unavailable {
            return Err(StoreError::unavailable("snapshot read failed"));
        }
        Ok(())
    }
}

fn page_of<T: Clone>(map: &BTreeMap<String, T>, after: Option<&str>, limit: usize) -> Vec<T> {
    let lower = match after {
        Some(id) => Bound::Excluded(id.to_string()),
        None => Bound::Unbounded,
    };
    map.range((lower, Bound::Unbounded)).take(limit).map(|(_, v)| v.clone()).collect()
}

fn count_where<T>(map: &BTreeMap<String, T>, pred: impl Fn(&T) -> bool) -> u64 {
    map.values().filter(|v| pred(v)).count() as u64
}

#[async_trait::async_trait]
impl ScoutingStore for InMemoryStore {
    async fn count_players(&self) -> Result<u64> {
        self.check_snapshot().await?;
        Ok(self.players.read().await.len() as u64)
    }

    async fn player_page(&self, after: Option<&str>, limit: usize) -> Result<Vec<Player>> {
        self.check_page().await?;
        Ok(page_of(&*self.players.read().await, after, limit))
    }

    async fn player_valuation_snapshot(&self) -> Result<Vec<Player>> {
        self.check_snapshot().await?;
        let players = self.players.read().await;
        Ok(players.values().filter(|p| p.market_value.is_some()).cloned().collect())
    }

    async fn get_player(&self, id: &str) -> Result<Option<Player>> {
        Ok(self.players.read().await.get(id).cloned())
    }

    async fn write_player_age_values(&self, id: &str, values: &AgeValues) -> Result<()> {
        self.check_write("player", id).await?;
        let mut players = self.players.write().await;
        let player =
            players.get_mut(id).ok_or_else(|| StoreError::not_found(format!("player {id}")))?;
        player.age_value = values.age_value;
        player.age_value_percent = values.age_value_percent;
        player.age_coeff = values.age_coeff;
        Ok(())
    }

    async fn write_player_nationality_values(
        &self,
        id: &str,
        values: &NationalityValues,
    ) -> Result<()> {
        self.check_write("player", id).await?;
        let mut players = self.players.write().await;
        let player =
            players.get_mut(id).ok_or_else(|| StoreError::not_found(format!("player {id}")))?;
        player.nationality_value = values.nationality_value;
        player.nationality_value_percent = values.nationality_value_percent;
        Ok(())
    }

    async fn count_teams(&self) -> Result<u64> {
        self.check_snapshot().await?;
        Ok(self.teams.read().await.len() as u64)
    }

    async fn team_page(&self, after: Option<&str>, limit: usize) -> Result<Vec<Team>> {
        self.check_page().await?;
        Ok(page_of(&*self.teams.read().await, after, limit))
    }

    async fn team_valuation_snapshot(&self) -> Result<Vec<Team>> {
        self.check_snapshot().await?;
        let teams = self.teams.read().await;
        Ok(teams
            .values()
            .filter(|t| t.team_value.is_some() || t.team_rating.is_some())
            .cloned()
            .collect())
    }

    async fn write_team_values(&self, id: &str, values: &RatingValues) -> Result<()> {
        self.check_write("team", id).await?;
        let mut teams = self.teams.write().await;
        let team = teams.get_mut(id).ok_or_else(|| StoreError::not_found(format!("team {id}")))?;
        team.team_cohort_value = values.cohort_value;
        team.team_value_percent = values.value_percent;
        team.team_value_norm = values.value_norm;
        team.team_rating_norm = values.rating_norm;
        team.team_score = values.score;
        team.team_level = values.level.clone();
        Ok(())
    }

    async fn count_competitions(&self) -> Result<u64> {
        self.check_snapshot().await?;
        Ok(self.competitions.read().await.len() as u64)
    }

    async fn competition_page(
        &self,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Competition>> {
        self.check_page().await?;
        Ok(page_of(&*self.competitions.read().await, after, limit))
    }

    async fn competition_valuation_snapshot(&self) -> Result<Vec<Competition>> {
        self.check_snapshot().await?;
        let competitions = self.competitions.read().await;
        Ok(competitions
            .values()
            .filter(|c| c.competition_value.is_some() || c.competition_rating.is_some())
            .cloned()
            .collect())
    }

    async fn write_competition_values(&self, id: &str, values: &RatingValues) -> Result<()> {
        self.check_write("competition", id).await?;
        let mut competitions = self.competitions.write().await;
        let competition = competitions
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(format!("competition {id}")))?;
        competition.competition_cohort_value = values.cohort_value;
        competition.competition_value_percent = values.value_percent;
        competition.competition_value_norm = values.value_norm;
        competition.competition_rating_norm = values.rating_norm;
        competition.competition_score = values.score;
        competition.competition_level = values.level.clone();
        Ok(())
    }

    async fn coverage(&self, dimension: ValueDimension) -> Result<CoverageCounts> {
        self.check_snapshot().await?;
        let counts = match dimension {
            ValueDimension::Age => {
                let players = self.players.read().await;
                CoverageCounts {
                    total: players.len() as u64,
                    with_value: count_where(&*players, |p| p.age_value.is_some()),
                    with_percent: count_where(&*players, |p| p.age_value_percent.is_some()),
                }
            }
            ValueDimension::Nationality => {
                let players = self.players.read().await;
                CoverageCounts {
                    total: players.len() as u64,
                    with_value: count_where(&*players, |p| p.nationality_value.is_some()),
                    with_percent: count_where(&*players, |p| {
                        p.nationality_value_percent.is_some()
                    }),
                }
            }
            ValueDimension::Team => {
                let teams = self.teams.read().await;
                CoverageCounts {
                    total: teams.len() as u64,
                    with_value: count_where(&*teams, |t| t.team_cohort_value.is_some()),
                    with_percent: count_where(&*teams, |t| t.team_value_percent.is_some()),
                }
            }
            ValueDimension::Competition => {
                let competitions = self.competitions.read().await;
                CoverageCounts {
                    total: competitions.len() as u64,
                    with_value: count_where(&*competitions, |c| {
                        c.competition_cohort_value.is_some()
                    }),
                    with_percent: count_where(&*competitions, |c| {
                        c.competition_value_percent.is_some()
                    }),
                }
            }
        };
        Ok(counts)
    }
}

#[async_trait::async_trait]
impl JobStore for InMemoryStore {
    async fn insert_job_if_idle(&self, job: &ScrapingJob) -> Result<ScrapingJob> {
        let mut jobs = self.jobs.lock().await;
        if let Some(active) = jobs.iter().find(|j| JobStatus::ACTIVE.contains(&j.status)) {
            return Err(StoreError::already_exists(format!("active scraping job {}", active.id)));
        }
        jobs.push(job.clone());
        Ok(job.clone())
    }

    async fn latest_job(&self, statuses: &[JobStatus]) -> Result<Option<ScrapingJob>> {
        let jobs = self.jobs.lock().await;
        // Later inserts win ties on created_at
        Ok(jobs
            .iter()
            .enumerate()
            .filter(|(_, j)| statuses.contains(&j.status))
            .max_by_key(|(idx, j)| (j.created_at, *idx))
            .map(|(_, j)| j.clone()))
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<ScrapingJob>> {
        Ok(self.jobs.lock().await.iter().find(|j| j.id == id).cloned())
    }

    async fn list_jobs(&self, limit: usize) -> Result<Vec<ScrapingJob>> {
        let jobs = self.jobs.lock().await;
        let mut listed: Vec<(usize, &ScrapingJob)> = jobs.iter().enumerate().collect();
        listed.sort_by(|(ia, a), (ib, b)| (b.created_at, ib).cmp(&(a.created_at, ia)));
        Ok(listed.into_iter().take(limit).map(|(_, j)| j.clone()).collect())
    }

    async fn transition_job(
        &self,
        id: Uuid,
        expected: &[JobStatus],
        to: JobStatus,
        update: &JobUpdate,
    ) -> Result<Option<ScrapingJob>> {
        let mut jobs = self.jobs.lock().await;
        let Some(job) = jobs.iter_mut().find(|j| j.id == id) else {
            return Ok(None);
        };
        if !expected.contains(&job.status) {
            return Ok(None);
        }

        let now = Utc::now();
        job.status = to;
        job.updated_at = now;
        if update.mark_started && job.started_at.is_none() {
            job.started_at = Some(now);
        }
        if update.mark_completed {
            job.completed_at = Some(now);
        }
        if let Some(message) = &update.last_error {
            job.last_error = Some(message.clone());
        }
        Ok(Some(job.clone()))
    }

    async fn record_job_progress(
        &self,
        id: Uuid,
        expected: &[JobStatus],
        delta: &JobProgressDelta,
    ) -> Result<Option<ScrapingJob>> {
        let mut jobs = self.jobs.lock().await;
        let Some(job) = jobs.iter_mut().find(|j| j.id == id) else {
            return Ok(None);
        };
        if !expected.contains(&job.status) {
            return Ok(None);
        }

        let now = Utc::now();
        job.processed_count += delta.processed;
        job.success_count += delta.succeeded;
        job.error_count += delta.failed;
        job.current_batch += 1;
        job.last_processed_at = Some(now);
        job.updated_at = now;
        job.last_error = delta.last_error.clone();
        if job.processed_count >= job.total_players {
            job.status = JobStatus::Completed;
            job.completed_at = Some(now);
        }
        Ok(Some(job.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded(n: usize) -> InMemoryStore {
        let store = InMemoryStore::new();
        for i in 0..n {
            store.insert_player(Player::new(format!("p{i:03}"), format!("Player {i}"))).await;
        }
        store
    }

    #[tokio::test]
    async fn test_keyset_pages_cover_table_once() {
        let store = seeded(7).await;

        let first = store.player_page(None, 3).await.unwrap();
        let second = store.player_page(Some(&first[2].id_player), 3).await.unwrap();
        let third = store.player_page(Some(&second[2].id_player), 3).await.unwrap();

        assert_eq!(first.len(), 3);
        assert_eq!(second.len(), 3);
        assert_eq!(third.len(), 1);
        assert_eq!(third[0].id_player, "p006");
    }

    #[tokio::test]
    async fn test_write_to_missing_player_is_not_found() {
        let store = seeded(1).await;
        let values = AgeValues { age_value: Some(1.0), age_value_percent: None, age_coeff: None };

        let err = store.write_player_age_values("nope", &values).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_injected_faults() {
        let store = seeded(2).await;
        store.fail_writes_for("p000").await;
        let values = NationalityValues { nationality_value: None, nationality_value_percent: None };

        assert!(store.write_player_nationality_values("p000", &values).await.is_err());
        assert!(store.write_player_nationality_values("p001", &values).await.is_ok());

        store.fail_pages_after(1).await;
        assert!(store.player_page(None, 1).await.is_ok());
        assert!(matches!(store.player_page(None, 1).await, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_single_active_job() {
        let store = InMemoryStore::new();
        let first = store.insert_job_if_idle(&ScrapingJob::pending(10, 5)).await.unwrap();

        let err = store.insert_job_if_idle(&ScrapingJob::pending(10, 5)).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));

        store
            .transition_job(first.id, &[JobStatus::Pending], JobStatus::Failed, &JobUpdate::default())
            .await
            .unwrap()
            .unwrap();
        assert!(store.insert_job_if_idle(&ScrapingJob::pending(10, 5)).await.is_ok());
        assert_eq!(store.list_jobs(10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_transition_is_conditional() {
        let store = InMemoryStore::new();
        let job = store.insert_job_if_idle(&ScrapingJob::pending(3, 1)).await.unwrap();

        let paused = store
            .transition_job(job.id, &[JobStatus::Pending], JobStatus::Paused, &JobUpdate::default())
            .await
            .unwrap();
        assert_eq!(paused.unwrap().status, JobStatus::Paused);

        let again = store
            .transition_job(job.id, &[JobStatus::Pending], JobStatus::Paused, &JobUpdate::default())
            .await
            .unwrap();
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn test_progress_reaching_total_completes_in_one_update() {
        let store = InMemoryStore::new();
        let job = store.insert_job_if_idle(&ScrapingJob::pending(3, 2)).await.unwrap();
        let running = [JobStatus::Running];
        store
            .transition_job(job.id, &[JobStatus::Pending], JobStatus::Running, &JobUpdate::default())
            .await
            .unwrap()
            .unwrap();

        let delta = JobProgressDelta { processed: 2, succeeded: 2, ..Default::default() };
        let partial = store.record_job_progress(job.id, &running, &delta).await.unwrap().unwrap();
        assert_eq!(partial.status, JobStatus::Running);
        assert!(partial.completed_at.is_none());

        let delta = JobProgressDelta { processed: 1, succeeded: 1, ..Default::default() };
        let done = store.record_job_progress(job.id, &running, &delta).await.unwrap().unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert!(done.completed_at.is_some());

        // Completed jobs take no more batches
        assert!(store.record_job_progress(job.id, &running, &delta).await.unwrap().is_none());
    }
}
