//! Records stored by the scouting platform
//!
//! Derived fields (`*_value`, `*_percent`, `*_norm`, `*_score`, `*_level`,
//! `age_coeff`) are nullable until a calculator writes them and are never
//! edited by hand.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Player record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Player {
    pub id_player: String,
    pub player_name: String,
    pub age: Option<i32>,
    pub nationality: Option<String>,
    pub corrected_nationality: Option<String>,
    /// Transfer market value in euros, the base metric for player cohorts
    pub market_value: Option<f64>,

    pub age_value: Option<f64>,
    pub age_value_percent: Option<f64>,
    pub age_coeff: Option<i32>,
    pub nationality_value: Option<f64>,
    pub nationality_value_percent: Option<f64>,
}

impl Player {
    /// New player with every derived field unset
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id_player: id.into(),
            player_name: name.into(),
            age: None,
            nationality: None,
            corrected_nationality: None,
            market_value: None,
            age_value: None,
            age_value_percent: None,
            age_coeff: None,
            nationality_value: None,
            nationality_value_percent: None,
        }
    }

    /// Nationality used for cohort grouping: the corrected value wins
    pub fn effective_nationality(&self) -> Option<&str> {
        [self.corrected_nationality.as_deref(), self.nationality.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|n| !n.is_empty())
    }
}

/// Team record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Team {
    pub id_team: String,
    pub team_name: String,
    pub competition_id: Option<String>,
    pub team_value: Option<f64>,
    pub team_rating: Option<f64>,

    pub team_cohort_value: Option<f64>,
    pub team_value_percent: Option<f64>,
    pub team_value_norm: Option<f64>,
    pub team_rating_norm: Option<f64>,
    pub team_score: Option<f64>,
    pub team_level: Option<String>,
}

impl Team {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id_team: id.into(),
            team_name: name.into(),
            competition_id: None,
            team_value: None,
            team_rating: None,
            team_cohort_value: None,
            team_value_percent: None,
            team_value_norm: None,
            team_rating_norm: None,
            team_score: None,
            team_level: None,
        }
    }
}

/// Competition record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Competition {
    pub id_competition: String,
    pub competition_name: String,
    pub country: Option<String>,
    pub competition_value: Option<f64>,
    pub competition_rating: Option<f64>,

    pub competition_cohort_value: Option<f64>,
    pub competition_value_percent: Option<f64>,
    pub competition_value_norm: Option<f64>,
    pub competition_rating_norm: Option<f64>,
    pub competition_score: Option<f64>,
    pub competition_level: Option<String>,
}

impl Competition {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id_competition: id.into(),
            competition_name: name.into(),
            country: None,
            competition_value: None,
            competition_rating: None,
            competition_cohort_value: None,
            competition_value_percent: None,
            competition_value_norm: None,
            competition_rating_norm: None,
            competition_score: None,
            competition_level: None,
        }
    }
}

/// Age-derived player fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeValues {
    pub age_value: Option<f64>,
    pub age_value_percent: Option<f64>,
    pub age_coeff: Option<i32>,
}

/// Nationality-derived player fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NationalityValues {
    pub nationality_value: Option<f64>,
    pub nationality_value_percent: Option<f64>,
}

/// Derived fields shared by teams and competitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingValues {
    pub cohort_value: Option<f64>,
    pub value_percent: Option<f64>,
    pub value_norm: Option<f64>,
    pub rating_norm: Option<f64>,
    pub score: Option<f64>,
    pub level: Option<String>,
}

/// Cohort dimension a calculator works on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueDimension {
    Age,
    Nationality,
    Team,
    Competition,
}

impl ValueDimension {
    pub const ALL: [ValueDimension; 4] =
        [Self::Age, Self::Nationality, Self::Team, Self::Competition];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Age => "age",
            Self::Nationality => "nationality",
            Self::Team => "team",
            Self::Competition => "competition",
        }
    }
}

impl fmt::Display for ValueDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueDimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "age" => Ok(Self::Age),
            "nationality" => Ok(Self::Nationality),
            "team" | "teams" => Ok(Self::Team),
            "competition" | "competitions" => Ok(Self::Competition),
            other => Err(format!("unknown value dimension: {other}")),
        }
    }
}

/// How many rows of a table carry a dimension's derived fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageCounts {
    pub total: u64,
    pub with_value: u64,
    pub with_percent: u64,
}

/// Lifecycle state of a scraping job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
}

impl JobStatus {
    /// States that block the creation of another job
    pub const ACTIVE: [JobStatus; 3] = [Self::Pending, Self::Running, Self::Paused];

    pub const ALL: [JobStatus; 5] =
        [Self::Pending, Self::Running, Self::Paused, Self::Completed, Self::Failed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "paused" => Ok(Self::Paused),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// Persisted scraping job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapingJob {
    pub id: Uuid,
    pub status: JobStatus,
    pub total_players: i64,
    pub processed_count: i64,
    pub success_count: i64,
    pub error_count: i64,
    pub current_batch: i64,
    pub batch_size: i64,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_processed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

impl ScrapingJob {
    /// Fresh pending job
    pub fn pending(total_players: i64, batch_size: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Pending,
            total_players,
            processed_count: 0,
            success_count: 0,
            error_count: 0,
            current_batch: 0,
            batch_size,
            created_at: now,
            started_at: None,
            completed_at: None,
            last_processed_at: None,
            updated_at: now,
            last_error: None,
        }
    }
}

/// Field changes applied together with a status transition
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobUpdate {
    /// Set `started_at` if it is still unset
    pub mark_started: bool,
    /// Set `completed_at` to now
    pub mark_completed: bool,
    /// Replace `last_error` when `Some`
    pub last_error: Option<String>,
}

/// Counters reported by the worker for one processed batch
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JobProgressDelta {
    pub processed: i64,
    pub succeeded: i64,
    pub failed: i64,
    /// Overwrites `last_error`; `None` clears it
    pub last_error: Option<String>,
}
