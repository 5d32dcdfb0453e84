//! Scraping job transitions
//!
//! ```text
//! pending ──start──▶ running ──complete──▶ completed
//! running ──record_batch (processed ≥ total)──▶ completed
//! running ──fail──▶ failed
//! pending | running ──pause──▶ paused ──resume──▶ running
//! pending | running | paused ──cancel──▶ failed
//! ```

use scouting_store::JobStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operation that moves a scraping job between states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobAction {
    Start,
    Pause,
    Resume,
    Cancel,
    RecordBatch,
    Complete,
    Fail,
}

impl JobAction {
    pub const ALL: [JobAction; 7] = [
        Self::Start,
        Self::Pause,
        Self::Resume,
        Self::Cancel,
        Self::RecordBatch,
        Self::Complete,
        Self::Fail,
    ];

    /// States the action may start from
    pub fn sources(&self) -> &'static [JobStatus] {
        match self {
            Self::Start => &[JobStatus::Pending],
            Self::Pause => &[JobStatus::Pending, JobStatus::Running],
            Self::Resume => &[JobStatus::Paused],
            Self::Cancel => &JobStatus::ACTIVE,
            Self::RecordBatch | Self::Complete | Self::Fail => &[JobStatus::Running],
        }
    }

    /// State the job ends in. A batch that reaches the total completes the
    /// job instead of leaving it running.
    pub fn target(&self) -> JobStatus {
        match self {
            Self::Start | Self::Resume | Self::RecordBatch => JobStatus::Running,
            Self::Pause => JobStatus::Paused,
            Self::Complete => JobStatus::Completed,
            Self::Cancel | Self::Fail => JobStatus::Failed,
        }
    }

    pub fn can_apply(&self, status: JobStatus) -> bool {
        self.sources().contains(&status)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Cancel => "cancel",
            Self::RecordBatch => "record batch",
            Self::Complete => "complete",
            Self::Fail => "fail",
        }
    }

    /// Source states joined for error messages, e.g. `pending or running`
    pub fn expected_description(&self) -> String {
        let names: Vec<&str> = self.sources().iter().map(|s| s.as_str()).collect();
        names.join(" or ")
    }
}

impl fmt::Display for JobAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
