//! Error types for the scraping job tracker

use scouting_store::StoreError;
use thiserror::Error;
use uuid::Uuid;

use crate::state::JobAction;

/// Result type alias for job operations
pub type Result<T> = std::result::Result<T, JobError>;

/// Errors that can occur while driving a scraping job
#[derive(Error, Debug)]
pub enum JobError {
    /// No job is in a state the action can start from. Also returned when a
    /// concurrent caller moved the job first.
    #[error("No scraping job to {action}: expected status {expected}")]
    NoEligibleJob { action: JobAction, expected: String },

    #[error("A scraping job is already active: {0}")]
    ActiveJobExists(String),

    #[error("Scraping job {0} not found")]
    NotFound(Uuid),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl JobError {
    pub fn no_eligible_job(action: JobAction) -> Self {
        Self::NoEligibleJob { action, expected: action.expected_description() }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// True for failures caused by the job's current state rather than the system
    pub fn is_state_conflict(&self) -> bool {
        matches!(self, Self::NoEligibleJob { .. } | Self::ActiveJobExists(_))
    }
}
