//! # Scrape Jobs
//!
//! Lifecycle of the long-running player scraping job. At most one job is
//! pending, running or paused at a time. Every transition is a single
//! conditional update in the store, so two callers racing on the same job
//! cannot both succeed: the loser gets [`JobError::NoEligibleJob`].
//!
//! The worker that actually scrapes players lives elsewhere; it reports each
//! processed batch through [`ScrapeJobTracker::record_batch`] and polls the
//! status to honour pause and cancel requests.

pub mod error;
pub mod state;
pub mod tracker;

#[cfg(test)]
mod tests;

pub use error::{JobError, Result};
pub use state::JobAction;
pub use tracker::{progress_percent, BatchReport, JobProgress, ScrapeJobTracker, CANCELLED_BY_USER};

pub use scouting_store::{JobStatus, ScrapingJob};

/// Default number of players per scraping batch
pub const DEFAULT_JOB_BATCH_SIZE: i64 = 100;

/// Default number of jobs returned by history queries
pub const DEFAULT_HISTORY_LIMIT: usize = 20;
