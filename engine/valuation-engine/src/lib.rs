//! Valuation Engine
//!
//! Recomputes cohort-relative derived values over whole tables: a player's
//! market value against players of the same age or nationality, a team's
//! value against its competition, a competition's value against its country.
//! Tables are walked in keyset-paginated batches; one failing row never stops
//! a run.

pub mod batch;
pub mod calculator;
pub mod cohort;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod services;


pub use batch::{BatchJob, BatchRunner};
pub use calculator::{percent_deviation, LetterTier};
pub use cohort::{CohortStats, CohortTable};
pub use config::ValuationConfig;
pub use engine::ValuationEngine;
pub use error::{Result, ValuationError};
pub use models::{BatchSummary, CoverageReport, ItemOutcome, ProgressEvent, ProgressSender};

/// Default page size for batch runs
pub const DEFAULT_BATCH_SIZE: usize = 500;
