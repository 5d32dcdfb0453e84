use scouting_store::ValueDimension;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Outcome of one full calculation pass over a table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Entities visited
    pub total: u64,
    /// Entities whose derived fields were written
    pub updated: u64,
    /// Entities with nothing to write (no cohort, no score)
    pub skipped: u64,
    /// Entities whose computation or write failed
    pub errors: u64,
}

/// Progress emitted after each processed page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub dimension: ValueDimension,
    pub processed: u64,
    /// Row count read before the run started
    pub total: u64,
}

/// Observer channel for [`ProgressEvent`]s
pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;

/// What a calculator did with one entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Updated,
    Skipped,
}

/// How much of a table carries a dimension's derived values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub dimension: ValueDimension,
    pub total: u64,
    pub with_value: u64,
    pub with_percent: u64,
    /// Share of rows with a percentage, 0-100 with one decimal
    pub coverage_percent: f64,
}
