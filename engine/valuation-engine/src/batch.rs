//! Keyset-paginated batch runner
//!
//! Walks a whole table in pages ordered by primary id, hands every row to a
//! [`BatchJob`] and tallies the outcome. A failing row is logged and counted;
//! a failing count or page fetch ends the run with an error. Rows written
//! before the failure stay written.

use scouting_store::ValueDimension;
use tracing::{debug, error, info, warn};

use crate::error::{Result, ValuationError};
use crate::models::{BatchSummary, ItemOutcome, ProgressEvent, ProgressSender};

/// One full-table calculation driven by [`BatchRunner`]
#[async_trait::async_trait]
pub trait BatchJob: Send + Sync {
    type Item: Send + Sync;

    fn dimension(&self) -> ValueDimension;

    /// Rows in the table before the run starts
    async fn count(&self) -> Result<u64>;

    /// Up to `limit` rows with an id greater than `after`, ascending
    async fn fetch_page(&self, after: Option<&str>, limit: usize) -> Result<Vec<Self::Item>>;

    /// Keyset cursor of a row
    fn cursor(&self, item: &Self::Item) -> String;

    /// Compute and write one row's derived values
    async fn process(&self, item: &Self::Item) -> Result<ItemOutcome>;
}

/// Drives a [`BatchJob`] page by page
#[derive(Debug, Clone)]
pub struct BatchRunner {
    page_size: usize,
    progress: Option<ProgressSender>,
}

impl BatchRunner {
    pub fn new(page_size: usize) -> Result<Self> {
        if page_size == 0 {
            return Err(ValuationError::config("batch size must be greater than 0"));
        }
        Ok(Self { page_size, progress: None })
    }

    /// Emit a [`ProgressEvent`] on `progress` after every page
    pub fn with_progress(mut self, progress: Option<ProgressSender>) -> Self {
        self.progress = progress;
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub async fn run<J: BatchJob>(&self, job: &J) -> Result<BatchSummary> {
        let dimension = job.dimension();
        let total = job.count().await.map_err(|e| {
            error!("❌ {} calculation aborted: count failed: {}", dimension, e);
            e
        })?;

        info!("🔄 Starting {} calculation over {} rows (page size {})", dimension, total, self.page_size);

        let mut summary = BatchSummary::default();
        if total == 0 {
            return Ok(summary);
        }

        let mut cursor: Option<String> = None;
        let mut page_no = 0u64;
        loop {
            let page = job.fetch_page(cursor.as_deref(), self.page_size).await.map_err(|e| {
                error!(
                    "❌ {} calculation aborted after {} rows: page fetch failed: {}",
                    dimension, summary.total, e
                );
                e
            })?;
            page_no += 1;

            for item in &page {
                summary.total += 1;
                match job.process(item).await {
                    Ok(ItemOutcome::Updated) => summary.updated += 1,
                    Ok(ItemOutcome::Skipped) => summary.skipped += 1,
                    Err(e) => {
                        summary.errors += 1;
                        let id = job.cursor(item);
                        warn!(dimension = %dimension, id = %id, "Failed to update row: {}", e);
                    }
                }
            }

            let Some(last) = page.last() else {
                break;
            };
            cursor = Some(job.cursor(last));

            debug!(
                "{} page {} done: {} rows, {}/{} processed",
                dimension,
                page_no,
                page.len(),
                summary.total,
                total
            );
            self.emit(ProgressEvent { dimension, processed: summary.total, total });

            if page.len() < self.page_size {
                break;
            }
        }

        info!(
            "✅ {} calculation finished: {} visited, {} updated, {} skipped, {} errors",
            dimension, summary.total, summary.updated, summary.skipped, summary.errors
        );
        Ok(summary)
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(progress) = &self.progress {
            // A dropped receiver only means nobody is watching
            let _ = progress.send(event);
        }
    }
}
