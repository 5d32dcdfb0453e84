//! Service composition: one store shared by the calculators and the job tracker

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::info;

use crate::config::ServiceConfig;
use scouting_store::{JobStore, ScoutingStore, ValueDimension};
use scrape_jobs::ScrapeJobTracker;
use valuation_engine::{BatchSummary, ProgressEvent, ValuationEngine};

/// Which calculators a run covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CalculationTarget {
    Age,
    Nationality,
    Teams,
    Competitions,
    All,
}

impl CalculationTarget {
    pub fn dimensions(&self) -> Vec<ValueDimension> {
        match self {
            Self::Age => vec![ValueDimension::Age],
            Self::Nationality => vec![ValueDimension::Nationality],
            Self::Teams => vec![ValueDimension::Team],
            Self::Competitions => vec![ValueDimension::Competition],
            Self::All => ValueDimension::ALL.to_vec(),
        }
    }
}

/// Result of one calculator run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionRun {
    pub dimension: ValueDimension,
    #[serde(flatten)]
    pub summary: BatchSummary,
    pub duration_ms: u64,
}

/// Service state containing all initialized components
pub struct ScoutingService<S> {
    config: ServiceConfig,
    store: Arc<S>,
    engine: ValuationEngine<S>,
    jobs: ScrapeJobTracker<S>,
}

impl<S: ScoutingStore + JobStore + 'static> ScoutingService<S> {
    pub fn new(config: ServiceConfig, store: Arc<S>) -> Result<Self> {
        let engine = ValuationEngine::new(store.clone(), config.valuation.clone())
            .context("Failed to create valuation engine")?;
        let jobs = ScrapeJobTracker::new(store.clone());
        info!("Scouting service initialized ({:?} backend)", config.database.backend);
        Ok(Self { config, store, engine, jobs })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn engine(&self) -> &ValuationEngine<S> {
        &self.engine
    }

    pub fn jobs(&self) -> &ScrapeJobTracker<S> {
        &self.jobs
    }

    /// Run the calculators of `target` one after another, logging page progress.
    ///
    /// A fatal error in one calculator stops the remaining ones.
    pub async fn run_calculation(
        &self,
        target: CalculationTarget,
        batch_size: Option<usize>,
    ) -> Result<Vec<DimensionRun>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let reporter = tokio::spawn(report_progress(rx));

        let mut runs = Vec::new();
        for dimension in target.dimensions() {
            let started = Instant::now();
            let summary = self
                .engine
                .update_dimension(dimension, batch_size, Some(tx.clone()))
                .await
                .with_context(|| format!("{dimension} calculation failed"))?;
            runs.push(DimensionRun {
                dimension,
                summary,
                duration_ms: started.elapsed().as_millis() as u64,
            });
        }

        drop(tx);
        // The reporter ends once every sender is gone
        let _ = reporter.await;
        Ok(runs)
    }
}

async fn report_progress(mut rx: mpsc::UnboundedReceiver<ProgressEvent>) {
    while let Some(event) = rx.recv().await {
        info!("📊 {} progress: {}/{}", event.dimension, event.processed, event.total);
    }
}
