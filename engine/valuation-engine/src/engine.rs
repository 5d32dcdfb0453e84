use std::sync::Arc;

use scouting_store::{AgeValues, NationalityValues, ScoutingStore, ValueDimension};
use tracing::info;

use crate::batch::BatchRunner;
use crate::calculator::round1;
use crate::config::ValuationConfig;
use crate::error::{Result, ValuationError};
use crate::models::{BatchSummary, CoverageReport, ProgressSender};
use crate::services::{
    AgeValueCalculator, CompetitionValueCalculator, NationalityValueCalculator,
    TeamValueCalculator,
};

/// Entry point for derived-value calculations
pub struct ValuationEngine<S> {
    store: Arc<S>,
    config: ValuationConfig,
}

impl<S: ScoutingStore> ValuationEngine<S> {
    pub fn new(store: Arc<S>, config: ValuationConfig) -> Result<Self> {
        config.validate().map_err(ValuationError::config)?;
        Ok(Self { store, config })
    }

    pub fn config(&self) -> &ValuationConfig {
        &self.config
    }

    fn runner(
        &self,
        batch_size: Option<usize>,
        progress: Option<ProgressSender>,
    ) -> Result<BatchRunner> {
        Ok(BatchRunner::new(batch_size.unwrap_or(self.config.batch_size))?.with_progress(progress))
    }

    /// Recompute `age_value`, `age_value_percent` and `age_coeff` for every player
    pub async fn update_all_players_age_values(
        &self,
        batch_size: Option<usize>,
        progress: Option<ProgressSender>,
    ) -> Result<BatchSummary> {
        let runner = self.runner(batch_size, progress)?;
        let calculator = AgeValueCalculator::prepare(self.store.clone()).await?;
        runner.run(&calculator).await
    }

    /// Recompute `nationality_value` and `nationality_value_percent` for every player
    pub async fn update_all_players_nationality_values(
        &self,
        batch_size: Option<usize>,
        progress: Option<ProgressSender>,
    ) -> Result<BatchSummary> {
        let runner = self.runner(batch_size, progress)?;
        let calculator = NationalityValueCalculator::prepare(self.store.clone()).await?;
        runner.run(&calculator).await
    }

    /// Recompute cohort value, norms, score and level for every team
    pub async fn update_all_teams(
        &self,
        batch_size: Option<usize>,
        progress: Option<ProgressSender>,
    ) -> Result<BatchSummary> {
        let runner = self.runner(batch_size, progress)?;
        let calculator = TeamValueCalculator::prepare(self.store.clone()).await?;
        runner.run(&calculator).await
    }

    /// Recompute cohort value, norms, score and level for every competition
    pub async fn update_all_competitions(
        &self,
        batch_size: Option<usize>,
        progress: Option<ProgressSender>,
    ) -> Result<BatchSummary> {
        let runner = self.runner(batch_size, progress)?;
        let calculator = CompetitionValueCalculator::prepare(self.store.clone()).await?;
        runner.run(&calculator).await
    }

    /// Run the calculator for `dimension`
    pub async fn update_dimension(
        &self,
        dimension: ValueDimension,
        batch_size: Option<usize>,
        progress: Option<ProgressSender>,
    ) -> Result<BatchSummary> {
        match dimension {
            ValueDimension::Age => self.update_all_players_age_values(batch_size, progress).await,
            ValueDimension::Nationality => {
                self.update_all_players_nationality_values(batch_size, progress).await
            }
            ValueDimension::Team => self.update_all_teams(batch_size, progress).await,
            ValueDimension::Competition => {
                self.update_all_competitions(batch_size, progress).await
            }
        }
    }

    /// Recompute the age values of a single player.
    ///
    /// Returns `None` when the player's age cohort has no valued member.
    pub async fn update_player_age_values(&self, id: &str) -> Result<Option<AgeValues>> {
        let player = self
            .store
            .get_player(id)
            .await?
            .ok_or_else(|| ValuationError::not_found("player", id))?;

        let calculator = AgeValueCalculator::prepare(self.store.clone()).await?;
        let values = calculator.apply(&player).await?;
        info!("Recomputed age values for player {}: {:?}", id, values);
        Ok(values)
    }

    /// Recompute the nationality values of a single player
    pub async fn update_player_nationality_values(
        &self,
        id: &str,
    ) -> Result<Option<NationalityValues>> {
        let player = self
            .store
            .get_player(id)
            .await?
            .ok_or_else(|| ValuationError::not_found("player", id))?;

        let calculator = NationalityValueCalculator::prepare(self.store.clone()).await?;
        let values = calculator.apply(&player).await?;
        info!("Recomputed nationality values for player {}: {:?}", id, values);
        Ok(values)
    }

    /// How many rows currently carry the derived values of `dimension`
    pub async fn coverage(&self, dimension: ValueDimension) -> Result<CoverageReport> {
        let counts = self.store.coverage(dimension).await?;
        let coverage_percent = if counts.total == 0 {
            0.0
        } else {
            round1(counts.with_percent as f64 / counts.total as f64 * 100.0)
        };

        Ok(CoverageReport {
            dimension,
            total: counts.total,
            with_value: counts.with_value,
            with_percent: counts.with_percent,
            coverage_percent,
        })
    }
}
