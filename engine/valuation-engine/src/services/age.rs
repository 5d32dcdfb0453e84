use std::sync::Arc;

use scouting_store::{AgeValues, Player, ScoutingStore, ValueDimension};

use crate::batch::BatchJob;
use crate::calculator::{age_coeff, percent_deviation};
use crate::cohort::CohortTable;
use crate::error::Result;
use crate::models::ItemOutcome;

/// Market value relative to players of the same age
pub struct AgeValueCalculator<S> {
    store: Arc<S>,
    cohorts: CohortTable<i32>,
}

impl<S: ScoutingStore> AgeValueCalculator<S> {
    /// Read the valuation snapshot and group it by age
    pub async fn prepare(store: Arc<S>) -> Result<Self> {
        let snapshot = store.player_valuation_snapshot().await?;
        let cohorts = CohortTable::build(&snapshot, |p: &Player| p.age, |p: &Player| p.market_value);
        tracing::debug!("Built {} age cohorts from {} players", cohorts.len(), snapshot.len());
        Ok(Self { store, cohorts })
    }

    pub fn cohorts(&self) -> &CohortTable<i32> {
        &self.cohorts
    }

    /// Derived values for `player`, `None` when its age cohort is empty
    pub fn values_for(&self, player: &Player) -> Option<AgeValues> {
        let age = player.age?;
        let mean = self.cohorts.mean(&age)?;
        Some(AgeValues {
            age_value: Some(mean),
            age_value_percent: percent_deviation(player.market_value, mean),
            age_coeff: Some(age_coeff(age)),
        })
    }

    /// Compute and persist the values of one player
    pub async fn apply(&self, player: &Player) -> Result<Option<AgeValues>> {
        let Some(values) = self.values_for(player) else {
            return Ok(None);
        };
        self.store.write_player_age_values(&player.id_player, &values).await?;
        Ok(Some(values))
    }
}

#[async_trait::async_trait]
impl<S: ScoutingStore> BatchJob for AgeValueCalculator<S> {
    type Item = Player;

    fn dimension(&self) -> ValueDimension {
        ValueDimension::Age
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.store.count_players().await?)
    }

    async fn fetch_page(&self, after: Option<&str>, limit: usize) -> Result<Vec<Player>> {
        Ok(self.store.player_page(after, limit).await?)
    }

    fn cursor(&self, item: &Player) -> String {
        item.id_player.clone()
    }

    async fn process(&self, item: &Player) -> Result<ItemOutcome> {
        Ok(match self.apply(item).await? {
            Some(_) => ItemOutcome::Updated,
            None => ItemOutcome::Skipped,
        })
    }
}
