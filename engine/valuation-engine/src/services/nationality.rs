use std::sync::Arc;

use scouting_store::{NationalityValues, Player, ScoutingStore, ValueDimension};

use crate::batch::BatchJob;
use crate::calculator::percent_deviation;
use crate::cohort::CohortTable;
use crate::error::Result;
use crate::models::ItemOutcome;

/// Market value relative to players of the same nationality
pub struct NationalityValueCalculator<S> {
    store: Arc<S>,
    cohorts: CohortTable<String>,
}

impl<S: ScoutingStore> NationalityValueCalculator<S> {
    pub async fn prepare(store: Arc<S>) -> Result<Self> {
        let snapshot = store.player_valuation_snapshot().await?;
        let cohorts = CohortTable::build(
            &snapshot,
            |p: &Player| p.effective_nationality().map(str::to_string),
            |p: &Player| p.market_value,
        );
        tracing::debug!("Built {} nationality cohorts from {} players", cohorts.len(), snapshot.len());
        Ok(Self { store, cohorts })
    }

    pub fn cohorts(&self) -> &CohortTable<String> {
        &self.cohorts
    }

    pub fn values_for(&self, player: &Player) -> Option<NationalityValues> {
        let nationality = player.effective_nationality()?;
        let mean = self.cohorts.mean(&nationality.to_string())?;
        Some(NationalityValues {
            nationality_value: Some(mean),
            nationality_value_percent: percent_deviation(player.market_value, mean),
        })
    }

    pub async fn apply(&self, player: &Player) -> Result<Option<NationalityValues>> {
        let Some(values) = self.values_for(player) else {
            return Ok(None);
        };
        self.store.write_player_nationality_values(&player.id_player, &values).await?;
        Ok(Some(values))
    }
}

#[async_trait::async_trait]
impl<S: ScoutingStore> BatchJob for NationalityValueCalculator<S> {
    type Item = Player;

    fn dimension(&self) -> ValueDimension {
        ValueDimension::Nationality
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
