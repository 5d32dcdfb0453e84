use std::sync::Arc;

use scouting_store::{RatingValues, ScoutingStore, Team, ValueDimension};

use crate::batch::BatchJob;
use crate::calculator::{composite_score, max_positive, normalize, percent_deviation, LetterTier};
use crate::cohort::CohortTable;
use crate::error::Result;
use crate::models::ItemOutcome;

/// Team value against its competition, plus value and rating norms
/// against the strongest team in the table
pub struct TeamValueCalculator<S> {
    store: Arc<S>,
    cohorts: CohortTable<String>,
    max_rating: Option<f64>,
}

impl<S: ScoutingStore> TeamValueCalculator<S> {
    pub async fn prepare(store: Arc<S>) -> Result<Self> {
        let snapshot = store.team_valuation_snapshot().await?;
        let cohorts = CohortTable::build(
            &snapshot,
            |t: &Team| t.competition_id.clone(),
            |t: &Team| t.team_value,
        );
        let max_rating = max_positive(snapshot.iter().map(|t| t.team_rating));
        tracing::debug!(
            "Built {} competition cohorts from {} teams (max value {:?}, max rating {:?})",
            cohorts.len(),
            snapshot.len(),
            cohorts.max_metric(),
            max_rating
        );
        Ok(Self { store, cohorts, max_rating })
    }

    pub fn values_for(&self, team: &Team) -> Option<RatingValues> {
        let cohort_value = team.competition_id.as_ref().and_then(|c| self.cohorts.mean(c));
        let value_norm = normalize(team.team_value, self.cohorts.max_metric());
        let rating_norm = normalize(team.team_rating, self.max_rating);
        let score = composite_score(&[value_norm, rating_norm]);

        if cohort_value.is_none() && score.is_none() {
            return None;
        }

        Some(RatingValues {
            cohort_value,
            value_percent: cohort_value.and_then(|m| percent_deviation(team.team_value, m)),
            value_norm,
            rating_norm,
            score,
            level: score.map(|s| LetterTier::from_score(s).to_string()),
        })
    }
}

#[async_trait::async_trait]
impl<S: ScoutingStore> BatchJob for TeamValueCalculator<S> {
    type Item = Team;

    fn dimension(&self) -> ValueDimension {
        ValueDimension::Team
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.store.count_teams().await?)
    }

    async fn fetch_page(&self, after: Option<&str>, limit: usize) -> Result<Vec<Team>> {
        Ok(self.store.team_page(after, limit).await?)
    }

    fn cursor(&self, item: &Team) -> String {
        item.id_team.clone()
    }

    async fn process(&self, item: &Team) -> Result<ItemOutcome> {
        let Some(values) = self.values_for(item) else {
            return Ok(ItemOutcome::Skipped);
        };
        self.store.write_team_values(&item.id_team, &values).await?;
        Ok(ItemOutcome::Updated)
    }
}
