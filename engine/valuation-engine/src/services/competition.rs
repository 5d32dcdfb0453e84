use std::sync::Arc;

use scouting_store::{Competition, RatingValues, ScoutingStore, ValueDimension};

use crate::batch::BatchJob;
use crate::calculator::{
    capped_norm, composite_score, max_positive, normalize, percent_deviation, LetterTier,
    COMPETITION_VALUE_REFERENCE,
};
use crate::cohort::CohortTable;
use crate::error::Result;
use crate::models::ItemOutcome;

/// Competition value against its country. The value norm uses a fixed
/// reference instead of the table maximum.
pub struct CompetitionValueCalculator<S> {
    store: Arc<S>,
    cohorts: CohortTable<String>,
    max_rating: Option<f64>,
}

impl<S: ScoutingStore> CompetitionValueCalculator<S> {
    pub async fn prepare(store: Arc<S>) -> Result<Self> {
        let snapshot = store.competition_valuation_snapshot().await?;
        let cohorts = CohortTable::build(
            &snapshot,
            |c: &Competition| c.country.clone(),
            |c: &Competition| c.competition_value,
        );
        let max_rating = max_positive(snapshot.iter().map(|c| c.competition_rating));
        tracing::debug!(
            "Built {} country cohorts from {} competitions",
            cohorts.len(),
            snapshot.len()
        );
        Ok(Self { store, cohorts, max_rating })
    }

    pub fn values_for(&self, competition: &Competition) -> Option<RatingValues> {
        let cohort_value = competition.country.as_ref().and_then(|c| self.cohorts.mean(c));
        let value_norm = capped_norm(competition.competition_value, COMPETITION_VALUE_REFERENCE);
        let rating_norm = normalize(competition.competition_rating, self.max_rating);
        let score = composite_score(&[value_norm, rating_norm]);

        if cohort_value.is_none() && score.is_none() {
            return None;
        }

        Some(RatingValues {
            cohort_value,
            value_percent: cohort_value
                .and_then(|m| percent_deviation(competition.competition_value, m)),
            value_norm,
            rating_norm,
            score,
            level: score.map(|s| LetterTier::from_score(s).to_string()),
        })
    }
}

#[async_trait::async_trait]
impl<S: ScoutingStore> BatchJob for CompetitionValueCalculator<S> {
    type Item = Competition;

    fn dimension(&self) -> ValueDimension {
        ValueDimension::Competition
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.store.count_competitions().await?)
    }

    async fn fetch_page(&self, after: Option<&str>, limit: usize) -> Result<Vec<Competition>> {
        Ok(self.store.competition_page(after, limit).await?)
    }

    fn cursor(&self, item: &Competition) -> String {
        item.id_competition.clone()
    }

    async fn process(&self, item: &Competition) -> Result<ItemOutcome> {
        let Some(values) = self.values_for(item) else {
            return Ok(ItemOutcome::Skipped);
        };
        self.store.write_competition_values(&item.id_competition, &values).await?;
        Ok(ItemOutcome::Updated)
    }
}
