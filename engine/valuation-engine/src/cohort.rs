//! Cohort aggregation
//!
//! A cohort is the set of entities sharing a key. Its expected value is the
//! mean of the base metric over members whose metric is present and strictly
//! positive. The entity being valued is part of its own cohort.

use std::collections::HashMap;
use std::hash::Hash;

use crate::calculator::is_qualifying;

/// Aggregate of one cohort
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CohortStats {
    pub mean: f64,
    pub count: u64,
    sum: f64,
}

impl CohortStats {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
        self.mean = self.sum / self.count as f64;
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }
}

/// Cohort statistics keyed by cohort key
#[derive(Debug, Clone)]
pub struct CohortTable<K> {
    cohorts: HashMap<K, CohortStats>,
    max_metric: Option<f64>,
}

impl<K: Eq + Hash> CohortTable<K> {
    /// Aggregate `entities` by `key`, using `metric` as the base value.
    ///
    /// Entities without a key or without a qualifying metric are left out.
    pub fn build<'a, T: 'a>(
        entities: impl IntoIterator<Item = &'a T>,
        key: impl Fn(&T) -> Option<K>,
        metric: impl Fn(&T) -> Option<f64>,
    ) -> Self {
        let mut cohorts: HashMap<K, CohortStats> = HashMap::new();
        let mut max_metric: Option<f64> = None;

        for entity in entities {
            let Some(value) = metric(entity).filter(|v| is_qualifying(*v)) else {
                continue;
            };
            max_metric = Some(max_metric.map_or(value, |m| m.max(value)));

            if let Some(k) = key(entity) {
                cohorts
                    .entry(k)
                    .or_insert(CohortStats { mean: 0.0, count: 0, sum: 0.0 })
                    .add(value);
            }
        }

        Self { cohorts, max_metric }
    }

    pub fn get(&self, key: &K) -> Option<&CohortStats> {
        self.cohorts.get(key)
    }

    /// Expected value of the cohort, `None` when it has no qualifying member
    pub fn mean(&self, key: &K) -> Option<f64> {
        self.cohorts.get(key).map(|s| s.mean)
    }

    /// Largest qualifying metric across all entities, keyed or not
    pub fn max_metric(&self) -> Option<f64> {
        self.max_metric
    }

    pub fn len(&self) -> usize {
        self.cohorts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cohorts.is_empty()
    }

    pub fn into_map(self) -> HashMap<K, CohortStats> {
        self.cohorts
    }
}
