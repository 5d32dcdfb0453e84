//! Formulas shared by the calculators

use serde::{Deserialize, Serialize};
use std::fmt;

/// Players at or below this age get the young-player coefficient
pub const YOUNG_AGE_LIMIT: i32 = 22;

/// Market value mapped to a competition value norm of 100
pub const COMPETITION_VALUE_REFERENCE: f64 = 5_000_000_000.0;

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

pub fn round1(value: f64) -> f64 {
    round_to(value, 1)
}

pub fn round2(value: f64) -> f64 {
    round_to(value, 2)
}

/// True for finite, strictly positive metrics
pub fn is_qualifying(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Signed deviation of `value` from the cohort `mean`, in percent, one decimal.
///
/// `None` when the mean is not a usable divisor or the entity has no
/// qualifying value of its own.
pub fn percent_deviation(value: Option<f64>, mean: f64) -> Option<f64> {
    if !is_qualifying(mean) {
        return None;
    }
    let value = value.filter(|v| is_qualifying(*v))?;
    Some(round1((value - mean) / mean * 100.0))
}

/// 1 for young players, 2 otherwise
pub fn age_coeff(age: i32) -> i32 {
    if age <= YOUNG_AGE_LIMIT {
        1
    } else {
        2
    }
}

/// `value / max × 100`, two decimals. A zero value has no norm.
pub fn normalize(value: Option<f64>, max: Option<f64>) -> Option<f64> {
    let max = max.filter(|m| is_qualifying(*m))?;
    let value = value.filter(|v| is_qualifying(*v))?;
    Some(round2(value / max * 100.0))
}

/// `min(value / reference × 100, 100)`, two decimals
pub fn capped_norm(value: Option<f64>, reference: f64) -> Option<f64> {
    let value = value.filter(|v| is_qualifying(*v))?;
    Some(round2((value / reference * 100.0).min(100.0)))
}

/// Mean of the norms that are present, two decimals
pub fn composite_score(norms: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = norms.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    Some(round2(present.iter().sum::<f64>() / present.len() as f64))
}

/// Largest qualifying value
pub fn max_positive(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    values.into_iter().flatten().filter(|v| is_qualifying(*v)).reduce(f64::max)
}

/// Qualitative level of a 0-100 score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LetterTier {
    D,
    C,
    B,
    A,
    #[serde(rename = "A+")]
    APlus,
}

impl LetterTier {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Self::APlus
        } else if score >= 70.0 {
            Self::A
        } else if score >= 50.0 {
            Self::B
        } else if score >= 30.0 {
            Self::C
        } else {
            Self::D
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::APlus => "A+",
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

impl fmt::Display for LetterTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
