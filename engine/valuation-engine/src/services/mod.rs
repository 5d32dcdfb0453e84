//! Per-dimension calculators
//!
//! Each calculator loads one snapshot of the rows that carry its base metric,
//! builds the cohort table up front and then derives values row by row.

pub mod age;
pub mod competition;
pub mod nationality;
pub mod team;

pub use age::AgeValueCalculator;
pub use competition::CompetitionValueCalculator;
pub use nationality::NationalityValueCalculator;
pub use team::TeamValueCalculator;
