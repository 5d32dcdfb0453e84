//! # Scouting Store
//!
//! Data store layer for the scouting platform. Holds the player, team and
//! competition tables with their derived-value columns, and the persisted
//! scraping jobs.
//!
//! ## Architecture
//!
//! - **ScoutingStore**: entity pages, cohort snapshots and derived-value writes
//! - **JobStore**: scraping job rows with compare-and-set status transitions
//! - **PgStore**: PostgreSQL implementation via sqlx
//! - **InMemoryStore**: process-local implementation with fault injection for tests
//!
//! ## Usage
//!
//! ```rust
//! use scouting_store::{InMemoryStore, Player, ScoutingStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = InMemoryStore::new();
//!     let mut player = Player::new("p1", "Pedri");
//!     player.market_value = Some(80_000_000.0);
//!     store.insert_player(player).await;
//!
//!     assert_eq!(store.count_players().await?, 1);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod memory;
pub mod models;
pub mod postgres;

pub use backend::{JobStore, ScoutingStore};
pub use config::{StoreBackendKind, StoreConfig};
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use models::{
    AgeValues, Competition, CoverageCounts, JobProgressDelta, JobStatus, JobUpdate,
    NationalityValues, Player, RatingValues, ScrapingJob, Team, ValueDimension,
};
pub use postgres::PgStore;

/// Re-export common types for convenience
pub use chrono::{DateTime, Utc};
pub use uuid::Uuid;
