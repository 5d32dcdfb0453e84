//! Scouting Service Library
//!
//! Configuration loading, logging setup and composition of the store, the
//! valuation engine and the scraping job tracker. The `scouting-admin`
//! binary drives it from the command line.

use anyhow::{Context, Result};
use std::path::Path;

pub mod config;
pub mod logging;
pub mod service;

pub use config::{JobsConfig, LoggingConfig, ServiceConfig};
pub use logging::{initialize_logging, initialize_logging_with_config};
pub use service::{CalculationTarget, DimensionRun, ScoutingService};

/// Load configuration from an optional file and `SCOUTING__*` environment variables
pub fn load_configuration(path: Option<&Path>) -> Result<ServiceConfig> {
    config::load_config(path).context("Failed to load service configuration")
}
