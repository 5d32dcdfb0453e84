//! Service configuration management
//!
//! Sources, later ones winning:
//! 1. built-in defaults
//! 2. a TOML file (`--config <path>`, or `scouting.toml` in the working directory if present)
//! 3. `SCOUTING__<SECTION>__<KEY>` environment variables, e.g. `SCOUTING__DATABASE__URL`

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use scouting_store::StoreConfig;
use valuation_engine::ValuationConfig;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "SCOUTING";

/// Default config file name, looked up without extension
pub const DEFAULT_CONFIG_NAME: &str = "scouting";

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Store backend and connection settings
    pub database: StoreConfig,

    /// Derived-value calculators
    pub valuation: ValuationConfig,

    /// Scraping job defaults
    pub jobs: JobsConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Scraping job defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// Players per batch for new jobs
    pub batch_size: i64,

    /// Jobs returned by history queries
    pub history_limit: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty)
    pub format: String,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            batch_size: scrape_jobs::DEFAULT_JOB_BATCH_SIZE,
            history_limit: scrape_jobs::DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string() }
    }
}

/// Load configuration from an optional file and the environment
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig> {
    let file = match path {
        Some(path) => {
            tracing::debug!("Loading configuration from file: {:?}", path);
            ::config::File::from(path).required(true)
        }
        None => ::config::File::with_name(DEFAULT_CONFIG_NAME).required(false),
    };

    let config: ServiceConfig = ::config::Config::builder()
        .add_source(file)
        .add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to read configuration sources")?
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    validate_config(&config)?;
    Ok(config)
}

/// Validate configuration
pub fn validate_config(config: &ServiceConfig) -> Result<()> {
    config.database.validate().map_err(|e| anyhow!("Invalid database configuration: {e}"))?;
    config.valuation.validate().map_err(|e| anyhow!("Invalid valuation configuration: {e}"))?;

    if config.jobs.batch_size <= 0 {
        return Err(anyhow!("Invalid job batch size: {}", config.jobs.batch_size));
    }

    match config.logging.level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.logging.level)),
    }

    match config.logging.format.as_str() {
        "json" | "pretty" => {}
        _ => return Err(anyhow!("Invalid log format: {}", config.logging.format)),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scouting_store::StoreBackendKind;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = ServiceConfig::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.valuation.batch_size, 500);
        assert_eq!(config.database.backend, StoreBackendKind::Postgres);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = ServiceConfig::default();
        config.logging.level = "loud".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = ServiceConfig::default();
        config.logging.format = "xml".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = ServiceConfig::default();
        config.valuation.batch_size = 0;
        assert!(validate_config(&config).is_err());

        let mut config = ServiceConfig::default();
        config.jobs.batch_size = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[database]
backend = "memory"

[valuation]
batch_size = 250

[logging]
format = "json"
"#
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.database.backend, StoreBackendKind::Memory);
        assert_eq!(config.valuation.batch_size, 250);
        assert_eq!(config.logging.format, "json");
        // Untouched sections keep their defaults
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.jobs.history_limit, 20);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let path = Path::new("/nonexistent/scouting-config.toml");
        assert!(load_config(Some(path)).is_err());
    }

    #[test]
    fn test_invalid_file_values_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[valuation]\nbatch_size = 0").unwrap();
        assert!(load_config(Some(file.path())).is_err());
    }
}
