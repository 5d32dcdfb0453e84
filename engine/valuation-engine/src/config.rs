use serde::{Deserialize, Serialize};

use crate::DEFAULT_BATCH_SIZE;

/// Configuration for the derived-value calculators
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationConfig {
    /// Rows fetched and processed per page
    pub batch_size: usize,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self { batch_size: DEFAULT_BATCH_SIZE }
    }
}

impl ValuationConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("batch_size must be greater than 0".to_string());
        }

        Ok(())
    }
}
