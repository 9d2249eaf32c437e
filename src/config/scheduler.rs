//! Renewal scheduler configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// When the renewal scheduler runs
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Run the renewal scheduler at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Seconds between runs
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Run once immediately instead of waiting a full interval
    #[serde(default)]
    pub run_on_startup: bool,
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Validate scheduler configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.interval_secs == 0 {
            return Err(ValidationError::InvalidSchedulerInterval);
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_secs: default_interval_secs(),
            run_on_startup: false,
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    86_400
}
