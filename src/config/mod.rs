//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `SUBSCRIPTION_BILLING` prefix and nested values use double underscores as separators.
//! Every setting has a default, so an empty environment yields a working setup.
//!
//! # Example
//!
//! ```no_run
//! use subscription_billing::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Renewals run every {}s", config.scheduler.interval_secs);
//! ```

mod billing;
mod error;
mod logging;
mod notifications;
mod plans;
mod scheduler;

pub use billing::{BillingConfig, MAX_PAYMENT_ATTEMPTS};
pub use error::{ConfigError, ValidationError};
pub use logging::LoggingConfig;
pub use notifications::NotificationConfig;
pub use plans::PlansConfig;
pub use scheduler::SchedulerConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Payment retries and currency
    #[serde(default)]
    pub billing: BillingConfig,

    /// Renewal scheduler timing
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Alert recipients
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Plan catalog source
    #[serde(default)]
    pub plans: PlansConfig,

    /// Log filter and format
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `SUBSCRIPTION_BILLING` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `SUBSCRIPTION_BILLING__BILLING__PAYMENT_MAX_ATTEMPTS=5` -> `billing.payment_max_attempts = 5`
    /// - `SUBSCRIPTION_BILLING__PLANS__CATALOG_PATH=...` -> `plans.catalog_path = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("SUBSCRIPTION_BILLING")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for the first invalid section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.billing.validate()?;
        self.scheduler.validate()?;
        self.notifications.validate()?;
        self.plans.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
