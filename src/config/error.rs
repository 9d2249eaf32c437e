//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("payment_max_attempts must be between 1 and {max}, got {actual}")]
    InvalidMaxAttempts { max: u32, actual: u32 },

    #[error("Invalid currency code '{0}', expected three uppercase letters")]
    InvalidCurrency(String),

    #[error("Scheduler interval must be greater than zero")]
    InvalidSchedulerInterval,

    #[error("Invalid email address for {0}")]
    InvalidEmailAddress(&'static str),

    #[error("Invalid log level '{0}'")]
    InvalidLogLevel(String),

    #[error("Plan catalog not found at {0}")]
    CatalogNotFound(String),
}
