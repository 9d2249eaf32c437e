//! Billing configuration

use serde::Deserialize;
use std::time::Duration;

use crate::application::RetryPolicy;

use super::error::ValidationError;

/// Upper bound on gateway attempts per payment.
pub const MAX_PAYMENT_ATTEMPTS: u32 = 10;

/// Payment retry and currency settings
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Gateway attempts per payment, first try included
    #[serde(default = "default_max_attempts")]
    pub payment_max_attempts: u32,

    /// Pause between attempts, in milliseconds
    #[serde(default = "default_backoff_ms")]
    pub payment_retry_backoff_ms: u64,

    /// ISO 4217 code all plan prices are quoted in
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl BillingConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.payment_retry_backoff_ms)
    }

    /// Retry policy for the payment processor.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.payment_max_attempts, self.retry_backoff())
    }

    /// Validate billing configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=MAX_PAYMENT_ATTEMPTS).contains(&self.payment_max_attempts) {
            return Err(ValidationError::InvalidMaxAttempts {
                max: MAX_PAYMENT_ATTEMPTS,
                actual: self.payment_max_attempts,
            });
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ValidationError::InvalidCurrency(self.currency.clone()));
        }
        Ok(())
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            payment_max_attempts: default_max_attempts(),
            payment_retry_backoff_ms: default_backoff_ms(),
            currency: default_currency(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    2000
}

fn default_currency() -> String {
    "KRW".to_string()
}
