//! Notification configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Where billing alerts are sent
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Recipient of payment failure alerts
    #[serde(default = "default_alerts_address")]
    pub billing_alerts_address: String,

    /// Sender address on outgoing notifications
    #[serde(default = "default_from_address")]
    pub from_address: String,
}

impl NotificationConfig {
    /// Validate notification configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.billing_alerts_address.contains('@') {
            return Err(ValidationError::InvalidEmailAddress("billing_alerts_address"));
        }
        if !self.from_address.contains('@') {
            return Err(ValidationError::InvalidEmailAddress("from_address"));
        }
        Ok(())
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            billing_alerts_address: default_alerts_address(),
            from_address: default_from_address(),
        }
    }
}

fn default_alerts_address() -> String {
    "billing-alerts@localhost".to_string()
}

fn default_from_address() -> String {
    "billing@localhost".to_string()
}
