//! Notifier that writes notifications to the log.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::ports::{Notification, Notifier};

/// Emits each notification as a structured `info` event.
#[derive(Debug, Clone)]
pub struct LoggingNotifier {
    from_address: String,
}

impl LoggingNotifier {
    pub fn new(from_address: impl Into<String>) -> Self {
        Self {
            from_address: from_address.into(),
        }
    }
}

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn send(&self, notification: Notification) -> Result<(), DomainError> {
        tracing::info!(
            from = %self.from_address,
            to = %notification.to,
            subject = %notification.subject,
            body = %notification.body,
            "Notification sent"
        );
        Ok(())
    }
}
