//! Notifier port for outbound messages to people.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::DomainError;

/// A message to deliver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Port for sending notifications (email, chat, pager).
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification.
    ///
    /// # Errors
    ///
    /// - `NotificationError` if delivery fails
    async fn send(&self, notification: Notification) -> Result<(), DomainError>;
}
