//! In-memory notifier for tests.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{Notification, Notifier};

/// Records every notification instead of delivering it.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    inner: Arc<Mutex<NotifierState>>,
}

#[derive(Debug, Default)]
struct NotifierState {
    sent: Vec<Notification>,
    failing: bool,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `send` fail.
    pub fn set_failing(&self, failing: bool) {
        self.state().failing = failing;
    }

    /// Notifications delivered so far.
    pub fn sent(&self) -> Vec<Notification> {
        self.state().sent.clone()
    }

    pub fn sent_count(&self) -> usize {
        self.state().sent.len()
    }

    fn state(&self) -> MutexGuard<'_, NotifierState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn send(&self, notification: Notification) -> Result<(), DomainError> {
        let mut state = self.state();
        if state.failing {
            return Err(DomainError::new(
                ErrorCode::NotificationError,
                format!("delivery to {} failed", notification.to),
            ));
        }
        state.sent.push(notification);
        Ok(())
    }
}
