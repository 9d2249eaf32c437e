//! PaymentFailedNotificationHandler - alerts billing staff about failed charges.

use async_trait::async_trait;
use std::sync::Arc;

use crate::application::{EventHandler, UnitOfWork};
use crate::domain::subscription::{SubscriptionError, SubscriptionEvent};
use crate::ports::{Notification, Notifier};

/// Sends one notification per `PaymentFailed` event.
///
/// Other event types are ignored.
pub struct PaymentFailedNotificationHandler {
    notifier: Arc<dyn Notifier>,
    alerts_address: String,
}

impl PaymentFailedNotificationHandler {
    pub fn new(notifier: Arc<dyn Notifier>, alerts_address: impl Into<String>) -> Self {
        Self {
            notifier,
            alerts_address: alerts_address.into(),
        }
    }
}

#[async_trait]
impl EventHandler for PaymentFailedNotificationHandler {
    async fn handle(
        &self,
        event: &SubscriptionEvent,
        _uow: &UnitOfWork,
    ) -> Result<(), SubscriptionError> {
        let SubscriptionEvent::PaymentFailed {
            payment_id,
            user_id,
            amount,
            failure_reason,
            ..
        } = event
        else {
            return Ok(());
        };

        self.notifier
            .send(Notification {
                to: self.alerts_address.clone(),
                subject: format!("Payment {} failed ({})", payment_id, amount),
                body: format!("failed {} failure_reason: {}", user_id, failure_reason),
            })
            .await?;

        tracing::info!(
            user_id = %user_id,
            payment_id = %payment_id,
            to = %self.alerts_address,
            "Payment failure notification sent"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "PaymentFailedNotificationHandler"
    }
}
