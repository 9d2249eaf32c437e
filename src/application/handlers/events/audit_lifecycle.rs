//! LifecycleAuditHandler - writes subscription lifecycle events to the log.

use async_trait::async_trait;

use crate::application::{EventHandler, UnitOfWork};
use crate::domain::foundation::DomainEvent;
use crate::domain::subscription::{SubscriptionError, SubscriptionEvent};

/// Emits one structured `info` record per event.
#[derive(Debug, Default)]
pub struct LifecycleAuditHandler;

impl LifecycleAuditHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventHandler for LifecycleAuditHandler {
    async fn handle(
        &self,
        event: &SubscriptionEvent,
        _uow: &UnitOfWork,
    ) -> Result<(), SubscriptionError> {
        match event {
            SubscriptionEvent::Activated {
                plan_name,
                start_date,
                end_date,
                ..
            } => tracing::info!(
                event_type = event.event_type(),
                subscription_id = %event.aggregate_id(),
                user_id = %event.user_id(),
                plan = %plan_name,
                start_date = %start_date,
                end_date = %end_date,
                "audit"
            ),
            _ => tracing::info!(
                event_type = event.event_type(),
                aggregate_type = event.aggregate_type(),
                aggregate_id = %event.aggregate_id(),
                user_id = %event.user_id(),
                occurred_at = %event.occurred_at().as_datetime(),
                "audit"
            ),
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "LifecycleAuditHandler"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryStorage;
    use crate::domain::foundation::{EventId, SubscriptionId, Timestamp, UserId};
    use crate::domain::subscription::PlanName;
    use std::sync::Arc;

    #[tokio::test]
    async fn accepts_every_lifecycle_event_without_a_transaction() {
        let handler = LifecycleAuditHandler::new();
        // Never opened: the handler must not touch storage.
        let uow = UnitOfWork::new(Arc::new(InMemoryStorage::new()));
        let user_id = UserId::new("user-1").unwrap();
        let today = Timestamp::today();

        let events = vec![
            SubscriptionEvent::Activated {
                event_id: EventId::new(),
                subscription_id: SubscriptionId::new(),
                user_id: user_id.clone(),
                plan_name: PlanName::Standard,
                start_date: today,
                end_date: today,
                occurred_at: Timestamp::now(),
            },
            SubscriptionEvent::Expired {
                event_id: EventId::new(),
                subscription_id: SubscriptionId::new(),
                user_id,
                occurred_at: Timestamp::now(),
            },
        ];

        for event in &events {
            handler.handle(event, &uow).await.unwrap();
        }
        assert!(!uow.is_open());
    }
}
