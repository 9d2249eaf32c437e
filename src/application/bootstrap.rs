//! Wires handlers onto a message bus.

use std::sync::Arc;

use crate::domain::subscription::{
    PAYMENT_FAILED, SUBSCRIPTION_ACTIVATED, SUBSCRIPTION_CANCELLED, SUBSCRIPTION_EXPIRED,
};
use crate::ports::Notifier;

use super::commands::CommandKind;
use super::handlers::{
    CancelSubscriptionHandler, ChangeSubscriptionPlanHandler, LifecycleAuditHandler,
    PaymentFailedNotificationHandler, RenewSubscriptionHandler, SubscribeUserToPlanHandler,
};
use super::message_bus::MessageBus;
use super::payment_processor::PaymentProcessor;

/// Builds the bus with every command handler and event subscriber registered.
///
/// Payment failure alerts run before the audit log for the same event.
/// `currency` is the code shown next to amounts in command results.
pub fn build_message_bus(
    payments: Arc<PaymentProcessor>,
    notifier: Arc<dyn Notifier>,
    alerts_address: impl Into<String>,
    currency: impl Into<String>,
) -> MessageBus {
    let mut bus = MessageBus::new();

    bus.register(
        CommandKind::CreateSubscription,
        Arc::new(SubscribeUserToPlanHandler::new()),
    );
    bus.register(
        CommandKind::CancelSubscription,
        Arc::new(CancelSubscriptionHandler::new()),
    );
    bus.register(
        CommandKind::RenewSubscription,
        Arc::new(RenewSubscriptionHandler::new(payments.clone())),
    );
    bus.register(
        CommandKind::ChangeSubscriptionPlan,
        Arc::new(ChangeSubscriptionPlanHandler::new(payments, currency)),
    );

    bus.subscribe(
        PAYMENT_FAILED,
        Arc::new(PaymentFailedNotificationHandler::new(notifier, alerts_address)),
    );
    bus.subscribe_all(
        &[
            SUBSCRIPTION_ACTIVATED,
            SUBSCRIPTION_CANCELLED,
            SUBSCRIPTION_EXPIRED,
            PAYMENT_FAILED,
        ],
        Arc::new(LifecycleAuditHandler::new()),
    );

    bus
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryNotifier, SimulatedPaymentGateway};
    use crate::application::RetryPolicy;

    #[test]
    fn every_command_kind_has_a_handler() {
        let processor = Arc::new(PaymentProcessor::new(
            Arc::new(SimulatedPaymentGateway::new()),
            RetryPolicy::no_retry(),
        ));
        let bus = build_message_bus(
            processor,
            Arc::new(InMemoryNotifier::new()),
            "ops@example.com",
            "KRW",
        );

        for kind in [
            CommandKind::CreateSubscription,
            CommandKind::CancelSubscription,
            CommandKind::RenewSubscription,
            CommandKind::ChangeSubscriptionPlan,
        ] {
            assert!(bus.has_handler(kind), "{} has no handler", kind);
        }
    }
}
