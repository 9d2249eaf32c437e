//! RenewSubscriptionHandler - Command handler for renewing subscriptions.

use async_trait::async_trait;
use std::sync::Arc;

use crate::application::{Command, CommandHandler, CommandResult, PaymentProcessor, UnitOfWork};
use crate::domain::foundation::Timestamp;
use crate::domain::subscription::{SubscriptionError, UserSubscription};
use crate::ports::{PlanRepository, SubscriptionRepository};

use super::{active_subscription, misrouted, parse_user_id};

/// Handler for renewing an expired subscription.
///
/// Renewal is allowed once `end_date <= today`. A successful charge expires
/// the current record and opens a successor for one full period; the old
/// record is never reactivated. A failed charge leaves both records as they
/// were and is reported as an unsuccessful result.
pub struct RenewSubscriptionHandler {
    payments: Arc<PaymentProcessor>,
}

impl RenewSubscriptionHandler {
    pub fn new(payments: Arc<PaymentProcessor>) -> Self {
        Self { payments }
    }
}

#[async_trait]
impl CommandHandler for RenewSubscriptionHandler {
    async fn handle(
        &self,
        command: &Command,
        uow: &UnitOfWork,
    ) -> Result<CommandResult, SubscriptionError> {
        let Command::RenewSubscription { user_id } = command else {
            return Err(misrouted(command, self.name()));
        };
        let user_id = parse_user_id(user_id)?;

        // 1. Only an expired period can be renewed
        let mut current = active_subscription(uow, &user_id).await?;
        let today = Timestamp::today();
        if !current.has_expired(today) {
            return Err(SubscriptionError::not_expired(current.end_date));
        }

        // 2. Charge for a full period
        let plan = uow.plans()?.get_by_id(current.plan_id).await?;
        let attempt = self
            .payments
            .attempt_payment(uow, &current, plan.price, today)
            .await?;
        if !attempt.success {
            tracing::warn!(user_id = %user_id, subscription_id = %current.id, "Renewal payment failed");
            return Ok(CommandResult::failed(
                "Failed to process payment for subscription renewal.",
            ));
        }

        // 3. Supersede the current record
        current.expire()?;
        uow.subscriptions()?.update(&current).await?;

        let renewed = UserSubscription::start_full_period(user_id.clone(), &plan, today)?;
        uow.subscriptions()?.add(&renewed).await?;

        tracing::info!(
            user_id = %user_id,
            expired_id = %current.id,
            renewed_id = %renewed.id,
            end_date = %renewed.end_date,
            "Subscription renewed"
        );

        Ok(CommandResult::ok("Subscription renewed successfully."))
    }

    fn name(&self) -> &'static str {
        "RenewSubscriptionHandler"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryStorage, SimulatedPaymentGateway};
    use crate::application::handlers::subscription::test_support::{active_subscription, seeded};
    use crate::application::RetryPolicy;
    use crate::domain::billing::PaymentStatus;
    use crate::domain::subscription::{PlanName, SubscriptionStatus};
    use crate::ports::PaymentError;
    use chrono::{Duration, NaiveDate};

    fn renew(user: &str) -> Command {
        Command::RenewSubscription {
            user_id: user.to_string(),
        }
    }

    fn handler(gateway: &SimulatedPaymentGateway) -> RenewSubscriptionHandler {
        RenewSubscriptionHandler::new(Arc::new(PaymentProcessor::new(
            Arc::new(gateway.clone()),
            RetryPolicy::new(3, std::time::Duration::ZERO),
        )))
    }

    async fn subscription_ending(storage: &Arc<InMemoryStorage>, end_date: NaiveDate) {
        active_subscription(
            storage,
            "user-1",
            PlanName::Standard,
            end_date - Duration::days(30),
            end_date,
        )
        .await;
    }

    async fn run(
        handler: &RenewSubscriptionHandler,
        uow: &mut UnitOfWork,
    ) -> Result<CommandResult, SubscriptionError> {
        uow.begin().await.unwrap();
        let result = handler.handle(&renew("user-1"), uow).await;
        match &result {
            Ok(_) => uow.commit().await.unwrap(),
            Err(_) => uow.rollback().await.unwrap(),
        }
        result
    }

    #[tokio::test]
    async fn renewing_before_expiry_is_rejected() {
        let (storage, mut uow) = seeded().await;
        subscription_ending(&storage, Timestamp::today() + Duration::days(1)).await;
        let gateway = SimulatedPaymentGateway::new();

        let err = run(&handler(&gateway), &mut uow).await.unwrap_err();

        assert!(matches!(err, SubscriptionError::SubscriptionNotExpired { .. }));
        assert_eq!(
            err.message(),
            "Subscription has not expired yet and cannot be renewed."
        );
        assert_eq!(gateway.charge_count(), 0);
    }

    #[tokio::test]
    async fn renewal_on_the_end_date_expires_old_and_opens_new() {
        let (storage, mut uow) = seeded().await;
        let today = Timestamp::today();
        subscription_ending(&storage, today).await;
        let gateway = SimulatedPaymentGateway::new();

        let result = run(&handler(&gateway), &mut uow).await.unwrap();
        assert_eq!(result, CommandResult::ok("Subscription renewed successfully."));

        let subscriptions = storage.subscriptions().await;
        assert_eq!(subscriptions.len(), 2);
        assert_eq!(subscriptions[0].status, SubscriptionStatus::Expired);
        assert_eq!(subscriptions[1].status, SubscriptionStatus::Active);
        assert_eq!(subscriptions[1].start_date, today);
        assert_eq!(subscriptions[1].end_date, today + Duration::days(30));
        assert_eq!(subscriptions[1].plan_id, subscriptions[0].plan_id);
        assert_eq!(
            subscriptions.iter().filter(|s| s.is_active()).count(),
            1
        );
    }

    #[tokio::test]
    async fn renewal_charges_the_plan_price() {
        let (storage, mut uow) = seeded().await;
        subscription_ending(&storage, Timestamp::today() - Duration::days(1)).await;
        let gateway = SimulatedPaymentGateway::new();

        run(&handler(&gateway), &mut uow).await.unwrap();

        let charges = gateway.charges();
        assert_eq!(charges.len(), 1);
        assert_eq!(charges[0].amount, rust_decimal_macros::dec!(11900.00));
    }

    #[tokio::test]
    async fn failed_payment_leaves_the_subscription_active() {
        let (storage, mut uow) = seeded().await;
        subscription_ending(&storage, Timestamp::today()).await;
        let gateway =
            SimulatedPaymentGateway::always_failing(PaymentError::card_declined("do not honor"));

        let result = run(&handler(&gateway), &mut uow).await.unwrap();

        assert_eq!(
            result,
            CommandResult::failed("Failed to process payment for subscription renewal.")
        );
        let subscriptions = storage.subscriptions().await;
        assert_eq!(subscriptions.len(), 1);
        assert_eq!(subscriptions[0].status, SubscriptionStatus::Active);

        // The failed charge is kept for audit.
        let payments = storage.payments().await;
        assert_eq!(payments.last().unwrap().status, PaymentStatus::Failed);
    }

    #[tokio::test]
    async fn no_active_subscription_is_not_found() {
        let (_, mut uow) = seeded().await;
        let gateway = SimulatedPaymentGateway::new();

        let err = run(&handler(&gateway), &mut uow).await.unwrap_err();
        assert!(matches!(err, SubscriptionError::NoActiveSubscription(_)));
    }
}
