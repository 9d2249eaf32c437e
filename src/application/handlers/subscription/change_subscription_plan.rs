//! ChangeSubscriptionPlanHandler - Command handler for mid-period plan changes.

use async_trait::async_trait;
use std::sync::Arc;

use crate::application::{Command, CommandHandler, CommandResult, PaymentProcessor, UnitOfWork};
use crate::domain::billing::prorate;
use crate::domain::foundation::Timestamp;
use crate::domain::subscription::{SubscriptionError, UserSubscription};
use crate::ports::{PlanRepository, SubscriptionRepository};

use super::{active_subscription, misrouted, parse_plan_name, parse_user_id};

/// Handler for switching a user to another plan for the rest of the period.
///
/// The difference in daily rates over the remaining days is charged when
/// positive. A negative difference is a credit: nothing is charged and the
/// credit is reported in the result. The current record is closed today and
/// a new record on the new plan runs until the original end date.
///
/// Amounts in result messages carry the billing currency code.
pub struct ChangeSubscriptionPlanHandler {
    payments: Arc<PaymentProcessor>,
    currency: String,
}

impl ChangeSubscriptionPlanHandler {
    pub fn new(payments: Arc<PaymentProcessor>, currency: impl Into<String>) -> Self {
        Self {
            payments,
            currency: currency.into(),
        }
    }
}

#[async_trait]
impl CommandHandler for ChangeSubscriptionPlanHandler {
    async fn handle(
        &self,
        command: &Command,
        uow: &UnitOfWork,
    ) -> Result<CommandResult, SubscriptionError> {
        let Command::ChangeSubscriptionPlan {
            user_id,
            new_plan_name,
        } = command
        else {
            return Err(misrouted(command, self.name()));
        };
        let user_id = parse_user_id(user_id)?;
        let new_plan_name = parse_plan_name(new_plan_name)?;

        // 1. Load the subscription and both plans
        let mut current = active_subscription(uow, &user_id).await?;
        let new_plan = uow.plans()?.get(new_plan_name).await?;
        let current_plan = uow.plans()?.get_by_id(current.plan_id).await?;
        if current_plan.name == new_plan.name {
            return Err(SubscriptionError::validation(
                "new_plan_name",
                format!("already subscribed to the {} plan", new_plan.name),
            ));
        }

        // 2. Prorate over the days left
        let today = Timestamp::today();
        let remaining_days = current.remaining_days(today);
        if remaining_days < 0 {
            return Err(SubscriptionError::lapsed(current.end_date));
        }
        let proration = prorate(&current_plan, &new_plan, remaining_days);

        // 3. Charge only when the user owes money
        if proration.is_charge() {
            let attempt = self
                .payments
                .attempt_payment(uow, &current, proration.amount, today)
                .await?;
            if !attempt.success {
                tracing::warn!(
                    user_id = %user_id,
                    amount = %proration.amount,
                    "Plan change payment failed"
                );
                return Ok(CommandResult::failed(
                    "Failed to process payment for plan change.",
                ));
            }
        }

        // 4. Close the current record and open one on the new plan
        current.close_for_plan_change(today)?;
        uow.subscriptions()?.update(&current).await?;

        let replacement = UserSubscription::start(user_id.clone(), &new_plan, today, remaining_days)?;
        uow.subscriptions()?.add(&replacement).await?;

        tracing::info!(
            user_id = %user_id,
            from = %current_plan.name,
            to = %new_plan.name,
            remaining_days,
            prorated_amount = %proration.amount,
            "Subscription plan changed"
        );

        let message = if proration.is_charge() {
            format!(
                "Subscription plan changed successfully. {} {} was charged.",
                proration.amount, self.currency
            )
        } else if proration.amount.is_sign_negative() && !proration.amount.is_zero() {
            format!(
                "Subscription plan changed successfully. A credit of {} {} applies.",
                proration.amount.abs(),
                self.currency
            )
        } else {
            "Subscription plan changed successfully.".to_string()
        };
        Ok(CommandResult::ok(message))
    }

    fn name(&self) -> &'static str {
        "ChangeSubscriptionPlanHandler"
    }
}
