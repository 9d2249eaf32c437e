//! SubscribeUserToPlanHandler - Command handler for new subscriptions.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::application::{Command, CommandHandler, CommandResult, PaymentDetails, UnitOfWork};
use crate::domain::billing::{validate_card, Payment, PaymentMethod, PaymentMethodType};
use crate::domain::foundation::Timestamp;
use crate::domain::subscription::{SubscriptionError, UserSubscription};
use crate::ports::{
    PaymentMethodRepository, PaymentRepository, PlanRepository, SubscriptionRepository,
};

use super::{misrouted, parse_plan_name, parse_user_id};

/// Handler for subscribing a user to a plan.
///
/// Payment is taken at the point of sale, so the payment is recorded as
/// settled without going through the gateway. Card data is validated and
/// masked before anything is written.
#[derive(Debug, Default)]
pub struct SubscribeUserToPlanHandler;

impl SubscribeUserToPlanHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandHandler for SubscribeUserToPlanHandler {
    async fn handle(
        &self,
        command: &Command,
        uow: &UnitOfWork,
    ) -> Result<CommandResult, SubscriptionError> {
        let Command::CreateSubscription {
            user_id,
            plan_name,
            payment_details,
        } = command
        else {
            return Err(misrouted(command, self.name()));
        };

        // 1. Resolve inputs
        let user_id = parse_user_id(user_id)?;
        let plan = uow.plans()?.get(parse_plan_name(plan_name)?).await?;

        // 2. One active subscription per user
        if uow
            .subscriptions()?
            .find_active_by_user_id(&user_id)
            .await?
            .is_some()
        {
            return Err(SubscriptionError::already_subscribed(user_id));
        }

        // 3. Validate payment details before building anything
        let today = Timestamp::today();
        let method = payment_method_from(payment_details, today)?;

        // 4. Build and register entities
        let subscription = UserSubscription::start_full_period(user_id.clone(), &plan, today)?;
        let payment = Payment::settled(
            subscription.id,
            user_id.clone(),
            method.id,
            plan.price,
            today,
        )?;

        uow.subscriptions()?.add(&subscription).await?;
        uow.payment_methods()?.add(&method).await?;
        uow.payments()?.add(&payment).await?;

        tracing::info!(
            user_id = %user_id,
            plan = %plan.name,
            subscription_id = %subscription.id,
            end_date = %subscription.end_date,
            "User subscribed"
        );

        Ok(CommandResult::ok(format!(
            "User {} has subscribed to {} plan successfully.",
            user_id, plan.name
        )))
    }

    fn name(&self) -> &'static str {
        "SubscribeUserToPlanHandler"
    }
}

/// Validates raw details and builds the payment method to store.
fn payment_method_from(
    details: &PaymentDetails,
    today: NaiveDate,
) -> Result<PaymentMethod, SubscriptionError> {
    let method_type = match details.method_type.as_deref() {
        Some(raw) => raw.parse::<PaymentMethodType>()?,
        None => PaymentMethodType::default(),
    };
    match method_type {
        PaymentMethodType::CreditCard => {
            let card = validate_card(
                &details.card_number,
                &details.expiration_date,
                &details.cvc,
                today,
            )?;
            Ok(PaymentMethod::card(&card))
        }
        other => Ok(PaymentMethod::without_details(other)),
    }
}
