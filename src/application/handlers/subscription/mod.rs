//! Subscription lifecycle command handlers.
//!
//! ## Commands
//! - Subscribing a user to a plan
//! - Cancelling the active subscription
//! - Renewing an expired subscription
//! - Changing plan mid-period with proration
//!
//! Every handler runs inside the transaction the bus opened for it and
//! reaches storage only through the unit of work.

mod cancel_subscription;
mod change_subscription_plan;
mod renew_subscription;
mod subscribe_user_to_plan;

pub use cancel_subscription::CancelSubscriptionHandler;
pub use change_subscription_plan::ChangeSubscriptionPlanHandler;
pub use renew_subscription::RenewSubscriptionHandler;
pub use subscribe_user_to_plan::SubscribeUserToPlanHandler;

use crate::application::{Command, UnitOfWork};
use crate::domain::foundation::UserId;
use crate::domain::subscription::{PlanName, SubscriptionError, UserSubscription};
use crate::ports::SubscriptionRepository;

fn parse_user_id(raw: &str) -> Result<UserId, SubscriptionError> {
    Ok(UserId::new(raw)?)
}

/// Unknown names are reported as a missing plan, not a validation error.
fn parse_plan_name(raw: &str) -> Result<PlanName, SubscriptionError> {
    raw.parse()
        .map_err(|_| SubscriptionError::plan_not_found(raw.trim()))
}

async fn active_subscription(
    uow: &UnitOfWork,
    user_id: &UserId,
) -> Result<UserSubscription, SubscriptionError> {
    uow.subscriptions()?
        .find_active_by_user_id(user_id)
        .await?
        .ok_or_else(|| SubscriptionError::no_active_subscription(user_id.clone()))
}

fn misrouted(command: &Command, handler: &str) -> SubscriptionError {
    SubscriptionError::unroutable(format!("{} sent to {}", command.kind(), handler))
}
