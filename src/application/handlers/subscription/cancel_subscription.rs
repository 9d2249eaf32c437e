//! CancelSubscriptionHandler - Command handler for cancelling subscriptions.

use async_trait::async_trait;

use crate::application::{Command, CommandHandler, CommandResult, UnitOfWork};
use crate::domain::subscription::SubscriptionError;
use crate::ports::SubscriptionRepository;

use super::{active_subscription, misrouted, parse_user_id};

/// Handler for cancelling a user's active subscription.
///
/// Cancellation is immediate. No refund is issued.
#[derive(Debug, Default)]
pub struct CancelSubscriptionHandler;

impl CancelSubscriptionHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandHandler for CancelSubscriptionHandler {
    async fn handle(
        &self,
        command: &Command,
        uow: &UnitOfWork,
    ) -> Result<CommandResult, SubscriptionError> {
        let Command::CancelSubscription { user_id } = command else {
            return Err(misrouted(command, self.name()));
        };
        let user_id = parse_user_id(user_id)?;

        let mut subscription = active_subscription(uow, &user_id).await?;
        subscription.cancel()?;
        uow.subscriptions()?.update(&subscription).await?;

        tracing::info!(
            user_id = %user_id,
            subscription_id = %subscription.id,
            "Subscription cancelled"
        );

        Ok(CommandResult::ok(format!(
            "User {} has cancelled subscription successfully.",
            user_id
        )))
    }

    fn name(&self) -> &'static str {
        "CancelSubscriptionHandler"
    }
}
