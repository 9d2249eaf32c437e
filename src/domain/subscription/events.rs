//! Subscription and billing domain events.
//!
//! Events are named in past tense and are never persisted. They ride on the
//! entity that raised them until the unit of work collects them.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    DomainEvent, EventId, PaymentId, SubscriptionId, Timestamp, UserId,
};

use super::PlanName;

/// Routing key for [`SubscriptionEvent::Activated`].
pub const SUBSCRIPTION_ACTIVATED: &str = "subscription.activated";
/// Routing key for [`SubscriptionEvent::Cancelled`].
pub const SUBSCRIPTION_CANCELLED: &str = "subscription.cancelled";
/// Routing key for [`SubscriptionEvent::Expired`].
pub const SUBSCRIPTION_EXPIRED: &str = "subscription.expired";
/// Routing key for [`SubscriptionEvent::PaymentFailed`].
pub const PAYMENT_FAILED: &str = "subscription.payment_failed";

/// Facts raised by subscriptions and payments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionEvent {
    /// A subscription record became the user's active one.
    ///
    /// State transition: Pending → Active
    Activated {
        event_id: EventId,
        subscription_id: SubscriptionId,
        user_id: UserId,
        plan_name: PlanName,
        start_date: NaiveDate,
        end_date: NaiveDate,
        occurred_at: Timestamp,
    },

    /// A subscription record was cancelled, either directly or by a plan change.
    Cancelled {
        event_id: EventId,
        subscription_id: SubscriptionId,
        user_id: UserId,
        occurred_at: Timestamp,
    },

    /// A subscription record was superseded by its renewal.
    Expired {
        event_id: EventId,
        subscription_id: SubscriptionId,
        user_id: UserId,
        occurred_at: Timestamp,
    },

    /// A charge did not go through.
    PaymentFailed {
        event_id: EventId,
        payment_id: PaymentId,
        user_id: UserId,
        amount: Decimal,
        failure_reason: String,
        occurred_at: Timestamp,
    },
}

impl SubscriptionEvent {
    /// Returns the user ID associated with this event.
    pub fn user_id(&self) -> &UserId {
        match self {
            SubscriptionEvent::Activated { user_id, .. }
            | SubscriptionEvent::Cancelled { user_id, .. }
            | SubscriptionEvent::Expired { user_id, .. }
            | SubscriptionEvent::PaymentFailed { user_id, .. } => user_id,
        }
    }
}

impl DomainEvent for SubscriptionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SubscriptionEvent::Activated { .. } => SUBSCRIPTION_ACTIVATED,
            SubscriptionEvent::Cancelled { .. } => SUBSCRIPTION_CANCELLED,
            SubscriptionEvent::Expired { .. } => SUBSCRIPTION_EXPIRED,
            SubscriptionEvent::PaymentFailed { .. } => PAYMENT_FAILED,
        }
    }

    fn aggregate_id(&self) -> String {
        match self {
            SubscriptionEvent::Activated { subscription_id, .. }
            | SubscriptionEvent::Cancelled { subscription_id, .. }
            | SubscriptionEvent::Expired { subscription_id, .. } => subscription_id.to_string(),
            SubscriptionEvent::PaymentFailed { payment_id, .. } => payment_id.to_string(),
        }
    }

    fn aggregate_type(&self) -> &'static str {
        match self {
            SubscriptionEvent::PaymentFailed { .. } => "Payment",
            _ => "UserSubscription",
        }
    }

    fn occurred_at(&self) -> Timestamp {
        match self {
            SubscriptionEvent::Activated { occurred_at, .. }
            | SubscriptionEvent::Cancelled { occurred_at, .. }
            | SubscriptionEvent::Expired { occurred_at, .. }
            | SubscriptionEvent::PaymentFailed { occurred_at, .. } => *occurred_at,
        }
    }

    fn event_id(&self) -> EventId {
        match self {
            SubscriptionEvent::Activated { event_id, .. }
            | SubscriptionEvent::Cancelled { event_id, .. }
            | SubscriptionEvent::Expired { event_id, .. }
            | SubscriptionEvent::PaymentFailed { event_id, .. } => event_id.clone(),
        }
    }
}
