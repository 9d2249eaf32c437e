//! Subscription status state machine.
//!
//! A record never returns to `Active` once it leaves it. Renewal and plan
//! changes close the current record and open a successor.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of one subscription record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    /// Constructed but not yet activated.
    Pending,

    /// The user's current subscription.
    Active,

    /// Period ran out and was superseded by a renewal.
    Expired,

    /// Cancelled by the user or closed by a plan change.
    Canceled,
}

impl SubscriptionStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, SubscriptionStatus::Active)
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SubscriptionStatus::Pending => "PENDING",
            SubscriptionStatus::Active => "ACTIVE",
            SubscriptionStatus::Expired => "EXPIRED",
            SubscriptionStatus::Canceled => "CANCELED",
        };
        write!(f, "{}", s)
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            (Pending, Active) | (Pending, Canceled) | (Active, Canceled) | (Active, Expired)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Pending => vec![Active, Canceled],
            Active => vec![Canceled, Expired],
            Expired | Canceled => vec![],
        }
    }
}
