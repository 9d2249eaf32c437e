//! UserSubscription entity.
//!
//! One record per billing period. A user has at most one ACTIVE record at a
//! time; renewals and plan changes close the current record and open a new one.
//!
//! # Design Decisions
//!
//! - **Plan by reference**: the record stores `plan_id`, handlers load the plan
//! - **Calendar dates**: periods are whole days (`NaiveDate`), not instants
//! - **Events on the entity**: transitions append to a pending list that the
//!   unit of work drains

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    DomainError, Entity, ErrorCode, EventId, PlanId, StateMachine, SubscriptionId, Timestamp,
    UserId,
};

use super::{SubscriptionEvent, SubscriptionPlan, SubscriptionStatus};

/// A user's subscription to one plan for one period.
///
/// # Invariants
///
/// - `start_date <= end_date`
/// - Status transitions follow [`SubscriptionStatus`] rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSubscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub plan_id: PlanId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: SubscriptionStatus,

    #[serde(skip)]
    events: Vec<SubscriptionEvent>,
}

impl UserSubscription {
    /// Opens a new ACTIVE record on `plan` running `days` days from `today`.
    pub fn start(
        user_id: UserId,
        plan: &SubscriptionPlan,
        today: NaiveDate,
        days: i64,
    ) -> Result<Self, DomainError> {
        if days < 0 {
            return Err(DomainError::validation(
                "end_date",
                format!("subscription cannot run for {} days", days),
            ));
        }
        let mut subscription = Self {
            id: SubscriptionId::new(),
            user_id,
            plan_id: plan.id,
            start_date: today,
            end_date: today + Duration::days(days),
            status: SubscriptionStatus::Pending,
            events: Vec::new(),
        };
        subscription.activate(plan)?;
        Ok(subscription)
    }

    /// Opens a new ACTIVE record for one full period of `plan`.
    pub fn start_full_period(
        user_id: UserId,
        plan: &SubscriptionPlan,
        today: NaiveDate,
    ) -> Result<Self, DomainError> {
        Self::start(user_id, plan, today, plan.duration_days as i64)
    }

    /// Rebuilds a record from stored fields without raising events.
    pub fn restore(
        id: SubscriptionId,
        user_id: UserId,
        plan_id: PlanId,
        start_date: NaiveDate,
        end_date: NaiveDate,
        status: SubscriptionStatus,
    ) -> Self {
        Self {
            id,
            user_id,
            plan_id,
            start_date,
            end_date,
            status,
            events: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// True once the period has run out, i.e. `end_date <= today`.
    pub fn has_expired(&self, today: NaiveDate) -> bool {
        self.end_date <= today
    }

    /// Whole days left in the period. Negative once the period has passed.
    pub fn remaining_days(&self, today: NaiveDate) -> i64 {
        (self.end_date - today).num_days()
    }

    fn activate(&mut self, plan: &SubscriptionPlan) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Active)?;
        self.events.push(SubscriptionEvent::Activated {
            event_id: EventId::new(),
            subscription_id: self.id,
            user_id: self.user_id.clone(),
            plan_name: plan.name,
            start_date: self.start_date,
            end_date: self.end_date,
            occurred_at: Timestamp::now(),
        });
        Ok(())
    }

    /// Cancels the record. No refund is issued.
    ///
    /// # Errors
    ///
    /// Returns error if the record is not ACTIVE or PENDING.
    pub fn cancel(&mut self) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Canceled)?;
        self.raise_cancelled();
        Ok(())
    }

    /// Closes the record because the user moved to another plan.
    ///
    /// The period is cut short to `today`.
    pub fn close_for_plan_change(&mut self, today: NaiveDate) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Canceled)?;
        self.end_date = today;
        self.raise_cancelled();
        Ok(())
    }

    /// Marks the record as superseded by a renewal.
    pub fn expire(&mut self) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Expired)?;
        self.events.push(SubscriptionEvent::Expired {
            event_id: EventId::new(),
            subscription_id: self.id,
            user_id: self.user_id.clone(),
            occurred_at: Timestamp::now(),
        });
        Ok(())
    }

    fn raise_cancelled(&mut self) {
        self.events.push(SubscriptionEvent::Cancelled {
            event_id: EventId::new(),
            subscription_id: self.id,
            user_id: self.user_id.clone(),
            occurred_at: Timestamp::now(),
        });
    }

    fn transition_to(&mut self, target: SubscriptionStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("move subscription from {} to {}", self.status, target),
            )
            .with_detail("current", self.status.to_string())
        })?;
        Ok(())
    }
}

impl PartialEq for UserSubscription {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for UserSubscription {}

impl Entity for UserSubscription {
    type Id = SubscriptionId;
    type Event = SubscriptionEvent;

    fn id(&self) -> SubscriptionId {
        self.id
    }

    fn pending_events(&self) -> &[SubscriptionEvent] {
        &self.events
    }

    fn take_events(&mut self) -> Vec<SubscriptionEvent> {
        std::mem::take(&mut self.events)
    }
}
