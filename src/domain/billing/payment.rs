//! Payment entity and its status machine.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{
    DomainError, Entity, ErrorCode, EventId, PaymentId, PaymentMethodId, StateMachine,
    SubscriptionId, Timestamp, UserId, ValidationError,
};
use crate::domain::subscription::SubscriptionEvent;

/// Status of a single charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Success,
    Failed,
    Canceled,
    Refunded,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Processing => "PROCESSING",
            PaymentStatus::Success => "SUCCESS",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Canceled => "CANCELED",
            PaymentStatus::Refunded => "REFUNDED",
        };
        write!(f, "{}", s)
    }
}

impl StateMachine for PaymentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, target),
            (Pending, Processing)
                | (Pending, Failed)
                | (Pending, Canceled)
                | (Processing, Success)
                | (Processing, Failed)
                | (Success, Refunded)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PaymentStatus::*;
        match self {
            Pending => vec![Processing, Failed, Canceled],
            Processing => vec![Success, Failed],
            Success => vec![Refunded],
            Failed | Canceled | Refunded => vec![],
        }
    }
}

/// One charge against a payment method for a subscription.
///
/// # Invariants
///
/// - `amount >= 0`
/// - A payment that reaches FAILED raises exactly one `PaymentFailed` event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub subscription_id: SubscriptionId,
    pub user_id: UserId,
    pub payment_method_id: PaymentMethodId,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub status: PaymentStatus,
    pub failure_reason: Option<String>,

    #[serde(skip)]
    events: Vec<SubscriptionEvent>,
}

impl Payment {
    /// Creates a PENDING payment.
    pub fn pending(
        subscription_id: SubscriptionId,
        user_id: UserId,
        payment_method_id: PaymentMethodId,
        amount: Decimal,
        date: NaiveDate,
    ) -> Result<Self, ValidationError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(ValidationError::invalid_format(
                "amount",
                format!("payment amount cannot be negative, got {}", amount),
            ));
        }
        Ok(Self {
            id: PaymentId::new(),
            subscription_id,
            user_id,
            payment_method_id,
            amount,
            date,
            status: PaymentStatus::Pending,
            failure_reason: None,
            events: Vec::new(),
        })
    }

    /// Creates a payment that was settled at the point of sale.
    pub fn settled(
        subscription_id: SubscriptionId,
        user_id: UserId,
        payment_method_id: PaymentMethodId,
        amount: Decimal,
        date: NaiveDate,
    ) -> Result<Self, DomainError> {
        let mut payment =
            Self::pending(subscription_id, user_id, payment_method_id, amount, date)?;
        payment.begin_processing()?;
        payment.mark_succeeded()?;
        Ok(payment)
    }

    pub fn begin_processing(&mut self) -> Result<(), DomainError> {
        self.transition_to(PaymentStatus::Processing)
    }

    pub fn mark_succeeded(&mut self) -> Result<(), DomainError> {
        self.transition_to(PaymentStatus::Success)
    }

    /// Marks the payment FAILED and raises `PaymentFailed`.
    pub fn mark_failed(&mut self, reason: impl Into<String>) -> Result<(), DomainError> {
        self.transition_to(PaymentStatus::Failed)?;
        let reason = reason.into();
        self.failure_reason = Some(reason.clone());
        self.events.push(SubscriptionEvent::PaymentFailed {
            event_id: EventId::new(),
            payment_id: self.id,
            user_id: self.user_id.clone(),
            amount: self.amount,
            failure_reason: reason,
            occurred_at: Timestamp::now(),
        });
        Ok(())
    }

    pub fn refund(&mut self) -> Result<(), DomainError> {
        self.transition_to(PaymentStatus::Refunded)
    }

    pub fn is_successful(&self) -> bool {
        self.status == PaymentStatus::Success
    }

    fn transition_to(&mut self, target: PaymentStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("move payment from {} to {}", self.status, target),
            )
            .with_detail("current", self.status.to_string())
        })?;
        Ok(())
    }
}

impl PartialEq for Payment {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Payment {}

impl Entity for Payment {
    type Id = PaymentId;
    type Event = SubscriptionEvent;

    fn id(&self) -> PaymentId {
        self.id
    }

    fn pending_events(&self) -> &[SubscriptionEvent] {
        &self.events
    }

    fn take_events(&mut self) -> Vec<SubscriptionEvent> {
        std::mem::take(&mut self.events)
    }
}
