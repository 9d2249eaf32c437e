//! PaymentProcessor - charges a subscription with bounded retry.
//!
//! Each invocation records exactly one `Payment`:
//!
//! 1. The payment method of the user's latest successful payment is charged
//! 2. Transient gateway errors are retried up to `max_attempts` with a fixed
//!    backoff
//! 3. A decline, a non-retryable error or exhausted retries mark the payment
//!    FAILED, which raises `PaymentFailed`
//!
//! The payment is added to the unit of work either way. A failed charge is a
//! normal outcome (`success == false`), not an error.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::billing::{Payment, PaymentMethod};
use crate::domain::foundation::UserId;
use crate::domain::subscription::{SubscriptionError, UserSubscription};
use crate::ports::{
    ChargeRequest, PaymentError, PaymentGateway, PaymentMethodRepository, PaymentRepository,
};

use super::unit_of_work::UnitOfWork;

/// Bounded retry with fixed backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included. Never less than 1.
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Single attempt, no waiting (useful for tests).
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

/// Outcome of one charge.
#[derive(Debug, Clone)]
pub struct PaymentAttempt {
    pub success: bool,
    pub payment: Payment,
}

/// Charges subscriptions through a [`PaymentGateway`].
pub struct PaymentProcessor {
    gateway: Arc<dyn PaymentGateway>,
    policy: RetryPolicy,
}

impl PaymentProcessor {
    pub fn new(gateway: Arc<dyn PaymentGateway>, policy: RetryPolicy) -> Self {
        Self { gateway, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Charges `amount` for `subscription` and records the payment.
    ///
    /// # Errors
    ///
    /// - `PaymentMethodNotFound` if the user has never paid successfully
    /// - `ValidationFailed` if `amount` is negative
    /// - `Infrastructure` if storage fails
    pub async fn attempt_payment(
        &self,
        uow: &UnitOfWork,
        subscription: &UserSubscription,
        amount: Decimal,
        today: NaiveDate,
    ) -> Result<PaymentAttempt, SubscriptionError> {
        let method = self.payment_method_for(uow, &subscription.user_id).await?;
        let mut payment = Payment::pending(
            subscription.id,
            subscription.user_id.clone(),
            method.id,
            amount,
            today,
        )?;
        payment.begin_processing()?;

        let request = ChargeRequest {
            payment_id: payment.id,
            user_id: subscription.user_id.clone(),
            amount,
            payment_method: method,
        };

        match self.charge_with_retry(&request).await {
            Ok(reference) => {
                payment.mark_succeeded()?;
                tracing::info!(
                    user_id = %request.user_id,
                    payment_id = %payment.id,
                    amount = %amount,
                    reference = %reference,
                    "Payment succeeded"
                );
            }
            Err(err) => {
                tracing::warn!(
                    user_id = %request.user_id,
                    payment_id = %payment.id,
                    amount = %amount,
                    error = %err,
                    "Payment failed"
                );
                payment.mark_failed(err.to_string())?;
            }
        }

        uow.payments()?.add(&payment).await?;
        Ok(PaymentAttempt {
            success: payment.is_successful(),
            payment,
        })
    }

    async fn charge_with_retry(&self, request: &ChargeRequest) -> Result<String, PaymentError> {
        let mut attempt = 1;
        loop {
            match self.gateway.charge(request).await {
                Ok(receipt) => return Ok(receipt.reference),
                Err(err) if err.retryable && attempt < self.policy.max_attempts => {
                    tracing::warn!(
                        payment_id = %request.payment_id,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        error = %err,
                        "Transient payment error, retrying"
                    );
                    tokio::time::sleep(self.policy.backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Payment method of the user's most recent successful payment.
    async fn payment_method_for(
        &self,
        uow: &UnitOfWork,
        user_id: &UserId,
    ) -> Result<PaymentMethod, SubscriptionError> {
        let payments = uow.payments()?.list_by_user_id(user_id).await?;
        let method_id = payments
            .iter()
            .rev()
            .find(|p| p.is_successful())
            .map(|p| p.payment_method_id)
            .ok_or_else(|| {
                SubscriptionError::payment_method_not_found(format!("user {}", user_id))
            })?;
        Ok(uow.payment_methods()?.get(method_id).await?)
    }
}
