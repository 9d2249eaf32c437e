//! Payment gateway port.
//!
//! Charges a stored payment method. The gateway either approves the charge
//! or returns a [`PaymentError`] whose code says whether trying again could
//! help. Only transient codes are retryable; a decline is final.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::billing::PaymentMethod;
use crate::domain::foundation::{DomainError, ErrorCode, PaymentId, UserId};

/// Port for charging payment methods.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charge `request.amount` to `request.payment_method`.
    ///
    /// `request.payment_id` is stable across retries of the same charge and
    /// can be used as an idempotency key.
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeReceipt, PaymentError>;
}

/// A single charge.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub payment_id: PaymentId,
    pub user_id: UserId,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
}

/// Proof of an approved charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeReceipt {
    /// Gateway's reference for the charge.
    pub reference: String,
}

/// Payment gateway error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentError {
    /// Error code for categorization.
    pub code: PaymentErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Gateway's own error code (if available).
    pub provider_code: Option<String>,

    /// Whether the charge can be retried.
    pub retryable: bool,
}

impl PaymentError {
    /// Create a new payment error. Retryability follows the code.
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::Timeout, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::RateLimitExceeded, message)
    }

    pub fn card_declined(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::CardDeclined, message)
    }

    pub fn insufficient_funds(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InsufficientFunds, message)
    }

    /// True when the gateway explicitly refused the charge.
    pub fn is_decline(&self) -> bool {
        matches!(
            self.code,
            PaymentErrorCode::CardDeclined
                | PaymentErrorCode::InsufficientFunds
                | PaymentErrorCode::CardExpired
        )
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        DomainError::new(ErrorCode::InternalError, err.to_string())
            .with_detail("payment_error", err.code.to_string())
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// Gateway did not answer in time.
    Timeout,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Card was declined.
    CardDeclined,

    /// Insufficient funds.
    InsufficientFunds,

    /// Card expired.
    CardExpired,

    /// Gateway rejected our credentials.
    AuthenticationError,

    /// Gateway-side failure.
    ProviderError,
}

impl PaymentErrorCode {
    /// Transient failures are retryable; everything else is final.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError
                | PaymentErrorCode::Timeout
                | PaymentErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::Timeout => "timeout",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::CardDeclined => "card_declined",
            PaymentErrorCode::InsufficientFunds => "insufficient_funds",
            PaymentErrorCode::CardExpired => "card_expired",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}
