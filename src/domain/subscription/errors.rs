//! Subscription-specific error types.
//!
//! Errors surfaced by command handlers and the message bus. A declined
//! payment is not an error: handlers report it as an unsuccessful result.
//!
//! # Kinds
//!
//! | Error | Kind |
//! |-------|------|
//! | PlanNotFound, NoActiveSubscription, SubscriptionNotFound, PaymentMethodNotFound | NotFound |
//! | ValidationFailed | Validation |
//! | SubscriptionNotExpired, SubscriptionLapsed, AlreadySubscribed, InvalidState | BusinessRule |
//! | UnroutableMessage, TransactionState | Defect |
//! | Infrastructure | Infrastructure |

use chrono::NaiveDate;

use crate::domain::foundation::{DomainError, ErrorCode, UserId, ValidationError};

/// Broad category of a [`SubscriptionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    BusinessRule,
    Defect,
    Infrastructure,
}

/// Subscription-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// No plan exists with the requested name.
    PlanNotFound(String),

    /// The user has no ACTIVE subscription.
    NoActiveSubscription(UserId),

    /// A subscription row was requested by id and does not exist.
    SubscriptionNotFound(String),

    /// No stored payment method could be found to charge.
    PaymentMethodNotFound(String),

    /// Input failed validation before anything was persisted.
    ValidationFailed { field: String, message: String },

    /// Renewal was requested while the current period is still running.
    SubscriptionNotExpired { end_date: NaiveDate },

    /// Plan change was requested after the current period already ended.
    SubscriptionLapsed { end_date: NaiveDate },

    /// The user already holds an ACTIVE subscription.
    AlreadySubscribed(UserId),

    /// The entity is not in a state that allows the operation.
    InvalidState { current: String, attempted: String },

    /// No handler is registered for a command.
    UnroutableMessage(String),

    /// The unit of work was used outside its open/closed protocol.
    TransactionState(String),

    /// Storage or other collaborator failure.
    Infrastructure(String),
}

impl SubscriptionError {
    pub fn plan_not_found(name: impl Into<String>) -> Self {
        SubscriptionError::PlanNotFound(name.into())
    }

    pub fn no_active_subscription(user_id: UserId) -> Self {
        SubscriptionError::NoActiveSubscription(user_id)
    }

    pub fn subscription_not_found(id: impl Into<String>) -> Self {
        SubscriptionError::SubscriptionNotFound(id.into())
    }

    pub fn payment_method_not_found(detail: impl Into<String>) -> Self {
        SubscriptionError::PaymentMethodNotFound(detail.into())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        SubscriptionError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_expired(end_date: NaiveDate) -> Self {
        SubscriptionError::SubscriptionNotExpired { end_date }
    }

    pub fn lapsed(end_date: NaiveDate) -> Self {
        SubscriptionError::SubscriptionLapsed { end_date }
    }

    pub fn already_subscribed(user_id: UserId) -> Self {
        SubscriptionError::AlreadySubscribed(user_id)
    }

    pub fn invalid_state(current: impl Into<String>, attempted: impl Into<String>) -> Self {
        SubscriptionError::InvalidState {
            current: current.into(),
            attempted: attempted.into(),
        }
    }

    pub fn unroutable(message_kind: impl Into<String>) -> Self {
        SubscriptionError::UnroutableMessage(message_kind.into())
    }

    pub fn transaction_state(message: impl Into<String>) -> Self {
        SubscriptionError::TransactionState(message.into())
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        SubscriptionError::Infrastructure(message.into())
    }

    /// Returns the broad category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SubscriptionError::PlanNotFound(_)
            | SubscriptionError::NoActiveSubscription(_)
            | SubscriptionError::SubscriptionNotFound(_)
            | SubscriptionError::PaymentMethodNotFound(_) => ErrorKind::NotFound,
            SubscriptionError::ValidationFailed { .. } => ErrorKind::Validation,
            SubscriptionError::SubscriptionNotExpired { .. }
            | SubscriptionError::SubscriptionLapsed { .. }
            | SubscriptionError::AlreadySubscribed(_)
            | SubscriptionError::InvalidState { .. } => ErrorKind::BusinessRule,
            SubscriptionError::UnroutableMessage(_) | SubscriptionError::TransactionState(_) => {
                ErrorKind::Defect
            }
            SubscriptionError::Infrastructure(_) => ErrorKind::Infrastructure,
        }
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            SubscriptionError::PlanNotFound(_) => ErrorCode::PlanNotFound,
            SubscriptionError::NoActiveSubscription(_)
            | SubscriptionError::SubscriptionNotFound(_) => ErrorCode::SubscriptionNotFound,
            SubscriptionError::PaymentMethodNotFound(_) => ErrorCode::PaymentMethodNotFound,
            SubscriptionError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            SubscriptionError::SubscriptionNotExpired { .. } => ErrorCode::SubscriptionNotExpired,
            SubscriptionError::SubscriptionLapsed { .. } => ErrorCode::SubscriptionLapsed,
            SubscriptionError::AlreadySubscribed(_) => ErrorCode::AlreadySubscribed,
            SubscriptionError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            SubscriptionError::UnroutableMessage(_) => ErrorCode::UnroutableMessage,
            SubscriptionError::TransactionState(_) => ErrorCode::TransactionState,
            SubscriptionError::Infrastructure(_) => ErrorCode::StorageError,
        }
    }

    /// Returns a user-facing error message.
    pub fn message(&self) -> String {
        match self {
            SubscriptionError::PlanNotFound(name) => {
                format!("Subscription plan '{}' does not exist", name)
            }
            SubscriptionError::NoActiveSubscription(user_id) => {
                format!("No active subscription found for user {}", user_id)
            }
            SubscriptionError::SubscriptionNotFound(id) => {
                format!("Subscription {} does not exist", id)
            }
            SubscriptionError::PaymentMethodNotFound(detail) => {
                format!("No payment method on file: {}", detail)
            }
            SubscriptionError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            SubscriptionError::SubscriptionNotExpired { .. } => {
                "Subscription has not expired yet and cannot be renewed.".to_string()
            }
            SubscriptionError::SubscriptionLapsed { end_date } => {
                format!(
                    "Subscription ended on {} and must be renewed before changing plan.",
                    end_date
                )
            }
            SubscriptionError::AlreadySubscribed(user_id) => {
                format!("User {} already has an active subscription", user_id)
            }
            SubscriptionError::InvalidState { current, attempted } => {
                format!("Cannot {} subscription in {} state", attempted, current)
            }
            SubscriptionError::UnroutableMessage(kind) => {
                format!("No handler registered for {}", kind)
            }
            SubscriptionError::TransactionState(msg) => format!("Transaction misuse: {}", msg),
            SubscriptionError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// Only infrastructure failures are worth retrying. Everything else
    /// would fail the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SubscriptionError::Infrastructure(_))
    }
}

impl std::fmt::Display for SubscriptionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for SubscriptionError {}

impl From<DomainError> for SubscriptionError {
    fn from(err: DomainError) -> Self {
        let key = err
            .details
            .get("key")
            .cloned()
            .unwrap_or_else(|| err.message.clone());
        match err.code {
            ErrorCode::PlanNotFound => SubscriptionError::PlanNotFound(key),
            ErrorCode::SubscriptionNotFound => SubscriptionError::SubscriptionNotFound(key),
            ErrorCode::PaymentMethodNotFound => SubscriptionError::PaymentMethodNotFound(key),
            ErrorCode::ValidationFailed
            | ErrorCode::EmptyField
            | ErrorCode::OutOfRange
            | ErrorCode::InvalidFormat => SubscriptionError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            ErrorCode::InvalidStateTransition => SubscriptionError::InvalidState {
                current: err
                    .details
                    .get("current")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                attempted: err.message,
            },
            ErrorCode::UnroutableMessage => SubscriptionError::UnroutableMessage(err.message),
            ErrorCode::TransactionState => SubscriptionError::TransactionState(err.message),
            _ => SubscriptionError::Infrastructure(err.to_string()),
        }
    }
}

impl From<ValidationError> for SubscriptionError {
    fn from(err: ValidationError) -> Self {
        SubscriptionError::ValidationFailed {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<SubscriptionError> for DomainError {
    fn from(err: SubscriptionError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}
