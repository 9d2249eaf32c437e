//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, time helpers, error types and the traits that
//! entities, statuses and events implement.

mod entity;
mod errors;
mod events;
mod ids;
mod state_machine;
mod timestamp;

pub use entity::Entity;
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{DomainEvent, EventId};
pub use ids::{PaymentId, PaymentMethodId, PlanId, SubscriptionId, UserId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
