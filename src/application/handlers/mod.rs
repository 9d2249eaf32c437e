//! Command and event handlers.
//!
//! Handlers are registered on the `MessageBus`; each one runs against the
//! unit of work the bus opened for it.

pub mod events;
pub mod subscription;

pub use events::{LifecycleAuditHandler, PaymentFailedNotificationHandler};
pub use subscription::{
    CancelSubscriptionHandler, ChangeSubscriptionPlanHandler, RenewSubscriptionHandler,
    SubscribeUserToPlanHandler,
};
