//! Event handlers.
//!
//! - Alerting on failed payments
//! - Auditing lifecycle transitions

mod audit_lifecycle;
mod notify_payment_failed;

pub use audit_lifecycle::LifecycleAuditHandler;
pub use notify_payment_failed::PaymentFailedNotificationHandler;
