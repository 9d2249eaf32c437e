//! Subscription domain - plans, subscription records and their events.
//!
//! # Lifecycle
//!
//! ```text
//! PENDING -> ACTIVE -> CANCELED
//!                  \-> EXPIRED   (renewal opens a successor ACTIVE record)
//! ```

mod catalog;
mod errors;
mod events;
mod plan;
mod status;
mod user_subscription;

pub use catalog::{CatalogError, PlanCatalog, PlanSpec};
pub use errors::{ErrorKind, SubscriptionError};
pub use events::{
    SubscriptionEvent, PAYMENT_FAILED, SUBSCRIPTION_ACTIVATED, SUBSCRIPTION_CANCELLED,
    SUBSCRIPTION_EXPIRED,
};
pub use plan::{PaymentCycle, PlanName, SubscriptionPlan};
pub use status::SubscriptionStatus;
pub use user_subscription::UserSubscription;
