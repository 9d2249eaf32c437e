//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, time, errors, entity traits)
//! - `subscription` - Plans, subscription records, lifecycle events
//! - `billing` - Payments, payment methods, card validation, proration

pub mod billing;
pub mod foundation;
pub mod subscription;
