//! Subscription Billing - subscription lifecycle and payment processing
//!
//! Users subscribe to plans, cancel, renew on expiry and change plans
//! mid-period with prorated charges. Every command runs through a message
//! bus inside a unit of work; domain events raised by the writes are
//! dispatched to event handlers after the command's transaction commits.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
