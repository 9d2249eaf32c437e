//! Application layer - Commands, Handlers, and the Message Bus.
//!
//! Commands enter through [`MessageBus::handle`], which opens a transaction
//! on the [`UnitOfWork`], runs the registered handler and dispatches any
//! domain events the handler's writes raised.

pub mod handlers;

mod bootstrap;
mod commands;
mod message_bus;
mod payment_processor;
mod plan_seeder;
mod renewal_scheduler;
mod tracking_repository;
mod unit_of_work;

pub use bootstrap::build_message_bus;
pub use commands::{Command, CommandKind, CommandResult, Message, PaymentDetails};
pub use message_bus::{CommandHandler, EventHandler, MessageBus};
pub use payment_processor::{PaymentAttempt, PaymentProcessor, RetryPolicy};
pub use plan_seeder::{PlanSeeder, SeedReport};
pub use renewal_scheduler::{RenewalReport, RenewalScheduler};
pub use tracking_repository::{
    SeenSet, TrackedPaymentMethods, TrackedPayments, TrackedPlans, TrackedSubscriptions,
    TrackingRepository,
};
pub use unit_of_work::UnitOfWork;
