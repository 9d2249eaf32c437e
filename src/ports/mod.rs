//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Persistence
//!
//! - `Storage` / `StorageTransaction` - transaction boundary
//! - One repository trait per entity type
//!
//! ## Collaborators
//!
//! - `PaymentGateway` - charges a stored payment method
//! - `Notifier` - sends notifications to people

mod notifier;
mod payment_gateway;
mod payment_method_repository;
mod payment_repository;
mod plan_repository;
mod storage;
mod subscription_repository;

pub use notifier::{Notification, Notifier};
pub use payment_gateway::{
    ChargeReceipt, ChargeRequest, PaymentError, PaymentErrorCode, PaymentGateway,
};
pub use payment_method_repository::PaymentMethodRepository;
pub use payment_repository::PaymentRepository;
pub use plan_repository::PlanRepository;
pub use storage::{Storage, StorageSession, StorageTransaction};
pub use subscription_repository::SubscriptionRepository;
