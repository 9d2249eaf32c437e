//! Storage port: the transaction boundary.
//!
//! A storage collaborator hands out one [`StorageSession`] per transaction.
//! The session's repositories all see the same uncommitted state, and
//! nothing they write is visible to other sessions until `commit`.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::foundation::DomainError;

use super::{PaymentMethodRepository, PaymentRepository, PlanRepository, SubscriptionRepository};

/// Opens transactions.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Begin a new transaction.
    ///
    /// Implementations may make this wait until an earlier transaction on
    /// the same storage has finished.
    async fn begin(&self) -> Result<StorageSession, DomainError>;
}

/// Handle that finishes one transaction.
#[async_trait]
pub trait StorageTransaction: Send + Sync {
    /// Make every write of the session visible.
    async fn commit(self: Box<Self>) -> Result<(), DomainError>;

    /// Discard every write of the session.
    async fn rollback(self: Box<Self>) -> Result<(), DomainError>;
}

/// Repositories bound to one open transaction.
pub struct StorageSession {
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub plans: Arc<dyn PlanRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub payment_methods: Arc<dyn PaymentMethodRepository>,
    pub transaction: Box<dyn StorageTransaction>,
}

impl std::fmt::Debug for StorageSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageSession").finish_non_exhaustive()
    }
}
