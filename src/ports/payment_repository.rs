//! Payment repository port.

use async_trait::async_trait;

use crate::domain::billing::Payment;
use crate::domain::foundation::{DomainError, PaymentId, UserId};

/// Repository port for payments, successful or not.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn add(&self, payment: &Payment) -> Result<(), DomainError>;

    async fn update(&self, payment: &Payment) -> Result<(), DomainError>;

    /// # Errors
    ///
    /// - `PaymentNotFound` if no payment has this id
    async fn get(&self, id: PaymentId) -> Result<Payment, DomainError>;

    async fn list(&self) -> Result<Vec<Payment>, DomainError>;

    /// A user's payments, oldest first.
    async fn list_by_user_id(&self, user_id: &UserId) -> Result<Vec<Payment>, DomainError>;
}
