//! Payment method repository port.

use async_trait::async_trait;

use crate::domain::billing::PaymentMethod;
use crate::domain::foundation::{DomainError, PaymentMethodId};

/// Repository port for stored payment methods.
#[async_trait]
pub trait PaymentMethodRepository: Send + Sync {
    async fn add(&self, method: &PaymentMethod) -> Result<(), DomainError>;

    /// # Errors
    ///
    /// - `PaymentMethodNotFound` if no method has this id
    async fn get(&self, id: PaymentMethodId) -> Result<PaymentMethod, DomainError>;

    async fn list(&self) -> Result<Vec<PaymentMethod>, DomainError>;
}
