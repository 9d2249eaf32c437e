//! Subscription repository port.
//!
//! Defines the contract for persisting and retrieving UserSubscription
//! records. Implementations run inside the transaction that produced them.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::foundation::{DomainError, SubscriptionId, UserId};
use crate::domain::subscription::UserSubscription;

/// Repository port for subscription records.
///
/// Implementations must not persist pending events; only entity state.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Insert a new record.
    ///
    /// # Errors
    ///
    /// - `StorageError` if a record with the same id already exists
    async fn add(&self, subscription: &UserSubscription) -> Result<(), DomainError>;

    /// Overwrite an existing record.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if no record has this id
    async fn update(&self, subscription: &UserSubscription) -> Result<(), DomainError>;

    /// Load a record by id.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if no record has this id
    async fn get(&self, id: SubscriptionId) -> Result<UserSubscription, DomainError>;

    /// All records, oldest first.
    async fn list(&self) -> Result<Vec<UserSubscription>, DomainError>;

    /// The user's ACTIVE record, if any.
    async fn find_active_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Option<UserSubscription>, DomainError>;

    /// Records of any status whose `end_date` equals `date`.
    async fn list_expiring_on(&self, date: NaiveDate) -> Result<Vec<UserSubscription>, DomainError>;
}
