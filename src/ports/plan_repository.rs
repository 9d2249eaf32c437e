//! Plan repository port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, PlanId};
use crate::domain::subscription::{PlanName, SubscriptionPlan};

/// Repository port for subscription plans.
///
/// Plans are keyed by name; the id is only used by subscription records
/// that point at a plan.
#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Insert a new plan.
    ///
    /// # Errors
    ///
    /// - `StorageError` if a plan with the same name already exists
    async fn add(&self, plan: &SubscriptionPlan) -> Result<(), DomainError>;

    /// Administrative overwrite of an existing plan.
    async fn update(&self, plan: &SubscriptionPlan) -> Result<(), DomainError>;

    /// Load a plan by name.
    ///
    /// # Errors
    ///
    /// - `PlanNotFound` if no plan has this name
    async fn get(&self, name: PlanName) -> Result<SubscriptionPlan, DomainError>;

    /// Load a plan by id.
    ///
    /// # Errors
    ///
    /// - `PlanNotFound` if no plan has this id
    async fn get_by_id(&self, id: PlanId) -> Result<SubscriptionPlan, DomainError>;

    /// Load a plan by name, `None` if absent.
    async fn find_by_name(&self, name: PlanName) -> Result<Option<SubscriptionPlan>, DomainError>;

    /// All plans, in insertion order.
    async fn list(&self) -> Result<Vec<SubscriptionPlan>, DomainError>;
}
