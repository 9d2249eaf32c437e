//! In-Memory Storage Adapter
//!
//! Transactional storage held in process memory. Useful for testing,
//! development and the single-process renewal worker.
//!
//! Each transaction works on a private copy of the committed tables. `commit`
//! writes the copy back in one step, `rollback` (or dropping the transaction)
//! discards it. Transactions are serialized: `begin` waits until the
//! previous transaction on the same storage has finished.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::domain::billing::{Payment, PaymentMethod};
use crate::domain::foundation::{
    DomainError, Entity, ErrorCode, PaymentId, PaymentMethodId, PlanId, SubscriptionId, UserId,
};
use crate::domain::subscription::{PlanName, SubscriptionPlan, UserSubscription};
use crate::ports::{
    PaymentMethodRepository, PaymentRepository, PlanRepository, Storage, StorageSession,
    StorageTransaction, SubscriptionRepository,
};

/// Rows of every table, in insertion order.
#[derive(Debug, Clone, Default)]
struct Tables {
    subscriptions: Vec<UserSubscription>,
    plans: Vec<SubscriptionPlan>,
    payments: Vec<Payment>,
    payment_methods: Vec<PaymentMethod>,
}

/// In-memory transactional storage.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    committed: Arc<Mutex<Tables>>,
    fail_commits: Arc<AtomicBool>,
}

impl InMemoryStorage {
    /// Create empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `commit` fail with a storage error (useful for tests).
    pub fn set_fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    // Inspection helpers read committed state. They wait while a transaction
    // is open, so call them between transactions.

    pub async fn subscriptions(&self) -> Vec<UserSubscription> {
        self.committed.lock().await.subscriptions.clone()
    }

    pub async fn plans(&self) -> Vec<SubscriptionPlan> {
        self.committed.lock().await.plans.clone()
    }

    pub async fn payments(&self) -> Vec<Payment> {
        self.committed.lock().await.payments.clone()
    }

    pub async fn payment_methods(&self) -> Vec<PaymentMethod> {
        self.committed.lock().await.payment_methods.clone()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn begin(&self) -> Result<StorageSession, DomainError> {
        let guard = self.committed.clone().lock_owned().await;
        let working = Arc::new(RwLock::new(guard.clone()));
        let repositories = Arc::new(InMemoryRepositories {
            working: working.clone(),
        });

        Ok(StorageSession {
            subscriptions: repositories.clone(),
            plans: repositories.clone(),
            payments: repositories.clone(),
            payment_methods: repositories,
            transaction: Box::new(InMemoryTransaction {
                committed: guard,
                working,
                fail_commit: self.fail_commits.load(Ordering::SeqCst),
            }),
        })
    }
}

/// Holds the committed tables for the lifetime of one transaction.
struct InMemoryTransaction {
    committed: OwnedMutexGuard<Tables>,
    working: Arc<RwLock<Tables>>,
    fail_commit: bool,
}

#[async_trait]
impl StorageTransaction for InMemoryTransaction {
    async fn commit(mut self: Box<Self>) -> Result<(), DomainError> {
        if self.fail_commit {
            return Err(DomainError::new(
                ErrorCode::StorageError,
                "commit rejected by storage",
            ));
        }
        let snapshot = self.working.read().await.clone();
        *self.committed = snapshot;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        Ok(())
    }
}

/// Repositories over one transaction's working copy.
struct InMemoryRepositories {
    working: Arc<RwLock<Tables>>,
}

fn duplicate(entity: &str, id: impl std::fmt::Display) -> DomainError {
    DomainError::new(
        ErrorCode::StorageError,
        format!("{} {} already exists", entity, id),
    )
    .with_detail("key", id.to_string())
}

/// Stored copies never carry pending events.
fn without_events<E: Entity>(entity: &E) -> E {
    let mut stored = entity.clone();
    stored.take_events();
    stored
}

fn insert<E: Entity>(rows: &mut Vec<E>, entity: &E, name: &str) -> Result<(), DomainError> {
    if rows.iter().any(|row| row.id() == entity.id()) {
        return Err(duplicate(name, entity.id()));
    }
    rows.push(without_events(entity));
    Ok(())
}

fn replace<E: Entity>(rows: &mut [E], entity: &E, missing: ErrorCode) -> Result<(), DomainError> {
    let row = rows
        .iter_mut()
        .find(|row| row.id() == entity.id())
        .ok_or_else(|| DomainError::not_found(missing, entity.id()))?;
    *row = without_events(entity);
    Ok(())
}

fn fetch<E: Entity>(rows: &[E], id: E::Id, missing: ErrorCode) -> Result<E, DomainError> {
    rows.iter()
        .find(|row| row.id() == id)
        .cloned()
        .ok_or_else(|| DomainError::not_found(missing, id))
}

#[async_trait]
impl SubscriptionRepository for InMemoryRepositories {
    async fn add(&self, subscription: &UserSubscription) -> Result<(), DomainError> {
        let mut tables = self.working.write().await;
        insert(&mut tables.subscriptions, subscription, "subscription")
    }

    async fn update(&self, subscription: &UserSubscription) -> Result<(), DomainError> {
        let mut tables = self.working.write().await;
        replace(
            &mut tables.subscriptions,
            subscription,
            ErrorCode::SubscriptionNotFound,
        )
    }

    async fn get(&self, id: SubscriptionId) -> Result<UserSubscription, DomainError> {
        let tables = self.working.read().await;
        fetch(&tables.subscriptions, id, ErrorCode::SubscriptionNotFound)
    }

    async fn list(&self) -> Result<Vec<UserSubscription>, DomainError> {
        Ok(self.working.read().await.subscriptions.clone())
    }

    async fn find_active_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Option<UserSubscription>, DomainError> {
        let tables = self.working.read().await;
        Ok(tables
            .subscriptions
            .iter()
            .find(|s| &s.user_id == user_id && s.is_active())
            .cloned())
    }

    async fn list_expiring_on(&self, date: NaiveDate) -> Result<Vec<UserSubscription>, DomainError> {
        let tables = self.working.read().await;
        Ok(tables
            .subscriptions
            .iter()
            .filter(|s| s.end_date == date)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PlanRepository for InMemoryRepositories {
    async fn add(&self, plan: &SubscriptionPlan) -> Result<(), DomainError> {
        let mut tables = self.working.write().await;
        if tables.plans.iter().any(|p| p.name == plan.name) {
            return Err(duplicate("plan", plan.name));
        }
        insert(&mut tables.plans, plan, "plan")
    }

    async fn update(&self, plan: &SubscriptionPlan) -> Result<(), DomainError> {
        let mut tables = self.working.write().await;
        replace(&mut tables.plans, plan, ErrorCode::PlanNotFound)
    }

    async fn get(&self, name: PlanName) -> Result<SubscriptionPlan, DomainError> {
        let tables = self.working.read().await;
        tables
            .plans
            .iter()
            .find(|p| p.name == name)
            .cloned()
            .ok_or_else(|| DomainError::not_found(ErrorCode::PlanNotFound, name))
    }

    async fn get_by_id(&self, id: PlanId) -> Result<SubscriptionPlan, DomainError> {
        let tables = self.working.read().await;
        fetch(&tables.plans, id, ErrorCode::PlanNotFound)
    }

    async fn find_by_name(&self, name: PlanName) -> Result<Option<SubscriptionPlan>, DomainError> {
        let tables = self.working.read().await;
        Ok(tables.plans.iter().find(|p| p.name == name).cloned())
    }

    async fn list(&self) -> Result<Vec<SubscriptionPlan>, DomainError> {
        Ok(self.working.read().await.plans.clone())
    }
}

#[async_trait]
impl PaymentRepository for InMemoryRepositories {
    async fn add(&self, payment: &Payment) -> Result<(), DomainError> {
        let mut tables = self.working.write().await;
        insert(&mut tables.payments, payment, "payment")
    }

    async fn update(&self, payment: &Payment) -> Result<(), DomainError> {
        let mut tables = self.working.write().await;
        replace(&mut tables.payments, payment, ErrorCode::PaymentNotFound)
    }

    async fn get(&self, id: PaymentId) -> Result<Payment, DomainError> {
        let tables = self.working.read().await;
        fetch(&tables.payments, id, ErrorCode::PaymentNotFound)
    }

    async fn list(&self) -> Result<Vec<Payment>, DomainError> {
        Ok(self.working.read().await.payments.clone())
    }

    async fn list_by_user_id(&self, user_id: &UserId) -> Result<Vec<Payment>, DomainError> {
        let tables = self.working.read().await;
        Ok(tables
            .payments
            .iter()
            .filter(|p| &p.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PaymentMethodRepository for InMemoryRepositories {
    async fn add(&self, method: &PaymentMethod) -> Result<(), DomainError> {
        let mut tables = self.working.write().await;
        insert(&mut tables.payment_methods, method, "payment method")
    }

    async fn get(&self, id: PaymentMethodId) -> Result<PaymentMethod, DomainError> {
        let tables = self.working.read().await;
        fetch(&tables.payment_methods, id, ErrorCode::PaymentMethodNotFound)
    }

    async fn list(&self) -> Result<Vec<PaymentMethod>, DomainError> {
        Ok(self.working.read().await.payment_methods.clone())
    }
}
