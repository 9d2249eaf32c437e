//! TrackingRepository - repository decorator that remembers what it saw.
//!
//! Every entity that passes through the wrapper, whether added, updated or
//! returned by a finder, lands in a `seen` set keyed by entity id. The unit
//! of work later drains pending events from that set without knowing any
//! repository's query shape.
//!
//! The stored copy of an entity never carries events; the set keeps them
//! alongside the entity instead. Events are deduplicated by `EventId`, and
//! ids that were already drained are remembered so that writing a stale copy
//! back does not raise them a second time.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::billing::{Payment, PaymentMethod};
use crate::domain::foundation::{
    DomainError, DomainEvent, Entity, EventId, PaymentId, PaymentMethodId, PlanId,
    SubscriptionId, UserId,
};
use crate::domain::subscription::{PlanName, SubscriptionPlan, UserSubscription};
use crate::ports::{
    PaymentMethodRepository, PaymentRepository, PlanRepository, SubscriptionRepository,
};

/// Entities observed during one unit of work, in first-seen order.
#[derive(Debug)]
pub struct SeenSet<E: Entity> {
    order: Vec<E::Id>,
    entries: HashMap<E::Id, Tracked<E>>,
    drained: HashSet<EventId>,
}

#[derive(Debug)]
struct Tracked<E: Entity> {
    entity: E,
    pending: Vec<E::Event>,
}

impl<E: Entity> Default for SeenSet<E> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            entries: HashMap::new(),
            drained: HashSet::new(),
        }
    }
}

impl<E: Entity> SeenSet<E> {
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: E::Id) -> bool {
        self.entries.contains_key(&id)
    }

    /// Latest known copy of every entity, in first-seen order.
    pub fn entities(&self) -> Vec<E> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id))
            .map(|tracked| tracked.entity.clone())
            .collect()
    }

    /// Records an entity returned by a finder. A copy already in the set is
    /// newer than anything storage can return, so it is kept.
    fn observe(&mut self, entity: &E) {
        if self.entries.contains_key(&entity.id()) {
            self.absorb_events(entity);
            return;
        }
        self.insert(entity);
    }

    /// Records an entity the caller is writing. The written copy wins.
    fn record(&mut self, entity: &E) {
        if !self.entries.contains_key(&entity.id()) {
            self.insert(entity);
            return;
        }
        let mut stored = entity.clone();
        stored.take_events();
        if let Some(tracked) = self.entries.get_mut(&entity.id()) {
            tracked.entity = stored;
        }
        self.absorb_events(entity);
    }

    fn insert(&mut self, entity: &E) {
        let mut stored = entity.clone();
        stored.take_events();
        self.order.push(entity.id());
        self.entries.insert(
            entity.id(),
            Tracked {
                entity: stored,
                pending: Vec::new(),
            },
        );
        self.absorb_events(entity);
    }

    fn absorb_events(&mut self, entity: &E) {
        let drained = &self.drained;
        let Some(tracked) = self.entries.get_mut(&entity.id()) else {
            return;
        };
        for event in entity.pending_events() {
            let id = event.event_id();
            if drained.contains(&id) || tracked.pending.iter().any(|e| e.event_id() == id) {
                continue;
            }
            tracked.pending.push(event.clone());
        }
    }

    /// Drains pending events: entity order, then FIFO within an entity.
    pub fn drain_events(&mut self) -> Vec<E::Event> {
        let mut events = Vec::new();
        for id in &self.order {
            if let Some(tracked) = self.entries.get_mut(id) {
                for event in tracked.pending.drain(..) {
                    self.drained.insert(event.event_id());
                    events.push(event);
                }
            }
        }
        events
    }

    /// Drops pending events without returning them.
    pub fn discard_events(&mut self) {
        let _ = self.drain_events();
    }
}

/// Shared handle to a [`SeenSet`]; it outlives the transactions that fill it.
pub type SharedSeenSet<E> = Arc<Mutex<SeenSet<E>>>;

pub(crate) fn lock_seen<E: Entity>(seen: &SharedSeenSet<E>) -> MutexGuard<'_, SeenSet<E>> {
    seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Decorator over a repository trait object that records every entity it
/// forwards.
pub struct TrackingRepository<R: ?Sized, E: Entity> {
    inner: Arc<R>,
    seen: SharedSeenSet<E>,
}

impl<R: ?Sized, E: Entity> TrackingRepository<R, E> {
    pub fn new(inner: Arc<R>, seen: SharedSeenSet<E>) -> Self {
        Self { inner, seen }
    }

    /// Snapshot of the entities seen so far.
    pub fn seen(&self) -> Vec<E> {
        lock_seen(&self.seen).entities()
    }

    /// Drains events raised by seen entities since the last drain.
    pub fn collect_new_events(&self) -> Vec<E::Event> {
        lock_seen(&self.seen).drain_events()
    }

    fn observe(&self, entity: &E) {
        lock_seen(&self.seen).observe(entity);
    }

    fn observe_all(&self, entities: &[E]) {
        let mut seen = lock_seen(&self.seen);
        for entity in entities {
            seen.observe(entity);
        }
    }

    fn record(&self, entity: &E) {
        lock_seen(&self.seen).record(entity);
    }
}

pub type TrackedSubscriptions = TrackingRepository<dyn SubscriptionRepository, UserSubscription>;
pub type TrackedPlans = TrackingRepository<dyn PlanRepository, SubscriptionPlan>;
pub type TrackedPayments = TrackingRepository<dyn PaymentRepository, Payment>;
pub type TrackedPaymentMethods = TrackingRepository<dyn PaymentMethodRepository, PaymentMethod>;

// ════════════════════════════════════════════════════════════════════════════
// Forwarding
// ════════════════════════════════════════════════════════════════════════════

#[async_trait]
impl SubscriptionRepository for TrackedSubscriptions {
    async fn add(&self, subscription: &UserSubscription) -> Result<(), DomainError> {
        self.inner.add(subscription).await?;
        self.record(subscription);
        Ok(())
    }

    async fn update(&self, subscription: &UserSubscription) -> Result<(), DomainError> {
        self.inner.update(subscription).await?;
        self.record(subscription);
        Ok(())
    }

    async fn get(&self, id: SubscriptionId) -> Result<UserSubscription, DomainError> {
        let subscription = self.inner.get(id).await?;
        self.observe(&subscription);
        Ok(subscription)
    }

    async fn list(&self) -> Result<Vec<UserSubscription>, DomainError> {
        let subscriptions = self.inner.list().await?;
        self.observe_all(&subscriptions);
        Ok(subscriptions)
    }

    async fn find_active_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Option<UserSubscription>, DomainError> {
        let found = self.inner.find_active_by_user_id(user_id).await?;
        if let Some(subscription) = &found {
            self.observe(subscription);
        }
        Ok(found)
    }

    async fn list_expiring_on(&self, date: NaiveDate) -> Result<Vec<UserSubscription>, DomainError> {
        let subscriptions = self.inner.list_expiring_on(date).await?;
        self.observe_all(&subscriptions);
        Ok(subscriptions)
    }
}

#[async_trait]
impl PlanRepository for TrackedPlans {
    async fn add(&self, plan: &SubscriptionPlan) -> Result<(), DomainError> {
        self.inner.add(plan).await?;
        self.record(plan);
        Ok(())
    }

    async fn update(&self, plan: &SubscriptionPlan) -> Result<(), DomainError> {
        self.inner.update(plan).await?;
        self.record(plan);
        Ok(())
    }

    async fn get(&self, name: PlanName) -> Result<SubscriptionPlan, DomainError> {
        let plan = self.inner.get(name).await?;
        self.observe(&plan);
        Ok(plan)
    }

    async fn get_by_id(&self, id: PlanId) -> Result<SubscriptionPlan, DomainError> {
        let plan = self.inner.get_by_id(id).await?;
        self.observe(&plan);
        Ok(plan)
    }

    async fn find_by_name(&self, name: PlanName) -> Result<Option<SubscriptionPlan>, DomainError> {
        let found = self.inner.find_by_name(name).await?;
        if let Some(plan) = &found {
            self.observe(plan);
        }
        Ok(found)
    }

    async fn list(&self) -> Result<Vec<SubscriptionPlan>, DomainError> {
        let plans = self.inner.list().await?;
        self.observe_all(&plans);
        Ok(plans)
    }
}

#[async_trait]
impl PaymentRepository for TrackedPayments {
    async fn add(&self, payment: &Payment) -> Result<(), DomainError> {
        self.inner.add(payment).await?;
        self.record(payment);
        Ok(())
    }

    async fn update(&self, payment: &Payment) -> Result<(), DomainError> {
        self.inner.update(payment).await?;
        self.record(payment);
        Ok(())
    }

    async fn get(&self, id: PaymentId) -> Result<Payment, DomainError> {
        let payment = self.inner.get(id).await?;
        self.observe(&payment);
        Ok(payment)
    }

    async fn list(&self) -> Result<Vec<Payment>, DomainError> {
        let payments = self.inner.list().await?;
        self.observe_all(&payments);
        Ok(payments)
    }

    async fn list_by_user_id(&self, user_id: &UserId) -> Result<Vec<Payment>, DomainError> {
        let payments = self.inner.list_by_user_id(user_id).await?;
        self.observe_all(&payments);
        Ok(payments)
    }
}

#[async_trait]
impl PaymentMethodRepository for TrackedPaymentMethods {
    async fn add(&self, method: &PaymentMethod) -> Result<(), DomainError> {
        self.inner.add(method).await?;
        self.record(method);
        Ok(())
    }

    async fn get(&self, id: PaymentMethodId) -> Result<PaymentMethod, DomainError> {
        let method = self.inner.get(id).await?;
        self.observe(&method);
        Ok(method)
    }

    async fn list(&self) -> Result<Vec<PaymentMethod>, DomainError> {
        let methods = self.inner.list().await?;
        self.observe_all(&methods);
        Ok(methods)
    }
}
