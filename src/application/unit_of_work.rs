//! UnitOfWork - transaction boundary plus event harvesting.
//!
//! A unit of work is either open (a storage transaction is running and the
//! tracking repositories are usable) or closed. It is built once per
//! top-level bus dispatch and may run several transactions one after the
//! other; the `seen` sets live as long as the instance, not the transaction.
//!
//! ```ignore
//! let mut uow = UnitOfWork::new(storage.clone());
//! uow.begin().await?;
//! let plan = uow.plans()?.get(PlanName::Basic).await?;
//! uow.commit().await?;
//! let events = uow.collect_new_events();
//! ```

use std::sync::Arc;

use crate::domain::billing::{Payment, PaymentMethod};
use crate::domain::subscription::{
    SubscriptionError, SubscriptionEvent, SubscriptionPlan, UserSubscription,
};
use crate::ports::{Storage, StorageTransaction};

use super::tracking_repository::{
    lock_seen, SharedSeenSet, TrackedPaymentMethods, TrackedPayments, TrackedPlans,
    TrackedSubscriptions, TrackingRepository,
};

/// One logical unit of work over a [`Storage`].
pub struct UnitOfWork {
    storage: Arc<dyn Storage>,
    seen: SeenSets,
    state: State,
}

#[derive(Default)]
struct SeenSets {
    subscriptions: SharedSeenSet<UserSubscription>,
    plans: SharedSeenSet<SubscriptionPlan>,
    payments: SharedSeenSet<Payment>,
    payment_methods: SharedSeenSet<PaymentMethod>,
}

enum State {
    Closed,
    Open(OpenTransaction),
}

struct OpenTransaction {
    subscriptions: TrackedSubscriptions,
    plans: TrackedPlans,
    payments: TrackedPayments,
    payment_methods: TrackedPaymentMethods,
    transaction: Box<dyn StorageTransaction>,
}

impl UnitOfWork {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            seen: SeenSets::default(),
            state: State::Closed,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Open(_))
    }

    /// Opens a transaction.
    ///
    /// # Errors
    ///
    /// - `TransactionState` if a transaction is already open
    /// - `Infrastructure` if storage cannot start one
    pub async fn begin(&mut self) -> Result<(), SubscriptionError> {
        if self.is_open() {
            return Err(SubscriptionError::transaction_state(
                "begin called while a transaction is open",
            ));
        }
        let session = self.storage.begin().await?;
        self.state = State::Open(OpenTransaction {
            subscriptions: TrackingRepository::new(
                session.subscriptions,
                self.seen.subscriptions.clone(),
            ),
            plans: TrackingRepository::new(session.plans, self.seen.plans.clone()),
            payments: TrackingRepository::new(session.payments, self.seen.payments.clone()),
            payment_methods: TrackingRepository::new(
                session.payment_methods,
                self.seen.payment_methods.clone(),
            ),
            transaction: session.transaction,
        });
        tracing::debug!("Transaction opened");
        Ok(())
    }

    /// Makes every write of the open transaction durable and closes it.
    ///
    /// The unit of work is closed afterwards even when storage rejects the
    /// commit; in that case nothing was written and pending events are
    /// discarded as on rollback.
    pub async fn commit(&mut self) -> Result<(), SubscriptionError> {
        let open = self.take_open("commit")?;
        if let Err(err) = open.transaction.commit().await {
            self.discard_pending_events();
            return Err(err.into());
        }
        tracing::debug!("Transaction committed");
        Ok(())
    }

    /// Discards every write of the open transaction and closes it.
    ///
    /// Events raised by entities during the transaction are discarded too:
    /// they describe changes that never happened.
    pub async fn rollback(&mut self) -> Result<(), SubscriptionError> {
        let open = self.take_open("rollback")?;
        self.discard_pending_events();
        open.transaction.rollback().await?;
        tracing::debug!("Transaction rolled back");
        Ok(())
    }

    pub fn subscriptions(&self) -> Result<&TrackedSubscriptions, SubscriptionError> {
        Ok(&self.open("subscriptions")?.subscriptions)
    }

    pub fn plans(&self) -> Result<&TrackedPlans, SubscriptionError> {
        Ok(&self.open("plans")?.plans)
    }

    pub fn payments(&self) -> Result<&TrackedPayments, SubscriptionError> {
        Ok(&self.open("payments")?.payments)
    }

    pub fn payment_methods(&self) -> Result<&TrackedPaymentMethods, SubscriptionError> {
        Ok(&self.open("payment_methods")?.payment_methods)
    }

    /// Drains events raised since the last call.
    ///
    /// Order: subscriptions, plans, payments, payment methods; within each,
    /// first-seen entity order; within an entity, the order raised.
    pub fn collect_new_events(&self) -> Vec<SubscriptionEvent> {
        let mut events = lock_seen(&self.seen.subscriptions).drain_events();
        events.extend(lock_seen(&self.seen.plans).drain_events());
        events.extend(lock_seen(&self.seen.payments).drain_events());
        events.extend(lock_seen(&self.seen.payment_methods).drain_events());
        events
    }

    fn discard_pending_events(&self) {
        lock_seen(&self.seen.subscriptions).discard_events();
        lock_seen(&self.seen.plans).discard_events();
        lock_seen(&self.seen.payments).discard_events();
        lock_seen(&self.seen.payment_methods).discard_events();
    }

    fn open(&self, repository: &str) -> Result<&OpenTransaction, SubscriptionError> {
        match &self.state {
            State::Open(open) => Ok(open),
            State::Closed => Err(SubscriptionError::transaction_state(format!(
                "{} used outside a transaction",
                repository
            ))),
        }
    }

    fn take_open(&mut self, operation: &str) -> Result<OpenTransaction, SubscriptionError> {
        match std::mem::replace(&mut self.state, State::Closed) {
            State::Open(open) => Ok(open),
            State::Closed => Err(SubscriptionError::transaction_state(format!(
                "{} called with no open transaction",
                operation
            ))),
        }
    }
}

impl std::fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}
