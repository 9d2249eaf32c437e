//! Integration tests for the scheduled renewal run.
//!
//! The scheduler lists ACTIVE subscriptions that ended yesterday and renews
//! each user in a separate unit of work, so one failed charge never touches
//! another user's records.

use chrono::{Duration as ChronoDuration, NaiveDate};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use subscription_billing::adapters::{InMemoryNotifier, InMemoryStorage, SimulatedPaymentGateway};
use subscription_billing::application::{
    build_message_bus, PaymentProcessor, PlanSeeder, RenewalScheduler, RetryPolicy, UnitOfWork,
};
use subscription_billing::domain::billing::{Payment, PaymentMethod, PaymentMethodType};
use subscription_billing::domain::foundation::{SubscriptionId, Timestamp, UserId};
use subscription_billing::domain::subscription::{
    PlanCatalog, PlanName, SubscriptionStatus, UserSubscription,
};
use subscription_billing::ports::{
    PaymentError, PaymentMethodRepository, PaymentRepository, PlanRepository,
    SubscriptionRepository,
};

// =============================================================================
// Test Infrastructure
// =============================================================================

struct Fixture {
    storage: Arc<InMemoryStorage>,
    gateway: SimulatedPaymentGateway,
    notifier: Arc<InMemoryNotifier>,
    scheduler: RenewalScheduler,
}

async fn fixture() -> Fixture {
    let storage = Arc::new(InMemoryStorage::new());
    PlanSeeder::new(storage.clone())
        .seed(&PlanCatalog::default())
        .await
        .unwrap();

    let gateway = SimulatedPaymentGateway::new();
    let notifier = Arc::new(InMemoryNotifier::new());
    let processor = Arc::new(PaymentProcessor::new(
        Arc::new(gateway.clone()),
        RetryPolicy::new(2, Duration::ZERO),
    ));
    let bus = Arc::new(build_message_bus(
        processor,
        notifier.clone(),
        "ops@example.com",
        "KRW",
    ));
    let scheduler = RenewalScheduler::new(storage.clone(), bus);

    Fixture {
        storage,
        gateway,
        notifier,
        scheduler,
    }
}

fn today() -> NaiveDate {
    Timestamp::today()
}

async fn store(
    storage: &Arc<InMemoryStorage>,
    user: &str,
    end_date: NaiveDate,
    status: SubscriptionStatus,
) -> UserSubscription {
    let mut uow = UnitOfWork::new(storage.clone());
    uow.begin().await.unwrap();
    let plan = uow.plans().unwrap().get(PlanName::Basic).await.unwrap();
    let user_id = UserId::new(user).unwrap();
    let start_date = end_date - ChronoDuration::days(30);
    let subscription = UserSubscription::restore(
        SubscriptionId::new(),
        user_id.clone(),
        plan.id,
        start_date,
        end_date,
        status,
    );
    let method = PaymentMethod::without_details(PaymentMethodType::Point);
    let payment =
        Payment::settled(subscription.id, user_id, method.id, plan.price, start_date).unwrap();
    uow.subscriptions().unwrap().add(&subscription).await.unwrap();
    uow.payment_methods().unwrap().add(&method).await.unwrap();
    uow.payments().unwrap().add(&payment).await.unwrap();
    uow.commit().await.unwrap();
    subscription
}

async fn statuses_of(storage: &Arc<InMemoryStorage>, user: &str) -> Vec<SubscriptionStatus> {
    storage
        .subscriptions()
        .await
        .into_iter()
        .filter(|s| s.user_id.as_str() == user)
        .map(|s| s.status)
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn renews_every_subscription_that_ended_yesterday() {
    let f = fixture().await;
    let yesterday = today() - ChronoDuration::days(1);
    store(&f.storage, "user-a", yesterday, SubscriptionStatus::Active).await;
    store(&f.storage, "user-b", yesterday, SubscriptionStatus::Active).await;
    store(&f.storage, "user-c", today() + ChronoDuration::days(3), SubscriptionStatus::Active).await;

    let report = f.scheduler.run_for(today()).await.unwrap();

    assert_eq!(report.renewed.len(), 2);
    assert!(report.payment_failed.is_empty());
    assert!(report.errors.is_empty());
    assert_eq!(f.gateway.charge_count(), 2);

    for user in ["user-a", "user-b"] {
        let mut statuses = statuses_of(&f.storage, user).await;
        statuses.sort_by_key(|s| s.to_string());
        assert_eq!(
            statuses,
            vec![SubscriptionStatus::Active, SubscriptionStatus::Expired]
        );
    }
    assert_eq!(statuses_of(&f.storage, "user-c").await, vec![SubscriptionStatus::Active]);
}

#[tokio::test]
async fn cancelled_subscriptions_are_not_renewed() {
    let f = fixture().await;
    let yesterday = today() - ChronoDuration::days(1);
    store(&f.storage, "user-a", yesterday, SubscriptionStatus::Canceled).await;

    let report = f.scheduler.run_for(today()).await.unwrap();

    assert_eq!(report.attempted(), 0);
    assert_eq!(f.gateway.charge_count(), 0);
}

#[tokio::test]
async fn one_declined_user_does_not_affect_the_next() {
    let f = fixture().await;
    let yesterday = today() - ChronoDuration::days(1);
    store(&f.storage, "user-a", yesterday, SubscriptionStatus::Active).await;
    store(&f.storage, "user-b", yesterday, SubscriptionStatus::Active).await;
    f.gateway
        .push_outcome(Err(PaymentError::card_declined("declined")));

    let report = f.scheduler.run_for(today()).await.unwrap();

    assert_eq!(report.payment_failed, vec![UserId::new("user-a").unwrap()]);
    assert_eq!(report.renewed, vec![UserId::new("user-b").unwrap()]);
    assert_eq!(statuses_of(&f.storage, "user-a").await, vec![SubscriptionStatus::Active]);
    assert_eq!(statuses_of(&f.storage, "user-b").await.len(), 2);
    assert_eq!(f.notifier.sent_count(), 1);
}

#[tokio::test]
async fn second_run_on_the_same_day_finds_nothing_to_renew() {
    let f = fixture().await;
    store(
        &f.storage,
        "user-a",
        today() - ChronoDuration::days(1),
        SubscriptionStatus::Active,
    )
    .await;

    let first = f.scheduler.run_for(today()).await.unwrap();
    let second = f.scheduler.run_for(today()).await.unwrap();

    assert_eq!(first.renewed.len(), 1);
    assert_eq!(second.attempted(), 0);
    assert_eq!(f.gateway.charge_count(), 1);
}

#[tokio::test]
async fn startup_run_renews_then_stops_on_shutdown() {
    let f = fixture().await;
    store(
        &f.storage,
        "user-a",
        today() - ChronoDuration::days(1),
        SubscriptionStatus::Active,
    )
    .await;

    let (tx, rx) = watch::channel(false);
    let storage = f.storage.clone();
    let scheduler = f.scheduler;
    let worker = tokio::spawn(async move {
        scheduler.run(rx, Duration::from_secs(3600), true).await;
    });

    // Wait for the first tick to finish its renewal.
    let mut renewed = false;
    for _ in 0..100 {
        if statuses_of(&storage, "user-a").await.len() == 2 {
            renewed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(renewed);

    tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), worker)
        .await
        .unwrap()
        .unwrap();
}
