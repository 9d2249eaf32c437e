//! RenewalScheduler - daily renewal of subscriptions that ran out yesterday.
//!
//! Each run lists subscriptions whose `end_date` is the day before `today`,
//! keeps the ACTIVE ones and dispatches one `RenewSubscription` per user.
//! Every user gets a fresh unit of work, so one failed renewal never affects
//! another.
//!
//! ## Graceful Shutdown
//!
//! [`RenewalScheduler::run`] listens on a watch channel and returns once
//! `true` is sent. A run in progress is finished first.

use chrono::{Duration as ChronoDuration, NaiveDate};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, Instant};

use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::subscription::{SubscriptionError, UserSubscription};
use crate::ports::{Storage, SubscriptionRepository};

use super::commands::Command;
use super::message_bus::MessageBus;
use super::unit_of_work::UnitOfWork;

/// Outcome of one scheduled run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenewalReport {
    pub renewed: Vec<UserId>,
    pub payment_failed: Vec<UserId>,
    pub errors: Vec<(UserId, String)>,
}

impl RenewalReport {
    pub fn attempted(&self) -> usize {
        self.renewed.len() + self.payment_failed.len() + self.errors.len()
    }
}

/// Issues renewal commands for expired subscriptions.
pub struct RenewalScheduler {
    storage: Arc<dyn Storage>,
    bus: Arc<MessageBus>,
}

impl RenewalScheduler {
    pub fn new(storage: Arc<dyn Storage>, bus: Arc<MessageBus>) -> Self {
        Self { storage, bus }
    }

    /// Runs until shutdown, once per `interval`.
    ///
    /// With `run_on_startup` the first run happens immediately, otherwise
    /// after one interval.
    pub async fn run(
        &self,
        mut shutdown: watch::Receiver<bool>,
        interval: Duration,
        run_on_startup: bool,
    ) {
        let start = if run_on_startup {
            Instant::now()
        } else {
            Instant::now() + interval
        };
        let mut ticker = time::interval_at(start, interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("Renewal scheduler stopped");
                        return;
                    }
                }

                _ = ticker.tick() => {
                    match self.run_for(Timestamp::today()).await {
                        Ok(report) => tracing::info!(
                            renewed = report.renewed.len(),
                            payment_failed = report.payment_failed.len(),
                            errors = report.errors.len(),
                            "Renewal run finished"
                        ),
                        Err(err) => tracing::error!(error = %err, "Renewal run failed"),
                    }
                }
            }
        }
    }

    /// Renews every user whose ACTIVE subscription ended the day before `today`.
    ///
    /// # Errors
    ///
    /// Only listing the due subscriptions can fail the run; per-user
    /// failures are collected in the report.
    pub async fn run_for(&self, today: NaiveDate) -> Result<RenewalReport, SubscriptionError> {
        let yesterday = today - ChronoDuration::days(1);
        let due = self.due_users(yesterday).await?;
        tracing::info!(date = %yesterday, users = due.len(), "Renewing expired subscriptions");

        let mut report = RenewalReport::default();
        for user_id in due {
            let mut uow = UnitOfWork::new(self.storage.clone());
            let command = Command::RenewSubscription {
                user_id: user_id.to_string(),
            };
            match self.bus.handle(command, &mut uow).await {
                Ok(results) if results.first().is_some_and(|r| r.success) => {
                    report.renewed.push(user_id);
                }
                Ok(_) => report.payment_failed.push(user_id),
                Err(err) => {
                    tracing::error!(user_id = %user_id, error = %err, "Renewal failed");
                    report.errors.push((user_id, err.to_string()));
                }
            }
        }
        Ok(report)
    }

    /// Users with an ACTIVE subscription ending on `date`, each once.
    async fn due_users(&self, date: NaiveDate) -> Result<Vec<UserId>, SubscriptionError> {
        let mut uow = UnitOfWork::new(self.storage.clone());
        uow.begin().await?;
        let listed = Self::list_expiring(&uow, date).await;
        uow.rollback().await?;

        let mut users: Vec<UserId> = Vec::new();
        for subscription in listed? {
            if subscription.is_active() && !users.contains(&subscription.user_id) {
                users.push(subscription.user_id);
            }
        }
        Ok(users)
    }

    async fn list_expiring(
        uow: &UnitOfWork,
        date: NaiveDate,
    ) -> Result<Vec<UserSubscription>, SubscriptionError> {
        Ok(uow.subscriptions()?.list_expiring_on(date).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryStorage;
    use crate::application::{CommandHandler, CommandKind, CommandResult};
    use crate::domain::foundation::SubscriptionId;
    use crate::domain::subscription::{
        PaymentCycle, PlanName, SubscriptionPlan, SubscriptionStatus,
    };
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    /// Records the users it was asked to renew; fails for "user-err".
    #[derive(Default)]
    struct RecordingRenewHandler {
        users: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CommandHandler for RecordingRenewHandler {
        async fn handle(
            &self,
            command: &Command,
            _uow: &UnitOfWork,
        ) -> Result<CommandResult, SubscriptionError> {
            let user = command.user_id().to_string();
            self.users.lock().unwrap().push(user.clone());
            match user.as_str() {
                "user-err" => Err(SubscriptionError::infrastructure("boom")),
                "user-declined" => Ok(CommandResult::failed("declined")),
                _ => Ok(CommandResult::ok("renewed")),
            }
        }

        fn name(&self) -> &'static str {
            "RecordingRenewHandler"
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    fn row(user: &str, end_date: NaiveDate, status: SubscriptionStatus) -> UserSubscription {
        let plan =
            SubscriptionPlan::new(PlanName::Basic, dec!(6000.00), PaymentCycle::Monthly, 30)
                .unwrap();
        UserSubscription::restore(
            SubscriptionId::new(),
            UserId::new(user).unwrap(),
            plan.id,
            end_date - ChronoDuration::days(30),
            end_date,
            status,
        )
    }

    async fn setup(rows: Vec<UserSubscription>) -> (RenewalScheduler, Arc<RecordingRenewHandler>) {
        let storage = Arc::new(InMemoryStorage::new());
        let mut uow = UnitOfWork::new(storage.clone());
        uow.begin().await.unwrap();
        for r in &rows {
            uow.subscriptions().unwrap().add(r).await.unwrap();
        }
        uow.commit().await.unwrap();

        let handler = Arc::new(RecordingRenewHandler::default());
        let mut bus = MessageBus::new();
        bus.register(CommandKind::RenewSubscription, handler.clone());
        (RenewalScheduler::new(storage, Arc::new(bus)), handler)
    }

    #[tokio::test]
    async fn renews_only_active_rows_that_ended_yesterday() {
        let yesterday = today() - ChronoDuration::days(1);
        let (scheduler, handler) = setup(vec![
            row("user-a", yesterday, SubscriptionStatus::Active),
            row("user-b", yesterday, SubscriptionStatus::Canceled),
            row("user-c", today(), SubscriptionStatus::Active),
            row("user-d", yesterday - ChronoDuration::days(1), SubscriptionStatus::Active),
        ])
        .await;

        let report = scheduler.run_for(today()).await.unwrap();

        assert_eq!(*handler.users.lock().unwrap(), vec!["user-a".to_string()]);
        assert_eq!(report.renewed, vec![UserId::new("user-a").unwrap()]);
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_the_others() {
        let yesterday = today() - ChronoDuration::days(1);
        let (scheduler, handler) = setup(vec![
            row("user-err", yesterday, SubscriptionStatus::Active),
            row("user-declined", yesterday, SubscriptionStatus::Active),
            row("user-ok", yesterday, SubscriptionStatus::Active),
        ])
        .await;

        let report = scheduler.run_for(today()).await.unwrap();

        assert_eq!(handler.users.lock().unwrap().len(), 3);
        assert_eq!(report.attempted(), 3);
        assert_eq!(report.renewed, vec![UserId::new("user-ok").unwrap()]);
        assert_eq!(report.payment_failed, vec![UserId::new("user-declined").unwrap()]);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].0.as_str(), "user-err");
    }

    #[tokio::test]
    async fn nothing_due_is_an_empty_report() {
        let (scheduler, _) = setup(vec![]).await;
        let report = scheduler.run_for(today()).await.unwrap();
        assert_eq!(report, RenewalReport::default());
    }

    #[tokio::test]
    async fn run_stops_on_shutdown_signal() {
        let (scheduler, _) = setup(vec![]).await;
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            scheduler.run(rx, Duration::from_secs(3600), true).await;
        });
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
