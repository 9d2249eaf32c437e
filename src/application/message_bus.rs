//! MessageBus - dispatches commands and the events they cause.
//!
//! One call to [`MessageBus::handle`] drains a FIFO queue seeded with a
//! single message:
//!
//! - A command goes to exactly one handler inside its own transaction.
//!   Failure rolls the transaction back and aborts the whole call.
//! - An event goes to every handler subscribed to its type, each inside its
//!   own transaction. Failures are logged and never reach the caller.
//!
//! After every step the unit of work is asked for newly raised events, which
//! join the back of the queue. Events are drained, never re-read, so
//! cascades terminate once handlers stop raising new ones.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::domain::foundation::DomainEvent;
use crate::domain::subscription::{SubscriptionError, SubscriptionEvent};

use super::commands::{Command, CommandKind, CommandResult, Message};
use super::unit_of_work::UnitOfWork;

/// Executes one kind of command against an open unit of work.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(
        &self,
        command: &Command,
        uow: &UnitOfWork,
    ) -> Result<CommandResult, SubscriptionError>;

    /// Handler name for logging.
    fn name(&self) -> &'static str;
}

/// Reacts to an event against an open unit of work.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(
        &self,
        event: &SubscriptionEvent,
        uow: &UnitOfWork,
    ) -> Result<(), SubscriptionError>;

    /// Handler name for logging.
    fn name(&self) -> &'static str;
}

/// Routes commands to one handler each and events to any number.
#[derive(Default)]
pub struct MessageBus {
    command_handlers: HashMap<CommandKind, Arc<dyn CommandHandler>>,
    event_handlers: HashMap<String, Vec<Arc<dyn EventHandler>>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes `kind` to `handler`, replacing any earlier registration.
    pub fn register(&mut self, kind: CommandKind, handler: Arc<dyn CommandHandler>) {
        self.command_handlers.insert(kind, handler);
    }

    /// Adds `handler` to the subscribers of `event_type`. Handlers run in
    /// subscription order.
    pub fn subscribe(&mut self, event_type: &str, handler: Arc<dyn EventHandler>) {
        self.event_handlers
            .entry(event_type.to_string())
            .or_default()
            .push(handler);
    }

    pub fn subscribe_all(&mut self, event_types: &[&str], handler: Arc<dyn EventHandler>) {
        for event_type in event_types {
            self.subscribe(event_type, Arc::clone(&handler));
        }
    }

    pub fn has_handler(&self, kind: CommandKind) -> bool {
        self.command_handlers.contains_key(&kind)
    }

    /// Processes `message` and everything it causes.
    ///
    /// Returns command results in dequeue order.
    ///
    /// # Errors
    ///
    /// - `UnroutableMessage` if no handler is registered for a command
    /// - Any error the command handler returns; its transaction is rolled back
    pub async fn handle(
        &self,
        message: impl Into<Message>,
        uow: &mut UnitOfWork,
    ) -> Result<Vec<CommandResult>, SubscriptionError> {
        let mut queue = VecDeque::from([message.into()]);
        let mut results = Vec::new();

        while let Some(message) = queue.pop_front() {
            match message {
                Message::Command(command) => {
                    let result = self.handle_command(&command, uow).await?;
                    results.push(result);
                    queue.extend(uow.collect_new_events().into_iter().map(Message::Event));
                }
                Message::Event(event) => {
                    self.handle_event(&event, uow, &mut queue).await;
                }
            }
        }

        Ok(results)
    }

    async fn handle_command(
        &self,
        command: &Command,
        uow: &mut UnitOfWork,
    ) -> Result<CommandResult, SubscriptionError> {
        let kind = command.kind();
        let handler = self
            .command_handlers
            .get(&kind)
            .cloned()
            .ok_or_else(|| SubscriptionError::unroutable(kind.to_string()))?;

        tracing::debug!(command = %kind, handler = handler.name(), "Handling command");
        uow.begin().await?;

        match handler.handle(command, uow).await {
            Ok(result) => {
                if let Err(err) = uow.commit().await {
                    tracing::error!(command = %kind, error = %err, "Commit failed");
                    return Err(err);
                }
                tracing::debug!(command = %kind, success = result.success, "Command handled");
                Ok(result)
            }
            Err(err) => {
                tracing::error!(
                    command = %kind,
                    user_id = command.user_id(),
                    error = %err,
                    "Command failed"
                );
                if let Err(rollback_err) = uow.rollback().await {
                    tracing::error!(command = %kind, error = %rollback_err, "Rollback failed");
                }
                Err(err)
            }
        }
    }

    async fn handle_event(
        &self,
        event: &SubscriptionEvent,
        uow: &mut UnitOfWork,
        queue: &mut VecDeque<Message>,
    ) {
        let handlers = self
            .event_handlers
            .get(event.event_type())
            .cloned()
            .unwrap_or_default();

        for handler in handlers {
            tracing::debug!(
                event_type = event.event_type(),
                handler = handler.name(),
                "Handling event"
            );
            if let Err(err) = Self::run_event_handler(handler.as_ref(), event, uow).await {
                tracing::error!(
                    event_type = event.event_type(),
                    event_id = event.event_id().as_str(),
                    handler = handler.name(),
                    error = %err,
                    "Event handler failed"
                );
            }
            queue.extend(uow.collect_new_events().into_iter().map(Message::Event));
        }
    }

    async fn run_event_handler(
        handler: &dyn EventHandler,
        event: &SubscriptionEvent,
        uow: &mut UnitOfWork,
    ) -> Result<(), SubscriptionError> {
        uow.begin().await?;
        match handler.handle(event, uow).await {
            Ok(()) => uow.commit().await,
            Err(err) => {
                if let Err(rollback_err) = uow.rollback().await {
                    tracing::error!(handler = handler.name(), error = %rollback_err, "Rollback failed");
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryStorage;
    use crate::domain::billing::Payment;
    use crate::domain::foundation::{PaymentMethodId, SubscriptionId, UserId};
    use crate::domain::subscription::{PlanName, SUBSCRIPTION_ACTIVATED, PAYMENT_FAILED};
    use crate::domain::subscription::{PaymentCycle, SubscriptionPlan, UserSubscription};
    use crate::ports::{PaymentRepository, PlanRepository, SubscriptionRepository};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    // ════════════════════════════════════════════════════════════════════════════
    // Test Handlers
    // ════════════════════════════════════════════════════════════════════════════

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn basic() -> SubscriptionPlan {
        SubscriptionPlan::new(PlanName::Basic, dec!(6000.00), PaymentCycle::Monthly, 30).unwrap()
    }

    /// Adds a plan and, optionally, a subscription so that an event is raised.
    struct WritingHandler {
        raise_event: bool,
    }

    #[async_trait]
    impl CommandHandler for WritingHandler {
        async fn handle(
            &self,
            command: &Command,
            uow: &UnitOfWork,
        ) -> Result<CommandResult, SubscriptionError> {
            let plan = basic();
            uow.plans()?.add(&plan).await?;
            if self.raise_event {
                let user = UserId::new(command.user_id())?;
                let subscription = UserSubscription::start_full_period(user, &plan, today())?;
                uow.subscriptions()?.add(&subscription).await?;
            }
            Ok(CommandResult::ok("written"))
        }

        fn name(&self) -> &'static str {
            "WritingHandler"
        }
    }

    /// Writes, then fails.
    struct FailingCommandHandler;

    #[async_trait]
    impl CommandHandler for FailingCommandHandler {
        async fn handle(
            &self,
            _command: &Command,
            uow: &UnitOfWork,
        ) -> Result<CommandResult, SubscriptionError> {
            uow.plans()?.add(&basic()).await?;
            Err(SubscriptionError::plan_not_found("gold"))
        }

        fn name(&self) -> &'static str {
            "FailingCommandHandler"
        }
    }

    /// Records the event types it receives, optionally failing.
    struct RecordingEventHandler {
        seen: Arc<Mutex<Vec<String>>>,
        label: &'static str,
        fail: bool,
    }

    #[async_trait]
    impl EventHandler for RecordingEventHandler {
        async fn handle(
            &self,
            event: &SubscriptionEvent,
            _uow: &UnitOfWork,
        ) -> Result<(), SubscriptionError> {
            self.seen
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.label, event.event_type()));
            if self.fail {
                return Err(SubscriptionError::infrastructure("handler blew up"));
            }
            Ok(())
        }

        fn name(&self) -> &'static str {
            "RecordingEventHandler"
        }
    }

    /// On activation, records a failed payment, raising a follow-up event.
    struct CascadingEventHandler;

    #[async_trait]
    impl EventHandler for CascadingEventHandler {
        async fn handle(
            &self,
            event: &SubscriptionEvent,
            uow: &UnitOfWork,
        ) -> Result<(), SubscriptionError> {
            let mut payment = Payment::pending(
                SubscriptionId::new(),
                event.user_id().clone(),
                PaymentMethodId::new(),
                dec!(1.00),
                today(),
            )?;
            payment.mark_failed("card_declined")?;
            uow.payments()?.add(&payment).await?;
            Ok(())
        }

        fn name(&self) -> &'static str {
            "CascadingEventHandler"
        }
    }

    fn cancel(user: &str) -> Command {
        Command::CancelSubscription {
            user_id: user.to_string(),
        }
    }

    fn recorder(seen: &Arc<Mutex<Vec<String>>>, label: &'static str, fail: bool) -> Arc<dyn EventHandler> {
        Arc::new(RecordingEventHandler {
            seen: seen.clone(),
            label,
            fail,
        })
    }

    fn setup() -> (Arc<InMemoryStorage>, UnitOfWork) {
        let storage = Arc::new(InMemoryStorage::new());
        let uow = UnitOfWork::new(storage.clone());
        (storage, uow)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Commands
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn unregistered_command_is_unroutable() {
        let (_, mut uow) = setup();
        let bus = MessageBus::new();

        let err = bus.handle(cancel("user-1"), &mut uow).await.unwrap_err();
        assert!(matches!(err, SubscriptionError::UnroutableMessage(_)));
        assert!(!uow.is_open());
    }

    #[tokio::test]
    async fn successful_command_commits_and_returns_result() {
        let (storage, mut uow) = setup();
        let mut bus = MessageBus::new();
        bus.register(
            CommandKind::CancelSubscription,
            Arc::new(WritingHandler { raise_event: false }),
        );

        let results = bus.handle(cancel("user-1"), &mut uow).await.unwrap();

        assert_eq!(results, vec![CommandResult::ok("written")]);
        assert_eq!(storage.plans().await.len(), 1);
        assert!(!uow.is_open());
    }

    #[tokio::test]
    async fn failing_command_rolls_back_and_propagates() {
        let (storage, mut uow) = setup();
        let mut bus = MessageBus::new();
        bus.register(CommandKind::CancelSubscription, Arc::new(FailingCommandHandler));

        let err = bus.handle(cancel("user-1"), &mut uow).await.unwrap_err();

        assert!(matches!(err, SubscriptionError::PlanNotFound(_)));
        assert!(storage.plans().await.is_empty());
        assert!(!uow.is_open());
    }

    #[tokio::test]
    async fn commit_failure_is_reported_as_command_failure() {
        let (storage, mut uow) = setup();
        storage.set_fail_commits(true);
        let mut bus = MessageBus::new();
        bus.register(
            CommandKind::CancelSubscription,
            Arc::new(WritingHandler { raise_event: false }),
        );

        let err = bus.handle(cancel("user-1"), &mut uow).await.unwrap_err();
        assert_eq!(err.kind(), crate::domain::subscription::ErrorKind::Infrastructure);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Events
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn events_from_command_reach_every_subscriber_in_order() {
        let (_, mut uow) = setup();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = MessageBus::new();
        bus.register(
            CommandKind::CancelSubscription,
            Arc::new(WritingHandler { raise_event: true }),
        );
        bus.subscribe(SUBSCRIPTION_ACTIVATED, recorder(&seen, "first", false));
        bus.subscribe(SUBSCRIPTION_ACTIVATED, recorder(&seen, "second", false));

        bus.handle(cancel("user-1"), &mut uow).await.unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                "first:subscription.activated".to_string(),
                "second:subscription.activated".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn failing_event_handler_is_isolated() {
        let (storage, mut uow) = setup();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = MessageBus::new();
        bus.register(
            CommandKind::CancelSubscription,
            Arc::new(WritingHandler { raise_event: true }),
        );
        bus.subscribe(SUBSCRIPTION_ACTIVATED, recorder(&seen, "broken", true));
        bus.subscribe(SUBSCRIPTION_ACTIVATED, recorder(&seen, "healthy", false));

        let results = bus.handle(cancel("user-1"), &mut uow).await.unwrap();

        assert_eq!(results.len(), 1);
        assert!(results[0].success);
        assert_eq!(seen.lock().unwrap().len(), 2);
        // The command's own writes stay committed.
        assert_eq!(storage.subscriptions().await.len(), 1);
    }

    #[tokio::test]
    async fn event_cascade_is_dispatched_once_and_terminates() {
        let (storage, mut uow) = setup();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = MessageBus::new();
        bus.register(
            CommandKind::CancelSubscription,
            Arc::new(WritingHandler { raise_event: true }),
        );
        bus.subscribe(SUBSCRIPTION_ACTIVATED, Arc::new(CascadingEventHandler));
        bus.subscribe(PAYMENT_FAILED, recorder(&seen, "notify", false));

        bus.handle(cancel("user-1"), &mut uow).await.unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["notify:subscription.payment_failed".to_string()]
        );
        assert_eq!(storage.payments().await.len(), 1);
        assert!(uow.collect_new_events().is_empty());
    }

    #[tokio::test]
    async fn events_without_subscribers_are_dropped() {
        let (_, mut uow) = setup();
        let mut bus = MessageBus::new();
        bus.register(
            CommandKind::CancelSubscription,
            Arc::new(WritingHandler { raise_event: true }),
        );

        let results = bus.handle(cancel("user-1"), &mut uow).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn event_handler_writes_are_rolled_back_on_failure() {
        struct WriteThenFail;

        #[async_trait]
        impl EventHandler for WriteThenFail {
            async fn handle(
                &self,
                _event: &SubscriptionEvent,
                uow: &UnitOfWork,
            ) -> Result<(), SubscriptionError> {
                let mut plan = basic();
                plan.name = PlanName::Premium;
                uow.plans()?.add(&plan).await?;
                Err(SubscriptionError::infrastructure("nope"))
            }

            fn name(&self) -> &'static str {
                "WriteThenFail"
            }
        }

        let (storage, mut uow) = setup();
        let mut bus = MessageBus::new();
        bus.register(
            CommandKind::CancelSubscription,
            Arc::new(WritingHandler { raise_event: true }),
        );
        bus.subscribe(SUBSCRIPTION_ACTIVATED, Arc::new(WriteThenFail));

        bus.handle(cancel("user-1"), &mut uow).await.unwrap();

        let names: Vec<_> = storage.plans().await.iter().map(|p| p.name).collect();
        assert_eq!(names, vec![PlanName::Basic]);
    }
    #[tokio::test]
    async fn events_from_an_event_handler_whose_commit_fails_are_not_dispatched() {
        /// Raises a follow-up event, then makes storage refuse the commit.
        struct CascadeWithRefusedCommit {
            storage: Arc<InMemoryStorage>,
        }

        #[async_trait]
        impl EventHandler for CascadeWithRefusedCommit {
            async fn handle(
                &self,
                event: &SubscriptionEvent,
                uow: &UnitOfWork,
            ) -> Result<(), SubscriptionError> {
                CascadingEventHandler.handle(event, uow).await?;
                self.storage.set_fail_commits(true);
                Ok(())
            }

            fn name(&self) -> &'static str {
                "CascadeWithRefusedCommit"
            }
        }

        let (storage, mut uow) = setup();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = MessageBus::new();
        bus.register(
            CommandKind::CancelSubscription,
            Arc::new(WritingHandler { raise_event: true }),
        );
        bus.subscribe(
            SUBSCRIPTION_ACTIVATED,
            Arc::new(CascadeWithRefusedCommit {
                storage: storage.clone(),
            }),
        );
        bus.subscribe(PAYMENT_FAILED, recorder(&seen, "alert", false));

        let results = bus.handle(cancel("user-1"), &mut uow).await.unwrap();

        assert!(results[0].success);
        assert!(seen.lock().unwrap().is_empty());
        assert!(storage.payments().await.is_empty());
        assert!(uow.collect_new_events().is_empty());
    }
}
