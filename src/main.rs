//! Renewal worker.
//!
//! Seeds the plan catalog, then renews expired subscriptions on the
//! configured interval until Ctrl-C.

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use subscription_billing::adapters::{InMemoryStorage, LoggingNotifier, SimulatedPaymentGateway};
use subscription_billing::application::{
    build_message_bus, PaymentProcessor, PlanSeeder, RenewalScheduler,
};
use subscription_billing::config::{AppConfig, LoggingConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.logging);
    config.validate()?;

    tracing::info!(
        currency = %config.billing.currency,
        max_attempts = config.billing.payment_max_attempts,
        "Starting subscription billing"
    );

    let storage = Arc::new(InMemoryStorage::new());
    let catalog = config.plans.catalog()?;
    let seeded = PlanSeeder::new(storage.clone()).seed(&catalog).await?;
    tracing::info!(created = ?seeded.created, skipped = ?seeded.skipped, "Plans ready");

    let gateway = Arc::new(SimulatedPaymentGateway::new());
    let processor = Arc::new(PaymentProcessor::new(gateway, config.billing.retry_policy()));
    let notifier = Arc::new(LoggingNotifier::new(config.notifications.from_address.clone()));
    let bus = Arc::new(build_message_bus(
        processor,
        notifier,
        config.notifications.billing_alerts_address.clone(),
        config.billing.currency.clone(),
    ));

    if !config.scheduler.enabled {
        tracing::warn!("Renewal scheduler disabled, nothing to do");
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = RenewalScheduler::new(storage, bus);
    let interval = config.scheduler.interval();
    let run_on_startup = config.scheduler.run_on_startup;
    let worker = tokio::spawn(async move {
        scheduler.run(shutdown_rx, interval, run_on_startup).await;
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    shutdown_tx.send(true)?;
    worker.await?;

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| logging.level.clone().into());
    let registry = tracing_subscriber::registry().with(filter);

    if logging.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
