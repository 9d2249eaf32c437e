//! Loads the plan catalog into storage.
//!
//! Seeding is idempotent: plans that already exist by name are left alone,
//! so operators can change prices in storage without the catalog undoing it.

use std::sync::Arc;

use crate::domain::subscription::{PlanCatalog, PlanName, SubscriptionError};
use crate::ports::{PlanRepository, Storage};

use super::unit_of_work::UnitOfWork;

/// What a seeding pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub created: Vec<PlanName>,
    pub skipped: Vec<PlanName>,
}

pub struct PlanSeeder {
    storage: Arc<dyn Storage>,
}

impl PlanSeeder {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Adds every catalog plan that is missing, in one transaction.
    pub async fn seed(&self, catalog: &PlanCatalog) -> Result<SeedReport, SubscriptionError> {
        let mut uow = UnitOfWork::new(self.storage.clone());
        uow.begin().await?;

        match Self::seed_within(&uow, catalog).await {
            Ok(report) => {
                uow.commit().await?;
                tracing::info!(
                    created = report.created.len(),
                    skipped = report.skipped.len(),
                    "Plan catalog seeded"
                );
                Ok(report)
            }
            Err(err) => {
                uow.rollback().await?;
                Err(err)
            }
        }
    }

    async fn seed_within(
        uow: &UnitOfWork,
        catalog: &PlanCatalog,
    ) -> Result<SeedReport, SubscriptionError> {
        let plans = uow.plans()?;
        let mut report = SeedReport::default();
        for spec in &catalog.plans {
            if plans.find_by_name(spec.name).await?.is_some() {
                report.skipped.push(spec.name);
                continue;
            }
            plans.add(&spec.to_plan()?).await?;
            report.created.push(spec.name);
        }
        Ok(report)
    }
}
