//! Plan catalog: the set of plans a deployment offers.
//!
//! The built-in catalog matches the launch pricing. Operators can replace it
//! with a YAML document of the form:
//!
//! ```yaml
//! plans:
//!   - name: basic
//!     price: "6000.00"
//!     payment_cycle: monthly
//!     duration_days: 30
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::foundation::ValidationError;

use super::{PaymentCycle, PlanName, SubscriptionPlan};

/// Errors raised while reading a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read plan catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse plan catalog: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid plan in catalog: {0}")]
    Invalid(#[from] ValidationError),

    #[error("Plan '{0}' is listed more than once")]
    Duplicate(PlanName),
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSpec {
    pub name: PlanName,
    pub price: Decimal,
    #[serde(default)]
    pub payment_cycle: PaymentCycle,
    #[serde(default = "default_duration_days")]
    pub duration_days: u32,
}

fn default_duration_days() -> u32 {
    30
}

impl PlanSpec {
    /// Builds a plan with a fresh id from this entry.
    pub fn to_plan(&self) -> Result<SubscriptionPlan, ValidationError> {
        SubscriptionPlan::new(self.name, self.price, self.payment_cycle, self.duration_days)
    }
}

/// Ordered list of plan entries, unique by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanCatalog {
    pub plans: Vec<PlanSpec>,
}

impl PlanCatalog {
    /// Parses and validates a YAML catalog.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, CatalogError> {
        let catalog: PlanCatalog = serde_yaml::from_str(yaml)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Reads a YAML catalog from disk.
    pub fn from_path(path: impl AsRef<std::path::Path>) -> Result<Self, CatalogError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Checks every entry builds a valid plan and names are unique.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = Vec::with_capacity(self.plans.len());
        for spec in &self.plans {
            if seen.contains(&spec.name) {
                return Err(CatalogError::Duplicate(spec.name));
            }
            seen.push(spec.name);
            spec.to_plan()?;
        }
        Ok(())
    }
}

impl Default for PlanCatalog {
    fn default() -> Self {
        let monthly = |name, price| PlanSpec {
            name,
            price,
            payment_cycle: PaymentCycle::Monthly,
            duration_days: 30,
        };
        Self {
            plans: vec![
                monthly(PlanName::Basic, Decimal::new(600_000, 2)),
                monthly(PlanName::Standard, Decimal::new(1_190_000, 2)),
                monthly(PlanName::Premium, Decimal::new(1_490_000, 2)),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    #[test]
    fn default_catalog_has_three_monthly_plans() {
        let catalog = PlanCatalog::default();
        let prices: Vec<_> = catalog.plans.iter().map(|p| (p.name, p.price)).collect();
        assert_eq!(
            prices,
            vec![
                (PlanName::Basic, dec!(6000.00)),
                (PlanName::Standard, dec!(11900.00)),
                (PlanName::Premium, dec!(14900.00)),
            ]
        );
        assert!(catalog.plans.iter().all(|p| p.duration_days == 30));
        assert!(catalog.validate().is_ok());
    }

    #[test]
    fn parses_yaml_with_defaults() {
        let yaml = r#"
plans:
  - name: basic
    price: "10.00"
  - name: premium
    price: "120.00"
    payment_cycle: yearly
    duration_days: 365
"#;
        let catalog = PlanCatalog::from_yaml_str(yaml).unwrap();
        assert_eq!(catalog.plans.len(), 2);
        assert_eq!(catalog.plans[0].payment_cycle, PaymentCycle::Monthly);
        assert_eq!(catalog.plans[0].duration_days, 30);
        assert_eq!(catalog.plans[1].duration_days, 365);
    }

    #[test]
    fn rejects_duplicate_names() {
        let yaml = r#"
plans:
  - name: basic
    price: "10.00"
  - name: basic
    price: "12.00"
"#;
        assert!(matches!(
            PlanCatalog::from_yaml_str(yaml),
            Err(CatalogError::Duplicate(PlanName::Basic))
        ));
    }

    #[test]
    fn rejects_zero_duration() {
        let yaml = r#"
plans:
  - name: basic
    price: "10.00"
    duration_days: 0
"#;
        assert!(matches!(
            PlanCatalog::from_yaml_str(yaml),
            Err(CatalogError::Invalid(_))
        ));
    }

    #[test]
    fn rejects_unknown_plan_name() {
        let yaml = "plans:\n  - name: gold\n    price: \"1.00\"\n";
        assert!(matches!(
            PlanCatalog::from_yaml_str(yaml),
            Err(CatalogError::Parse(_))
        ));
    }

    #[test]
    fn reads_catalog_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "plans:\n  - name: standard\n    price: \"50.00\"").unwrap();

        let catalog = PlanCatalog::from_path(file.path()).unwrap();
        assert_eq!(catalog.plans[0].name, PlanName::Standard);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = PlanCatalog::from_path(dir.path().join("absent.yaml"));
        assert!(matches!(result, Err(CatalogError::Io(_))));
    }
}
