//! Subscription plans.
//!
//! Plans are value-like: two plans with the same name are the same plan,
//! whatever their row id.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Entity, PlanId, ValidationError};

use super::SubscriptionEvent;

/// Upper bound for a single billing period.
const MAX_DURATION_DAYS: u32 = 3650;

/// Name of a subscription plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanName {
    Basic,
    Standard,
    Premium,
}

impl PlanName {
    /// Every plan name, cheapest tier first.
    pub const ALL: [PlanName; 3] = [PlanName::Basic, PlanName::Standard, PlanName::Premium];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanName::Basic => "basic",
            PlanName::Standard => "standard",
            PlanName::Premium => "premium",
        }
    }
}

impl fmt::Display for PlanName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PlanName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(PlanName::Basic),
            "standard" => Ok(PlanName::Standard),
            "premium" => Ok(PlanName::Premium),
            other => Err(ValidationError::invalid_format(
                "plan_name",
                format!("unknown plan '{}'", other),
            )),
        }
    }
}

/// How often a plan is billed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentCycle {
    #[default]
    Monthly,
    Yearly,
    Once,
}

impl fmt::Display for PaymentCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentCycle::Monthly => "monthly",
            PaymentCycle::Yearly => "yearly",
            PaymentCycle::Once => "once",
        };
        write!(f, "{}", s)
    }
}

/// A purchasable plan.
///
/// # Invariants
///
/// - `price >= 0`
/// - `1 <= duration_days <= 3650`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub id: PlanId,
    pub name: PlanName,
    pub price: Decimal,
    pub payment_cycle: PaymentCycle,
    pub duration_days: u32,
}

impl SubscriptionPlan {
    /// Creates a plan with a fresh id after validating price and duration.
    pub fn new(
        name: PlanName,
        price: Decimal,
        payment_cycle: PaymentCycle,
        duration_days: u32,
    ) -> Result<Self, ValidationError> {
        if price.is_sign_negative() && !price.is_zero() {
            return Err(ValidationError::invalid_format(
                "price",
                "price cannot be negative",
            ));
        }
        if duration_days == 0 || duration_days > MAX_DURATION_DAYS {
            return Err(ValidationError::out_of_range(
                "duration_days",
                1,
                MAX_DURATION_DAYS as i64,
                duration_days as i64,
            ));
        }
        Ok(Self {
            id: PlanId::new(),
            name,
            price,
            payment_cycle,
            duration_days,
        })
    }

    /// Price of one day of this plan, unrounded.
    pub fn daily_rate(&self) -> Decimal {
        self.price / Decimal::from(self.duration_days)
    }
}

impl PartialEq for SubscriptionPlan {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for SubscriptionPlan {}

impl Hash for SubscriptionPlan {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl Entity for SubscriptionPlan {
    type Id = PlanId;
    type Event = SubscriptionEvent;

    fn id(&self) -> PlanId {
        self.id
    }

    // Plans never raise events.
    fn pending_events(&self) -> &[SubscriptionEvent] {
        &[]
    }

    fn take_events(&mut self) -> Vec<SubscriptionEvent> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashSet;

    #[test]
    fn plan_name_parses_case_insensitively() {
        assert_eq!("Premium".parse::<PlanName>().unwrap(), PlanName::Premium);
        assert_eq!(" basic ".parse::<PlanName>().unwrap(), PlanName::Basic);
    }

    #[test]
    fn unknown_plan_name_is_rejected() {
        let err = "gold".parse::<PlanName>().unwrap_err();
        assert_eq!(err.field(), "plan_name");
    }

    #[test]
    fn plans_compare_by_name() {
        let a = SubscriptionPlan::new(PlanName::Basic, dec!(10.00), PaymentCycle::Monthly, 30).unwrap();
        let b = SubscriptionPlan::new(PlanName::Basic, dec!(99.00), PaymentCycle::Yearly, 365).unwrap();
        let c = SubscriptionPlan::new(PlanName::Premium, dec!(10.00), PaymentCycle::Monthly, 30).unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn zero_duration_is_rejected() {
        let result = SubscriptionPlan::new(PlanName::Basic, dec!(10.00), PaymentCycle::Monthly, 0);
        assert!(matches!(result, Err(ValidationError::OutOfRange { .. })));
    }

    #[test]
    fn negative_price_is_rejected() {
        let result = SubscriptionPlan::new(PlanName::Basic, dec!(-1.00), PaymentCycle::Monthly, 30);
        assert!(result.is_err());
    }

    #[test]
    fn free_plan_is_allowed() {
        assert!(SubscriptionPlan::new(PlanName::Basic, dec!(0), PaymentCycle::Once, 30).is_ok());
    }

    #[test]
    fn daily_rate_divides_price_by_duration() {
        let plan = SubscriptionPlan::new(PlanName::Standard, dec!(30.00), PaymentCycle::Monthly, 30).unwrap();
        assert_eq!(plan.daily_rate(), dec!(1));
    }

    #[test]
    fn payment_cycle_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&PaymentCycle::Yearly).unwrap(), "\"yearly\"");
    }
}
