//! Proration for mid-period plan changes.
//!
//! `amount = (daily_rate(new) - daily_rate(current)) * remaining_days`,
//! rounded to cents. A negative amount is a credit and is returned as such.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::subscription::SubscriptionPlan;

/// Result of prorating a plan change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Proration {
    pub remaining_days: i64,
    pub amount: Decimal,
}

impl Proration {
    /// True when the user owes money for the change.
    pub fn is_charge(&self) -> bool {
        self.amount > Decimal::ZERO
    }
}

/// Prorated difference for switching from `current` to `new` with
/// `remaining_days` left in the period.
///
/// Each side is computed as `price * days / duration` so whole-cent inputs
/// stay exact before the final rounding.
pub fn prorate(current: &SubscriptionPlan, new: &SubscriptionPlan, remaining_days: i64) -> Proration {
    let days = Decimal::from(remaining_days);
    let charge = new.price * days / Decimal::from(new.duration_days);
    let credit = current.price * days / Decimal::from(current.duration_days);
    Proration {
        remaining_days,
        amount: (charge - credit).round_dp(2),
    }
}
