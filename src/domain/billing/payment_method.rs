//! Stored payment methods.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{Entity, PaymentMethodId, ValidationError};
use crate::domain::subscription::SubscriptionEvent;

use super::MaskedCard;

/// Kind of payment instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodType {
    #[default]
    CreditCard,
    BankTransfer,
    Point,
}

impl fmt::Display for PaymentMethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentMethodType::CreditCard => "credit_card",
            PaymentMethodType::BankTransfer => "bank_transfer",
            PaymentMethodType::Point => "point",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for PaymentMethodType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "credit_card" => Ok(PaymentMethodType::CreditCard),
            "bank_transfer" => Ok(PaymentMethodType::BankTransfer),
            "point" => Ok(PaymentMethodType::Point),
            other => Err(ValidationError::invalid_format(
                "method_type",
                format!("unsupported payment method '{}'", other),
            )),
        }
    }
}

/// A payment instrument on file.
///
/// `details` is an opaque blob. For cards it is a serialized [`MaskedCard`];
/// raw card numbers and CVCs are never stored here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: PaymentMethodId,
    pub method_type: PaymentMethodType,
    pub details: JsonValue,
}

impl PaymentMethod {
    /// Creates a card payment method from an already validated card.
    pub fn card(card: &MaskedCard) -> Self {
        Self {
            id: PaymentMethodId::new(),
            method_type: PaymentMethodType::CreditCard,
            details: serde_json::to_value(card).unwrap_or(JsonValue::Null),
        }
    }

    /// Creates a non-card payment method with empty details.
    pub fn without_details(method_type: PaymentMethodType) -> Self {
        Self {
            id: PaymentMethodId::new(),
            method_type,
            details: JsonValue::Object(Default::default()),
        }
    }

    /// Returns the masked card summary, if this is a card.
    pub fn masked_card(&self) -> Option<MaskedCard> {
        match self.method_type {
            PaymentMethodType::CreditCard => serde_json::from_value(self.details.clone()).ok(),
            _ => None,
        }
    }
}

impl PartialEq for PaymentMethod {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PaymentMethod {}

impl Entity for PaymentMethod {
    type Id = PaymentMethodId;
    type Event = SubscriptionEvent;

    fn id(&self) -> PaymentMethodId {
        self.id
    }

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

    fn masked() -> MaskedCard {
        MaskedCard {
            last4: "4242".to_string(),
            fingerprint: "ab".repeat(32),
            exp_month: 12,
            exp_year: 2030,
        }
    }

    #[test]
    fn card_details_round_trip_through_the_blob() {
        let method = PaymentMethod::card(&masked());
        assert_eq!(method.method_type, PaymentMethodType::CreditCard);
        assert_eq!(method.details["last4"], "4242");
        assert_eq!(method.masked_card(), Some(masked()));
    }

    #[test]
    fn non_card_methods_have_empty_details() {
        let method = PaymentMethod::without_details(PaymentMethodType::Point);
        assert_eq!(method.details, serde_json::json!({}));
        assert_eq!(method.masked_card(), None);
    }

    #[test]
    fn method_type_parses_wire_names() {
        assert_eq!(
            "bank_transfer".parse::<PaymentMethodType>().unwrap(),
            PaymentMethodType::BankTransfer
        );
        assert!("cheque".parse::<PaymentMethodType>().is_err());
    }

    #[test]
    fn default_method_type_is_credit_card() {
        assert_eq!(PaymentMethodType::default(), PaymentMethodType::CreditCard);
    }
}
