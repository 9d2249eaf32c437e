//! Billing domain - payments, payment methods, card checks and proration.

mod card;
mod payment;
mod payment_method;
mod proration;

pub use card::{luhn_valid, validate_card, CardExpiry, MaskedCard, CARD_NUMBER_LENGTH};
pub use payment::{Payment, PaymentStatus};
pub use payment_method::{PaymentMethod, PaymentMethodType};
pub use proration::{prorate, Proration};
