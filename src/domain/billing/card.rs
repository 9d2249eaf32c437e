//! Card validation and masking.
//!
//! Raw card data never leaves this module: callers get back a [`MaskedCard`]
//! holding the last four digits, a SHA-256 fingerprint and the expiry.

use chrono::NaiveDate;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::foundation::ValidationError;

/// Length of the card number as entered, separators included.
pub const CARD_NUMBER_LENGTH: usize = 19;

/// Returns true when the digits of `number` pass the Luhn checksum.
///
/// Non-digit characters are ignored.
pub fn luhn_valid(number: &str) -> bool {
    let digits: Vec<u32> = number.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.is_empty() {
        return false;
    }
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

/// Card expiry month, parsed from `MM/YY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardExpiry {
    pub month: u32,
    pub year: i32,
}

impl CardExpiry {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::invalid_format("expiration_date", "expected MM/YY");
        let (mm, yy) = input.trim().split_once('/').ok_or_else(invalid)?;
        if mm.len() != 2 || yy.len() != 2 {
            return Err(invalid());
        }
        let month: u32 = mm.parse().map_err(|_| invalid())?;
        let year: i32 = yy.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(ValidationError::out_of_range("expiration_date", 1, 12, month as i64));
        }
        Ok(Self {
            month,
            year: 2000 + year,
        })
    }

    /// Last calendar day on which the card is usable.
    pub fn last_day(&self) -> NaiveDate {
        let (next_year, next_month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .and_then(|first| first.pred_opt())
            .unwrap_or(NaiveDate::MIN)
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.last_day() < today
    }
}

/// Card summary safe to store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskedCard {
    pub last4: String,
    pub fingerprint: String,
    pub exp_month: u32,
    pub exp_year: i32,
}

/// Validates raw card input and reduces it to a [`MaskedCard`].
///
/// Checks, in order: number length and characters, Luhn checksum, expiry
/// (last day of the month must not be before `today`), CVC (3 to 4 digits).
pub fn validate_card(
    card_number: &SecretString,
    expiration_date: &str,
    cvc: &SecretString,
    today: NaiveDate,
) -> Result<MaskedCard, ValidationError> {
    let number = card_number.expose_secret();
    if number.chars().count() != CARD_NUMBER_LENGTH {
        return Err(ValidationError::invalid_format(
            "card_number",
            format!("must be {} characters including separators", CARD_NUMBER_LENGTH),
        ));
    }
    if !number
        .chars()
        .all(|c| c.is_ascii_digit() || c == '-' || c == ' ')
    {
        return Err(ValidationError::invalid_format(
            "card_number",
            "may only contain digits, spaces and dashes",
        ));
    }
    let digits: String = number.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 12 || !luhn_valid(&digits) {
        return Err(ValidationError::invalid_format("card_number", "Invalid card number"));
    }

    let expiry = CardExpiry::parse(expiration_date)?;
    if expiry.is_expired(today) {
        return Err(ValidationError::invalid_format(
            "expiration_date",
            "The card's expiration date has passed.",
        ));
    }

    let cvc = cvc.expose_secret();
    if !(3..=4).contains(&cvc.len()) || !cvc.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::invalid_format(
            "cvc",
            "CVC must be 3 or 4 digits.",
        ));
    }

    Ok(MaskedCard {
        last4: digits[digits.len() - 4..].to_string(),
        fingerprint: format!("{:x}", Sha256::digest(digits.as_bytes())),
        exp_month: expiry.month,
        exp_year: expiry.year,
    })
}
