//! Commands and messages carried by the bus.
//!
//! Commands are plain values: the intent and its raw inputs. Parsing and
//! validation happen in the handler so that failures surface as
//! `SubscriptionError`s inside the transaction.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::subscription::SubscriptionEvent;

/// Raw payment details as received at the boundary.
///
/// `method_type` defaults to credit card when omitted. The card number and
/// CVC stay wrapped in secrets and are only exposed to card validation.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentDetails {
    #[serde(default)]
    pub method_type: Option<String>,
    pub card_number: SecretString,
    pub expiration_date: String,
    pub cvc: SecretString,
}

impl PaymentDetails {
    pub fn card(
        card_number: impl Into<String>,
        expiration_date: impl Into<String>,
        cvc: impl Into<String>,
    ) -> Self {
        Self {
            method_type: None,
            card_number: SecretString::new(card_number.into()),
            expiration_date: expiration_date.into(),
            cvc: SecretString::new(cvc.into()),
        }
    }
}

/// An intent to change subscription state. Routed to exactly one handler.
#[derive(Debug, Clone)]
pub enum Command {
    CreateSubscription {
        user_id: String,
        plan_name: String,
        payment_details: PaymentDetails,
    },
    CancelSubscription {
        user_id: String,
    },
    RenewSubscription {
        user_id: String,
    },
    ChangeSubscriptionPlan {
        user_id: String,
        new_plan_name: String,
    },
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::CreateSubscription { .. } => CommandKind::CreateSubscription,
            Command::CancelSubscription { .. } => CommandKind::CancelSubscription,
            Command::RenewSubscription { .. } => CommandKind::RenewSubscription,
            Command::ChangeSubscriptionPlan { .. } => CommandKind::ChangeSubscriptionPlan,
        }
    }

    /// The raw user id every command carries.
    pub fn user_id(&self) -> &str {
        match self {
            Command::CreateSubscription { user_id, .. }
            | Command::CancelSubscription { user_id }
            | Command::RenewSubscription { user_id }
            | Command::ChangeSubscriptionPlan { user_id, .. } => user_id,
        }
    }
}

/// Routing key for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    CreateSubscription,
    CancelSubscription,
    RenewSubscription,
    ChangeSubscriptionPlan,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CommandKind::CreateSubscription => "CreateSubscription",
            CommandKind::CancelSubscription => "CancelSubscription",
            CommandKind::RenewSubscription => "RenewSubscription",
            CommandKind::ChangeSubscriptionPlan => "ChangeSubscriptionPlan",
        };
        write!(f, "{}", s)
    }
}

/// Anything the bus can queue.
#[derive(Debug, Clone)]
pub enum Message {
    Command(Command),
    Event(SubscriptionEvent),
}

impl From<Command> for Message {
    fn from(command: Command) -> Self {
        Message::Command(command)
    }
}

impl From<SubscriptionEvent> for Message {
    fn from(event: SubscriptionEvent) -> Self {
        Message::Event(event)
    }
}

/// Outcome reported to the caller of a command.
///
/// `success == false` is a handled business outcome (e.g. a declined
/// payment), not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,
    pub message: String,
}

impl CommandResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn payment_details_deserialize_with_default_method() {
        let json = r#"{
            "card_number": "4242-4242-4242-4242",
            "expiration_date": "12/30",
            "cvc": "123"
        }"#;
        let details: PaymentDetails = serde_json::from_str(json).unwrap();

        assert!(details.method_type.is_none());
        assert_eq!(details.card_number.expose_secret(), "4242-4242-4242-4242");
    }

    #[test]
    fn payment_details_debug_redacts_secrets() {
        let details = PaymentDetails::card("4242-4242-4242-4242", "12/30", "987");
        let debug = format!("{:?}", details);

        assert!(!debug.contains("4242-4242"));
        assert!(!debug.contains("987"));
        assert!(debug.contains("12/30"));
    }

    #[test]
    fn command_kind_matches_variant() {
        let cmd = Command::ChangeSubscriptionPlan {
            user_id: "user-1".to_string(),
            new_plan_name: "premium".to_string(),
        };
        assert_eq!(cmd.kind(), CommandKind::ChangeSubscriptionPlan);
        assert_eq!(cmd.kind().to_string(), "ChangeSubscriptionPlan");
        assert_eq!(cmd.user_id(), "user-1");
    }

    #[test]
    fn command_result_serializes_to_contract_shape() {
        let json = serde_json::to_value(CommandResult::failed("nope")).unwrap();
        assert_eq!(json, serde_json::json!({ "success": false, "message": "nope" }));
    }
}
