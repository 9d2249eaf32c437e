//! Simulated payment gateway.
//!
//! Approves every charge unless an outcome has been scripted. Supports:
//! - Scripted outcomes, consumed in order
//! - Call tracking for assertions
//!
//! The renewal worker runs against this gateway until a real processor is
//! wired in.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::foundation::{PaymentId, UserId};
use crate::ports::{ChargeReceipt, ChargeRequest, PaymentError, PaymentGateway};

/// Payment gateway that never leaves the process.
///
/// # Example
///
/// ```ignore
/// let gateway = SimulatedPaymentGateway::new();
///
/// // First charge hits a network blip, second is declined.
/// gateway.push_outcome(Err(PaymentError::network("connection reset")));
/// gateway.push_outcome(Err(PaymentError::card_declined("do not honor")));
///
/// assert_eq!(gateway.charge_count(), 0);
/// ```
#[derive(Clone, Default)]
pub struct SimulatedPaymentGateway {
    inner: Arc<Mutex<GatewayState>>,
}

#[derive(Default)]
struct GatewayState {
    /// Outcomes to return before falling back to approval.
    script: VecDeque<Result<(), PaymentError>>,

    /// Error returned on every call once the script is empty.
    persistent_error: Option<PaymentError>,

    /// Every charge attempted, in order.
    charges: Vec<RecordedCharge>,

    next_reference: u64,
}

/// Recorded charge for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCharge {
    pub payment_id: PaymentId,
    pub user_id: UserId,
    pub amount: Decimal,
}

impl SimulatedPaymentGateway {
    /// Create a gateway that approves everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a gateway that fails every charge with `error`.
    pub fn always_failing(error: PaymentError) -> Self {
        let gateway = Self::new();
        gateway.state().persistent_error = Some(error);
        gateway
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Queue the outcome of the next unscripted charge.
    pub fn push_outcome(&self, outcome: Result<(), PaymentError>) {
        self.state().script.push_back(outcome);
    }

    /// Fail every charge after the script runs out. `None` restores approval.
    pub fn set_persistent_error(&self, error: Option<PaymentError>) {
        self.state().persistent_error = error;
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Assertion Helpers
    // ════════════════════════════════════════════════════════════════════════════

    pub fn charges(&self) -> Vec<RecordedCharge> {
        self.state().charges.clone()
    }

    pub fn charge_count(&self) -> usize {
        self.state().charges.len()
    }

    fn state(&self) -> MutexGuard<'_, GatewayState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl PaymentGateway for SimulatedPaymentGateway {
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeReceipt, PaymentError> {
        let mut state = self.state();
        state.charges.push(RecordedCharge {
            payment_id: request.payment_id,
            user_id: request.user_id.clone(),
            amount: request.amount,
        });

        let outcome = match state.script.pop_front() {
            Some(outcome) => outcome,
            None => match &state.persistent_error {
                Some(error) => Err(error.clone()),
                None => Ok(()),
            },
        };

        outcome?;
        state.next_reference += 1;
        Ok(ChargeReceipt {
            reference: format!("sim_{:08}", state.next_reference),
        })
    }
}
