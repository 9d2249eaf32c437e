//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `storage` - Transactional storage (in-memory)
//! - `payment` - Payment gateways (simulated)
//! - `notification` - Notifiers (log, in-memory)

pub mod notification;
pub mod payment;
pub mod storage;

pub use notification::{InMemoryNotifier, LoggingNotifier};
pub use payment::{RecordedCharge, SimulatedPaymentGateway};
pub use storage::InMemoryStorage;
