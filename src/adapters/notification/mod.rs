//! Notifier adapters.
//!
//! - **LoggingNotifier** - writes notifications to the log (development)
//! - **InMemoryNotifier** - records notifications (testing)

mod in_memory;
mod logging;

pub use in_memory::InMemoryNotifier;
pub use logging::LoggingNotifier;
