//! Storage Adapters
//!
//! Implementations of the `Storage` port.
//!
//! ## Available Adapters
//!
//! - **InMemoryStorage** - Transactional tables in memory (testing/development)
//!
//! ## Usage
//!
//! ```ignore
//! use adapters::storage::InMemoryStorage;
//!
//! let storage = Arc::new(InMemoryStorage::new());
//! let mut uow = UnitOfWork::new(storage.clone());
//! ```

mod in_memory;

pub use in_memory::InMemoryStorage;
