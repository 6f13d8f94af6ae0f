//! # storage-adapters
//!
//! Persistence layer implementations of the `domains` store ports.
//!
//! - [`memory::MemoryStore`]: always compiled; the default backend and the
//!   one the test suites run against.
//! - [`sqlite::SqliteStore`]: behind the `db-sqlite` feature.

pub mod memory;

#[cfg(feature = "db-sqlite")]
pub mod sqlite;

pub use memory::MemoryStore;

#[cfg(feature = "db-sqlite")]
pub use sqlite::SqliteStore;
