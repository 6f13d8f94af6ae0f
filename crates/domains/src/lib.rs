//! taskboard/crates/domains/src/lib.rs
//!
//! The central domain logic and interface definitions for Taskboard:
//! entities, the access rules that gate them, and the ports that
//! adapters implement.

pub mod access;
pub mod error;
pub mod ids;
pub mod lifecycle;
pub mod models;
pub mod ports;
pub mod visibility;

// Re-exporting for easier access in other crates
pub use access::*;
pub use error::*;
pub use ids::*;
pub use lifecycle::{BoardState, CloseOutcome};
pub use models::*;
pub use ports::*;
pub use visibility::*;
