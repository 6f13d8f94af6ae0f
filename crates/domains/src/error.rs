//! # DomainError
//!
//! Failures raised by entity constructors and by persistence ports.
//! A "no" from the access rules is never an error; see [`crate::access`].

use thiserror::Error;

/// The primary error type for all domain operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Referenced Board, Task or Principal does not exist
    #[error("{entity} not found with ID {id}")]
    NotFound { entity: &'static str, id: String },

    /// Entity invariant broken (e.g. empty board title, unknown status code)
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Task write refused because its board is archived
    #[error("board {0} is archived")]
    BoardArchived(String),

    /// Infrastructure failure surfaced through a port (e.g. DB down)
    #[error("storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// A specialized Result type for domain logic.
pub type Result<T> = std::result::Result<T, DomainError>;
