//! # ServiceError
//!
//! The outcomes a request handler has to tell apart. None of them is a
//! server fault except `Internal`.

use domains::DomainError;
use thiserror::Error;

pub const DENIED_BOARD_VIEW: &str = "You are not allowed to see this board.";
pub const DENIED_BOARD_ADMIN: &str = "Not enough privileges. Please contact board administrator.";
pub const DENIED_TASK_EDIT: &str =
    "You don't have permissions to edit tasks. Please contact board administrator.";
pub const DENIED_TASK_VIEW: &str = "That task does not exist or you are not allowed to see it.";
pub const DENIED_ALL_BOARDS: &str = "Only superusers can list every board.";
pub const ARCHIVED_TASK: &str = "You cannot update tasks in archived boards.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// No principal could be resolved for the request.
    #[error("authentication required")]
    AuthenticationRequired,

    /// Principal resolved but lacks the capability.
    #[error("{0}")]
    AuthorizationDenied(String),

    /// The board is archived; re-authorization will not help.
    #[error("{0}")]
    ArchivedConflict(String),

    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvariantViolation(String),

    #[error("internal service error: {0}")]
    Internal(String),
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { .. } => ServiceError::NotFound(err.to_string()),
            DomainError::InvariantViolation(msg) => ServiceError::InvariantViolation(msg),
            DomainError::BoardArchived(board) => {
                tracing::info!(%board, "task write lost to a board close");
                ServiceError::ArchivedConflict(ARCHIVED_TASK.to_string())
            }
            DomainError::Storage(msg) => {
                tracing::error!(error = %msg, "storage failure");
                ServiceError::Internal(msg)
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
