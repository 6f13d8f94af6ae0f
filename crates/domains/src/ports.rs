//! # Ports
//!
//! Any adapter must implement these traits to be used by the binary.
//! The persistence layer owns transactional guarantees; the identity
//! provider owns credentials.

use async_trait::async_trait;
use thiserror::Error;

use crate::error::Result;
use crate::ids::{BoardId, PrincipalId, TaskId};
use crate::lifecycle::CloseOutcome;
use crate::models::{Board, Principal, Task};

/// Selection of boards for listing queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoardFilter {
    /// Restrict to boards owned by, or shared with, this principal.
    /// `None` selects every board.
    pub visible_to: Option<PrincipalId>,
    /// `None` selects boards in either state.
    pub archived: Option<bool>,
}

/// Board persistence. Deleting a board deletes its tasks.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait BoardRepository: Send + Sync {
    async fn insert_board(&self, board: &Board) -> Result<()>;
    async fn get_board(&self, id: BoardId) -> Result<Option<Board>>;
    /// Ordered by creation time.
    async fn list_boards(&self, filter: BoardFilter) -> Result<Vec<Board>>;
    /// Persists title and description only.
    async fn update_board_details(&self, board: &Board) -> Result<()>;
    /// Returns false when the board did not exist.
    async fn delete_board(&self, id: BoardId) -> Result<bool>;

    /// Returns false when the principal was already allowed.
    async fn grant_access(&self, board: BoardId, principal: PrincipalId) -> Result<bool>;
    /// Returns false when the principal was not allowed.
    async fn revoke_access(&self, board: BoardId, principal: PrincipalId) -> Result<bool>;

    /// Marks every unfinished task of the board `done` and archives the
    /// board, as one atomic unit.
    async fn close_board(&self, id: BoardId) -> Result<CloseOutcome>;
    /// Clears the archived flag. Returns the previous flag.
    async fn reopen_board(&self, id: BoardId) -> Result<bool>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn insert_task(&self, task: &Task) -> Result<()>;
    async fn get_task(&self, id: TaskId) -> Result<Option<Task>>;
    /// Ordered by creation time.
    async fn list_tasks(&self, board: BoardId) -> Result<Vec<Task>>;
    /// Fails with [`crate::DomainError::BoardArchived`] once the task's board is
    /// archived, checked in the same write.
    async fn update_task(&self, task: &Task) -> Result<()>;
    /// Same archived rule as `update_task`; `false` when the task is gone.
    async fn delete_task(&self, id: TaskId) -> Result<bool>;
}

/// Local copy of the principals the identity provider has vouched for.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PrincipalDirectory: Send + Sync {
    async fn upsert_principal(&self, principal: &Principal) -> Result<()>;
    async fn get_principal(&self, id: PrincipalId) -> Result<Option<Principal>>;
    /// Unknown ids are skipped; order follows `ids`.
    async fn get_principals(&self, ids: &[PrincipalId]) -> Result<Vec<Principal>>;
}

/// Convenience bound for stores implementing every persistence port.
pub trait Store: BoardRepository + TaskRepository + PrincipalDirectory {}

impl<T> Store for T where T: BoardRepository + TaskRepository + PrincipalDirectory {}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("no credentials supplied")]
    Missing,
    #[error("credentials expired")]
    Expired,
    #[error("invalid credentials: {0}")]
    Invalid(String),
}

/// Resolves a bearer credential into an authenticated principal.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait IdentityProvider: Send + Sync {
    fn authenticate(&self, credential: &str) -> std::result::Result<Principal, IdentityError>;
}
