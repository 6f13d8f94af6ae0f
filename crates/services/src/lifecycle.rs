//! Board Lifecycle Controller: close and reopen, gated at editor level.

use domains::{Board, BoardId, BoardRepository, Capability, Principal};
use serde::Serialize;

use crate::error::Result;
use crate::guard::Guard;
use crate::{load_board, SharedStore};

pub const BOARD_CLOSED: &str = "Board closed successfully.";
pub const BOARD_REOPENED: &str = "Board reopened successfully.";

#[derive(Debug, Clone, Serialize)]
pub struct Transition {
    pub board: Board,
    /// Number of tasks the transition moved to `done`.
    pub completed_tasks: usize,
}

#[derive(Clone)]
pub struct BoardLifecycle {
    store: SharedStore,
    guard: Guard,
}

impl BoardLifecycle {
    pub fn new(store: SharedStore, guard: Guard) -> Self {
        Self { store, guard }
    }

    /// Completes every open task and archives the board. The store commits
    /// both as one unit; closing an archived board changes nothing.
    pub async fn close(&self, principal: &Principal, id: BoardId) -> Result<Transition> {
        let board = load_board(self.store.as_ref(), id).await?;
        self.guard.require(principal, &board, Capability::ManageLifecycle)?;

        let outcome = self.store.close_board(id).await?;
        tracing::info!(
            principal = %principal.id,
            board = %id,
            completed = outcome.completed.len(),
            already_archived = outcome.was_archived,
            "board closed"
        );

        Ok(Transition {
            board: load_board(self.store.as_ref(), id).await?,
            completed_tasks: outcome.completed.len(),
        })
    }

    /// Clears the archived flag. Task statuses stay as `close` left them.
    pub async fn reopen(&self, principal: &Principal, id: BoardId) -> Result<Transition> {
        let board = load_board(self.store.as_ref(), id).await?;
        self.guard.require(principal, &board, Capability::ManageLifecycle)?;

        let was_archived = self.store.reopen_board(id).await?;
        tracing::info!(principal = %principal.id, board = %id, was_archived, "board reopened");

        Ok(Transition {
            board: load_board(self.store.as_ref(), id).await?,
            completed_tasks: 0,
        })
    }
}
