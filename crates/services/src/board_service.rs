//! Board use cases: create, list, view, edit, delete, and access-list
//! management.

use std::collections::BTreeMap;

use domains::{
    visible_listings, Board, BoardFilter, BoardId, BoardListing, BoardPatch, BoardRepository,
    Capability, NewBoard, Principal, PrincipalDirectory, PrincipalId, Task, TaskRepository,
    TaskStatus,
};
use serde::Serialize;

use crate::error::{Result, ServiceError, DENIED_ALL_BOARDS};
use crate::guard::Guard;
use crate::{load_board, SharedStore};

pub const BOARD_UPDATED: &str = "Board updated successfully.";

/// Which presentation of a board the caller should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardView {
    BoardDetail,
    BoardDetailArchive,
    BoardBacklog,
}

#[derive(Debug, Clone, Serialize)]
pub struct BoardDetail {
    pub board: Board,
    pub view: BoardView,
    pub tasks: Vec<Task>,
    /// The same tasks bucketed per status, every status present.
    pub tasks_by_status: BTreeMap<&'static str, Vec<Task>>,
    pub show_delete_button: bool,
}

#[derive(Clone)]
pub struct BoardService {
    store: SharedStore,
    guard: Guard,
}

impl BoardService {
    pub fn new(store: SharedStore, guard: Guard) -> Self {
        Self { store, guard }
    }

    /// The creator becomes the owner.
    pub async fn create(&self, principal: &Principal, input: NewBoard) -> Result<Board> {
        let board = Board::new(principal.id, input)?;
        self.store.insert_board(&board).await?;
        tracing::info!(principal = %principal.id, board = %board.id, title = %board.title, "board created");
        Ok(board)
    }

    /// Boards the principal owns or is allowed on; every board for a
    /// superuser. `archived` narrows to one lifecycle state.
    pub async fn list_visible(&self, principal: &Principal, archived: Option<bool>) -> Result<Vec<BoardListing>> {
        let filter = BoardFilter {
            visible_to: (!principal.is_superuser).then_some(principal.id),
            archived,
        };
        let boards = self.store.list_boards(filter).await?;
        Ok(visible_listings(principal, boards, archived))
    }

    pub async fn list_archived(&self, principal: &Principal) -> Result<Vec<BoardListing>> {
        self.list_visible(principal, Some(true)).await
    }

    /// Superuser-only listing of every board.
    pub async fn list_all(&self, principal: &Principal) -> Result<Vec<BoardListing>> {
        if !principal.is_superuser {
            tracing::info!(principal = %principal.id, "all-boards listing denied");
            return Err(ServiceError::AuthorizationDenied(DENIED_ALL_BOARDS.to_string()));
        }
        self.list_visible(principal, None).await
    }

    pub async fn detail(&self, principal: &Principal, id: BoardId, backlog: bool) -> Result<BoardDetail> {
        let board = load_board(self.store.as_ref(), id).await?;
        self.guard.require(principal, &board, Capability::View)?;

        let tasks = self.store.list_tasks(id).await?;
        let mut tasks_by_status: BTreeMap<&'static str, Vec<Task>> =
            TaskStatus::ALL.iter().map(|s| (s.as_str(), Vec::new())).collect();
        for task in &tasks {
            tasks_by_status.entry(task.status.as_str()).or_default().push(task.clone());
        }

        let view = match (backlog, board.is_archived) {
            (true, _) => BoardView::BoardBacklog,
            (false, true) => BoardView::BoardDetailArchive,
            (false, false) => BoardView::BoardDetail,
        };
        let show_delete_button = BoardListing::for_principal(principal, board.clone()).show_delete_button;

        Ok(BoardDetail {
            board,
            view,
            tasks,
            tasks_by_status,
            show_delete_button,
        })
    }

    /// Title/description edit; requires owner or superuser.
    pub async fn update(&self, principal: &Principal, id: BoardId, patch: BoardPatch) -> Result<Board> {
        let mut board = load_board(self.store.as_ref(), id).await?;
        self.guard.require(principal, &board, Capability::Administer)?;

        board.apply(patch)?;
        self.store.update_board_details(&board).await?;
        tracing::info!(principal = %principal.id, board = %id, "board updated");
        Ok(board)
    }

    /// Deletes the board and, through the store, all of its tasks.
    pub async fn delete(&self, principal: &Principal, id: BoardId) -> Result<()> {
        let board = load_board(self.store.as_ref(), id).await?;
        self.guard.require(principal, &board, Capability::Administer)?;

        if !self.store.delete_board(id).await? {
            return Err(domains::DomainError::not_found("Board", id).into());
        }
        tracing::info!(principal = %principal.id, board = %id, "board deleted");
        Ok(())
    }

    /// Adds `target` to the allowed list. The target must be a known principal.
    pub async fn grant_access(&self, principal: &Principal, id: BoardId, target: PrincipalId) -> Result<Board> {
        let board = load_board(self.store.as_ref(), id).await?;
        self.guard.require(principal, &board, Capability::Administer)?;

        if self.store.get_principal(target).await?.is_none() {
            return Err(domains::DomainError::not_found("Principal", target).into());
        }
        if board.is_owned_by(&target) {
            return Ok(board);
        }
        let added = self.store.grant_access(id, target).await?;
        tracing::info!(principal = %principal.id, board = %id, target = %target, added, "access granted");
        load_board(self.store.as_ref(), id).await
    }

    pub async fn revoke_access(&self, principal: &Principal, id: BoardId, target: PrincipalId) -> Result<Board> {
        let board = load_board(self.store.as_ref(), id).await?;
        self.guard.require(principal, &board, Capability::Administer)?;

        let removed = self.store.revoke_access(id, target).await?;
        tracing::info!(principal = %principal.id, board = %id, target = %target, removed, "access revoked");
        load_board(self.store.as_ref(), id).await
    }
}
