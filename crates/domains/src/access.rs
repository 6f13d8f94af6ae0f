//! # Access rules
//!
//! Pure decisions over already-loaded entities. Nothing here performs I/O
//! and nothing here fails: every check answers with a `bool` or a
//! [`Decision`].
//!
//! Two tiers exist on every board:
//! - *administrators*: the owner and any superuser. They may delete the
//!   board, edit its title and manage its allowed list.
//! - *editors*: administrators plus every allowed principal. They may view
//!   the board, edit and delete its tasks, and close or reopen it.
//!
//! Task mutations are additionally refused while the board is archived,
//! reported as [`Decision::Archived`] rather than [`Decision::Denied`].

use serde::Serialize;

use crate::models::{Board, Principal, Task};

/// What a request handler wants to do with a board or one of its tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    View,
    EditTask,
    DeleteTask,
    /// Close and reopen.
    ManageLifecycle,
    /// Delete the board, edit its details, manage the allowed list.
    Administer,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::View => "view",
            Capability::EditTask => "edit_task",
            Capability::DeleteTask => "delete_task",
            Capability::ManageLifecycle => "manage_lifecycle",
            Capability::Administer => "administer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allowed,
    Denied,
    /// Authorized, but the board is archived and the capability mutates tasks.
    Archived,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Allowed => "allowed",
            Decision::Denied => "denied",
            Decision::Archived => "archived",
        }
    }
}

/// Superuser, owner, or explicitly allowed.
pub fn can_view(principal: &Principal, board: &Board) -> bool {
    principal.is_superuser || board.is_owned_by(&principal.id) || board.is_allowed(&principal.id)
}

/// Task visibility follows its board. A task paired with a board it does
/// not belong to is never visible.
pub fn can_view_task(principal: &Principal, task: &Task, board: &Board) -> bool {
    task.board_id == board.id && can_view(principal, board)
}

/// Superuser or owner.
pub fn can_edit_board(principal: &Principal, board: &Board) -> bool {
    principal.is_superuser || board.is_owned_by(&principal.id)
}

pub fn can_administer_board(principal: &Principal, board: &Board) -> bool {
    can_edit_board(principal, board)
}

pub fn can_edit_task(principal: &Principal, task: &Task, board: &Board) -> bool {
    task_decision(principal, task, board).is_allowed()
}

/// Same rule as [`can_edit_task`], archived boards included.
pub fn can_delete_task(principal: &Principal, task: &Task, board: &Board) -> bool {
    can_edit_task(principal, task, board)
}

/// Editor-level gate for close/reopen.
pub fn can_manage_lifecycle(principal: &Principal, board: &Board) -> bool {
    can_view(principal, board)
}

/// Outcome of a task mutation check. Authorization is evaluated first, so
/// a principal without access learns nothing about the archived state.
pub fn task_decision(principal: &Principal, task: &Task, board: &Board) -> Decision {
    if !can_view_task(principal, task, board) {
        Decision::Denied
    } else if board.is_archived {
        Decision::Archived
    } else {
        Decision::Allowed
    }
}

/// Board-level decision for a declared capability. Task capabilities are
/// evaluated against the board alone, which is what task creation-style
/// and route-level guards need.
pub fn decide(principal: &Principal, board: &Board, capability: Capability) -> Decision {
    let permitted = match capability {
        Capability::View | Capability::EditTask | Capability::DeleteTask => {
            can_view(principal, board)
        }
        Capability::ManageLifecycle => can_manage_lifecycle(principal, board),
        Capability::Administer => can_administer_board(principal, board),
    };

    let decision = if !permitted {
        Decision::Denied
    } else if board.is_archived
        && matches!(capability, Capability::EditTask | Capability::DeleteTask)
    {
        Decision::Archived
    } else {
        Decision::Allowed
    };

    tracing::debug!(
        principal = %principal.id,
        board = %board.id,
        capability = capability.as_str(),
        decision = decision.as_str(),
        "access decision"
    );
    decision
}
