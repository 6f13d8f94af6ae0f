//! Board routes: listings, detail views, edits, lifecycle and members.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use domains::{BoardId, BoardPatch, NewBoard, NewTask, PrincipalId};
use serde::Deserialize;
use serde_json::json;
use services::board_service::BOARD_UPDATED;
use services::lifecycle::{BOARD_CLOSED, BOARD_REOPENED};

use super::Success;
use crate::error::ApiError;
use crate::extract::{parse_json, require_xhr, CurrentPrincipal};
use crate::state::AppState;

pub const BOARD_DELETED: &str = "Board deleted successfully.";

#[derive(Debug, Deserialize)]
pub struct MemberRequest {
    pub principal_id: PrincipalId,
}

/// GET /boards: open boards the caller can see.
pub async fn list_boards(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<impl IntoResponse, ApiError> {
    let boards = state
        .services
        .boards
        .list_visible(&principal, Some(false))
        .await
        .map_err(ApiError::view)?;
    Ok(Success::new(json!({ "boards": boards })))
}

/// GET /boards/archive
pub async fn list_archived(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<impl IntoResponse, ApiError> {
    let boards = state.services.boards.list_archived(&principal).await.map_err(ApiError::view)?;
    Ok(Success::new(json!({ "boards": boards })))
}

/// GET /allBoards: superusers only.
pub async fn list_all(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<impl IntoResponse, ApiError> {
    let boards = state.services.boards.list_all(&principal).await.map_err(ApiError::view)?;
    Ok(Success::new(json!({ "boards": boards })))
}

/// POST /addBoard
pub async fn create_board(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let input: NewBoard = parse_json(&body)?;
    let board = state.services.boards.create(&principal, input).await.map_err(ApiError::mutation)?;
    Ok((StatusCode::CREATED, Success::new(json!({ "board": board }))))
}

/// GET /boards/{id}
pub async fn board_detail(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<BoardId>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state.services.boards.detail(&principal, id, false).await.map_err(ApiError::view)?;
    Ok(Success::new(detail))
}

/// GET /boards/{id}/backlog
pub async fn board_backlog(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<BoardId>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state.services.boards.detail(&principal, id, true).await.map_err(ApiError::view)?;
    Ok(Success::new(detail))
}

/// POST /boards/{id}/update (XHR, `boardTitle`/`boardDescription`)
pub async fn update_board(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<BoardId>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    require_xhr(&headers)?;
    let patch: BoardPatch = parse_json(&body)?;
    let board = state
        .services
        .boards
        .update(&principal, id, patch)
        .await
        .map_err(ApiError::mutation)?;
    Ok(Success::new(json!({ "message": BOARD_UPDATED, "board": board })))
}

/// POST /boards/{id}/delete
pub async fn delete_board(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<BoardId>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.boards.delete(&principal, id).await.map_err(ApiError::bounce)?;
    Ok(Success::new(json!({ "message": BOARD_DELETED, "redirect": "/boards" })))
}

/// POST /boards/{id}/close
pub async fn close_board(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<BoardId>,
) -> Result<impl IntoResponse, ApiError> {
    let transition = state.services.lifecycle.close(&principal, id).await.map_err(ApiError::mutation)?;
    Ok(Success::new(json!({
        "message": BOARD_CLOSED,
        "board": transition.board,
        "completed_tasks": transition.completed_tasks,
    })))
}

/// POST /boards/{id}/open
pub async fn open_board(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<BoardId>,
) -> Result<impl IntoResponse, ApiError> {
    let transition = state.services.lifecycle.reopen(&principal, id).await.map_err(ApiError::mutation)?;
    Ok(Success::new(json!({ "message": BOARD_REOPENED, "board": transition.board })))
}

/// POST /boards/{id}/members
pub async fn grant_member(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<BoardId>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request: MemberRequest = parse_json(&body)?;
    let board = state
        .services
        .boards
        .grant_access(&principal, id, request.principal_id)
        .await
        .map_err(ApiError::mutation)?;
    Ok(Success::new(json!({ "board": board })))
}

/// DELETE /boards/{id}/members/{principal_id}
pub async fn revoke_member(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path((id, member)): Path<(BoardId, PrincipalId)>,
) -> Result<impl IntoResponse, ApiError> {
    let board = state
        .services
        .boards
        .revoke_access(&principal, id, member)
        .await
        .map_err(ApiError::mutation)?;
    Ok(Success::new(json!({ "board": board })))
}

/// POST /boards/{id}/addTask
pub async fn add_task(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<BoardId>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let input: NewTask = parse_json(&body)?;
    let task = state.services.tasks.create(&principal, id, input).await.map_err(ApiError::mutation)?;
    Ok((StatusCode::CREATED, Success::new(json!({ "task": task }))))
}
