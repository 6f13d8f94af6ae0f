use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use domains::{TaskId, TaskStatus, TaskUpdate};
use serde::Deserialize;
use serde_json::json;
use services::task_service::TASK_UPDATED;

use super::Success;
use crate::error::ApiError;
use crate::extract::{parse_json, require_xhr, CurrentPrincipal};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub new_status: TaskStatus,
}

/// GET /task/{id}: the task plus who it may be assigned to.
pub async fn task_detail(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<TaskId>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state.services.tasks.view(&principal, id).await.map_err(ApiError::bounce)?;
    Ok(Success::new(detail))
}

/// POST /taskUpdate/{id} (XHR, camelCase task fields)
pub async fn update_task(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<TaskId>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    require_xhr(&headers)?;
    let update: TaskUpdate = parse_json(&body)?;
    let task = state
        .services
        .tasks
        .update(&principal, id, update)
        .await
        .map_err(ApiError::mutation)?;
    Ok(Success::new(json!({ "message": TASK_UPDATED, "task": task })))
}

/// POST /taskDelete/{id}
pub async fn delete_task(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<TaskId>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state.services.tasks.delete(&principal, id).await.map_err(ApiError::mutation)?;
    Ok(Success::new(json!({ "message": deleted.message(), "board_id": deleted.board_id })))
}

/// POST /changeTaskStatus/{id}
pub async fn change_status(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<TaskId>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let change: StatusChange = parse_json(&body)?;
    let task = state
        .services
        .tasks
        .change_status(&principal, id, change.new_status)
        .await
        .map_err(ApiError::mutation)?;
    Ok(Success::new(json!({ "task": task })))
}
