//! # Handlers
//!
//! Each handler resolves the caller, hands the explicit principal to a use
//! case and shapes the JSON answer. Guard calls happen inside the services.

pub mod boards;
pub mod tasks;

use axum::extract::State;
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::state::AppState;

/// `{"success": true, ...body}`
#[derive(Debug, Serialize)]
pub struct Success<T> {
    success: bool,
    #[serde(flatten)]
    body: T,
}

impl<T: Serialize> Success<T> {
    pub fn new(body: T) -> Json<Self> {
        Json(Self { success: true, body })
    }
}

/// Fallback for mutation routes hit with the wrong verb.
pub async fn method_not_allowed(method: Method) -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({"error": format!("{method} method is not allowed for this action")})),
    )
        .into_response()
}

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "application/openmetrics-text; version=1.0.0; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
