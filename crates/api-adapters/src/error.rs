//! Maps service outcomes onto HTTP responses.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use services::ServiceError;
use thiserror::Error;

pub const INVALID_JSON: &str = "Invalid JSON format";
pub const INVALID_REQUEST: &str = "Invalid request.";
pub const CANNOT_UPDATE_TASK: &str = "Cannot update task.";

const BOARD_LIST: &str = "/boards";

/// Where the failing request came from. A denied read renders the
/// forbidden view; a denied mutation is rejected outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    View,
    /// Task pages and board deletion bounce back to the board list, with
    /// the denial message in `warning`.
    Bounce,
    Mutation,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("login required")]
    LoginRequired { location: String },

    #[error("{error}")]
    Service { error: ServiceError, surface: Surface },
}

impl ApiError {
    pub fn view(error: ServiceError) -> Self {
        Self::Service { error, surface: Surface::View }
    }

    pub fn bounce(error: ServiceError) -> Self {
        Self::Service { error, surface: Surface::Bounce }
    }

    pub fn mutation(error: ServiceError) -> Self {
        Self::Service { error, surface: Surface::Mutation }
    }

    pub fn malformed(message: &str) -> Self {
        Self::mutation(ServiceError::MalformedRequest(message.to_string()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (error, surface) = match self {
            ApiError::LoginRequired { location } => return see_other(&location),
            ApiError::Service { error, surface } => (error, surface),
        };

        match error {
            ServiceError::AuthenticationRequired => (
                StatusCode::UNAUTHORIZED,
                Json(json!({"success": false, "error": error.to_string()})),
            )
                .into_response(),
            ServiceError::AuthorizationDenied(msg) => {
                tracing::info!(error = %msg, ?surface, "request denied");
                match surface {
                    Surface::View => {
                        Json(json!({"success": false, "view": "forbidden", "error": msg})).into_response()
                    }
                    Surface::Bounce => see_other(&with_query(BOARD_LIST, "warning", &msg)),
                    Surface::Mutation => {
                        (StatusCode::FORBIDDEN, Json(json!({"success": false, "error": msg}))).into_response()
                    }
                }
            }
            ServiceError::ArchivedConflict(msg) => (
                StatusCode::CONFLICT,
                Json(json!({"success": false, "message": CANNOT_UPDATE_TASK, "error": msg})),
            )
                .into_response(),
            ServiceError::MalformedRequest(msg) => {
                tracing::warn!(error = %msg, "malformed request");
                (StatusCode::BAD_REQUEST, Json(json!({"success": false, "error": msg}))).into_response()
            }
            ServiceError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, Json(json!({"success": false, "error": msg}))).into_response()
            }
            ServiceError::InvariantViolation(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({"success": false, "error": msg})),
            )
                .into_response(),
            ServiceError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"success": false, "error": "Internal server error"})),
                )
                    .into_response()
            }
        }
    }
}

/// Appends one percent-encoded query pair to `base`.
pub(crate) fn with_query(base: &str, key: &str, value: &str) -> String {
    match serde_urlencoded::to_string([(key, value)]) {
        Ok(pair) => format!("{base}?{pair}"),
        Err(err) => {
            tracing::warn!(error = %err, "could not encode redirect query");
            base.to_string()
        }
    }
}

fn see_other(location: &str) -> Response {
    (StatusCode::SEE_OTHER, [(header::LOCATION, location.to_string())]).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denied_status_depends_on_surface() {
        let denied = || ServiceError::AuthorizationDenied("no".into());
        assert_eq!(ApiError::view(denied()).into_response().status(), StatusCode::OK);
        assert_eq!(ApiError::mutation(denied()).into_response().status(), StatusCode::FORBIDDEN);

        let bounced = ApiError::bounce(denied()).into_response();
        assert_eq!(bounced.status(), StatusCode::SEE_OTHER);
        assert_eq!(bounced.headers()[header::LOCATION], "/boards?warning=no");
    }

    #[test]
    fn bounce_carries_the_denial_message() {
        let denied = ServiceError::AuthorizationDenied(services::error::DENIED_BOARD_ADMIN.into());
        let resp = ApiError::bounce(denied).into_response();
        assert_eq!(
            resp.headers()[header::LOCATION],
            "/boards?warning=Not+enough+privileges.+Please+contact+board+administrator."
        );
    }

    #[test]
    fn query_values_are_encoded() {
        assert_eq!(with_query("/login", "next", "/boards?a=1&b=2"), "/login?next=%2Fboards%3Fa%3D1%26b%3D2");
    }

    #[test]
    fn remaining_errors_map_to_fixed_statuses() {
        let cases = [
            (ServiceError::ArchivedConflict("x".into()), StatusCode::CONFLICT),
            (ServiceError::MalformedRequest(INVALID_JSON.into()), StatusCode::BAD_REQUEST),
            (ServiceError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ServiceError::InvariantViolation("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (ServiceError::Internal("db down".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::mutation(error).into_response().status(), status);
        }
    }

    #[test]
    fn login_required_redirects() {
        let resp = ApiError::LoginRequired { location: "/login?next=%2Fboards".into() }.into_response();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[header::LOCATION], "/login?next=%2Fboards");
    }
}
