//! Request extractors and body helpers.

use axum::body::Bytes;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use domains::{IdentityError, Principal};
use serde::de::DeserializeOwned;

use crate::error::{with_query, ApiError, INVALID_JSON, INVALID_REQUEST};
use crate::state::AppState;

/// The authenticated caller, resolved from `Authorization: Bearer <token>`.
///
/// Missing or unusable credentials redirect to the login page with the
/// requested path and query, percent-encoded, in `next`.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Principal);

impl FromRequestParts<AppState> for CurrentPrincipal {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let credential = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .unwrap_or_default();

        let principal = match state.identity.authenticate(credential) {
            Ok(principal) => principal,
            Err(err) => {
                if !matches!(err, IdentityError::Missing) {
                    tracing::info!(error = %err, path = %parts.uri.path(), "rejected credential");
                }
                let next = parts.uri.path_and_query().map_or("/", |pq| pq.as_str());
                return Err(ApiError::LoginRequired {
                    location: with_query(&state.login_url, "next", next),
                });
            }
        };

        state
            .services
            .register_principal(&principal)
            .await
            .map_err(ApiError::mutation)?;
        Ok(CurrentPrincipal(principal))
    }
}

/// JSON update endpoints only answer XHR calls.
pub fn require_xhr(headers: &HeaderMap) -> Result<(), ApiError> {
    let is_xhr = headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"));
    if is_xhr {
        Ok(())
    } else {
        Err(ApiError::malformed(INVALID_REQUEST))
    }
}

/// Parses a JSON body, rejecting anything unparsable with the generic
/// format error.
pub fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "unparsable request body");
        ApiError::malformed(INVALID_JSON)
    })
}
