//! # api-adapters
//!
//! HTTP surface of the task board.
//!
//! # Developer Note
//! The router is behind the `web-axum` feature so other front ends can
//! reuse [`metrics`] without pulling in axum.

pub mod metrics;

#[cfg(feature = "web-axum")]
pub mod error;
#[cfg(feature = "web-axum")]
pub mod extract;
#[cfg(feature = "web-axum")]
pub mod handlers;
#[cfg(feature = "web-axum")]
pub mod state;

pub use metrics::AuthzMetrics;

#[cfg(feature = "web-axum")]
pub use error::{ApiError, Surface};
#[cfg(feature = "web-axum")]
pub use state::AppState;

#[cfg(feature = "web-axum")]
use axum::routing::{get, post, MethodRouter};
#[cfg(feature = "web-axum")]
use axum::Router;

/// Builds the complete router, request tracing and request ids included.
#[cfg(feature = "web-axum")]
pub fn router(state: AppState) -> Router {
    use handlers::{boards, tasks};
    use tower::ServiceBuilder;
    use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
    use tower_http::trace::TraceLayer;

    Router::new()
        // Listings and views
        .route("/boards", get(boards::list_boards))
        .route("/boards/archive", get(boards::list_archived))
        .route("/allBoards", get(boards::list_all))
        .route("/boards/{id}", get(boards::board_detail))
        .route("/boards/{id}/backlog", get(boards::board_backlog))
        .route("/task/{id}", get(tasks::task_detail))
        // Board mutations
        .route("/addBoard", mutation(post(boards::create_board)))
        .route("/boards/{id}/update", mutation(post(boards::update_board)))
        .route("/boards/{id}/delete", mutation(post(boards::delete_board)))
        .route("/boards/{id}/close", mutation(post(boards::close_board)))
        .route("/boards/{id}/open", mutation(post(boards::open_board)))
        .route("/boards/{id}/members", mutation(post(boards::grant_member)))
        .route(
            "/boards/{id}/members/{principal_id}",
            mutation(axum::routing::delete(boards::revoke_member)),
        )
        .route("/boards/{id}/addTask", mutation(post(boards::add_task)))
        // Task mutations
        .route("/taskUpdate/{id}", mutation(post(tasks::update_task)))
        .route("/taskDelete/{id}", mutation(post(tasks::delete_task)))
        .route("/changeTaskStatus/{id}", mutation(post(tasks::change_status)))
        // Ambient
        .route("/healthz", get(handlers::healthz))
        .route("/metrics", get(handlers::metrics))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .with_state(state)
}

#[cfg(feature = "web-axum")]
fn mutation(route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.fallback(handlers::method_not_allowed)
}
