//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                   - Liveness check
//! GET  /health/ready                             - Readiness check (storage reachable)
//!
//! # Admin (any role reads, admin/super_admin writes)
//! GET  /orders/return-requests                   - List requests (?status=&page=&limit=)
//! GET  /orders/return-requests/counts            - Requests per status
//! POST /orders/{order_id}/return-request/initiate
//! POST /orders/{order_id}/return-request/approve - {adminComment, refundAmount?}
//! POST /orders/{order_id}/return-request/reject  - {adminComment}
//! POST /orders/{order_id}/return-request/complete
//!
//! # Customer
//! GET  /orders/my-return-requests                - Own requests
//! POST /orders/{order_id}/return-request         - Multipart submission
//! POST /orders/{order_id}/return-request/cancel
//!
//! # Either
//! GET  /orders/{order_id}/return-request         - Single request
//! GET  /uploads/...                              - Evidence images
//! ```

pub mod returns;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::get,
};
use tower_http::services::ServeDir;

use crate::state::AppState;

/// Build the application router with its state applied.
///
/// Tracing, timeout, and Sentry layers are added by the binary.
pub fn app(state: AppState) -> Router {
    let body_limit = state.config().max_upload_body();
    let uploads = ServeDir::new(state.images().root());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(returns::router())
        .nest_service("/uploads", uploads)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the return store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
