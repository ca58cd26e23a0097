use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue};
use axum::routing::get;
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Headroom over the configured package size, so the size limit a client
/// runs into is the exchange's 413, not the framework's body cap.
const BODY_LIMIT_SLACK: usize = 64 * 1024;

/// Request body cap while no package size is configured; uploads are
/// refused with a diagnostic before the body matters.
const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Build the axum router with the exchange endpoints.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state
        .exchange
        .as_ref()
        .and_then(|e| e.max_upload_size())
        .map(|max| max as usize + BODY_LIMIT_SLACK)
        .unwrap_or(DEFAULT_BODY_LIMIT);

    Router::new()
        .route(
            "/",
            get(handler::exchange_get).post(handler::exchange_post),
        )
        .route("/v1/health", get(handler::health_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        // Pollers must never be answered from an intermediary cache.
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
