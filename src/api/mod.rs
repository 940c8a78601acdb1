pub mod auth;
pub mod error;
pub mod health;
pub mod metrics;
pub mod models;
pub mod pagination;
pub mod review;

#[cfg(test)]
pub mod test_utils;

// Re-exports
pub use models::*;

use axum::{Router, middleware, routing::get};
use tower_http::trace::TraceLayer;

/// Full HTTP surface: review routes at the root, probes under `/health`,
/// Prometheus scrape at `/metrics`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(review::routes())
        .nest("/health", health::routes())
        .route("/metrics", get(metrics::export))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            metrics::track_requests,
        ))
        .layer(middleware::from_fn_with_state(
            state.classifier,
            error::error_boundary,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
