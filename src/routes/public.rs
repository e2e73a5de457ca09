use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Defines endpoints that are **unauthenticated** and accessible to any
/// client. Everything served here is the short representation: the menu
/// without ingredient proportions.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // A simple, unauthenticated endpoint used for monitoring and load
        // balancer checks. Returns "ok" immediately.
        .route("/health", get(|| async { "ok" }))
        // GET /drinks
        // Lists the menu in its short form (no `parts`). Any Authorization
        // header on the request is ignored entirely.
        .route("/drinks", get(handlers::get_drinks))
}
