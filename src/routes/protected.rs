use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, patch, post},
};

/// Protected Router Module
///
/// Defines the routes that require a verified bearer credential carrying a
/// specific permission.
///
/// Access Control Strategy:
/// Every handler here takes the `BearerClaims` extractor, so the credential
/// is parsed and verified before the handler body runs, and then calls
/// `require_permission` with the scope listed below before touching the
/// store. A failure at either step rejects the request with the originating
/// `AuthError` status and description.
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        // GET /drinks-detail          requires get:drinks-detail
        // The menu with full recipes, including ingredient proportions.
        .route("/drinks-detail", get(handlers::get_drinks_detail))
        // POST /drinks                requires post:drinks
        // Adds a drink; responds with the full long-form listing.
        .route("/drinks", post(handlers::create_drink))
        // PATCH/DELETE /drinks/{id}   require patch:drinks / delete:drinks
        // Recipe replacement and removal of a single drink.
        .route(
            "/drinks/{id}",
            patch(handlers::update_drink).delete(handlers::delete_drink),
        )
}
