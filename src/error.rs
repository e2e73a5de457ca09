use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;

/// ApiError
///
/// The handler-level error taxonomy. Every variant renders the shared
/// `{"success": false, "error": <status>, "message": <text>}` envelope with
/// its own status code. `Auth` wraps an `AuthError` unmodified, so credential
/// failures keep their original status and description all the way out.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// Reference to a drink id that does not exist (404).
    #[error("resource not found")]
    NotFound,
    /// Malformed or constraint-violating write request (422).
    #[error("unprocessable")]
    Unprocessable,
    /// Generic failure on the update path (401). The create and delete paths
    /// map the same class of failure to 422 instead; the asymmetry is part of
    /// the API contract.
    #[error("unauthorized")]
    Unauthorized,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Auth(err) => err.status,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Unprocessable => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "success": false,
            "error": status.as_u16(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}
