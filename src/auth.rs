use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header, errors::ErrorKind, jwk::JwkSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{config::AppConfig, error::ApiError};

/// AuthError
///
/// Carries an HTTP status code and a short description for any credential or
/// permission failure. The top-level response mapping renders it verbatim as
/// `{"success": false, "error": <status>, "message": <description>}`; it is
/// never converted into another error along the way.
#[derive(Debug, Clone, Error)]
#[error("{description}")]
pub struct AuthError {
    pub status: StatusCode,
    pub description: String,
}

impl AuthError {
    pub fn new(status: StatusCode, description: &str) -> Self {
        Self {
            status,
            description: description.to_string(),
        }
    }

    /// No `Authorization` header on the request.
    pub fn missing_header() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "missing header")
    }

    /// Malformed header, unknown signing key, or an undecodable token.
    pub fn invalid_header() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "invalid header")
    }

    /// Signature checked out but the token is past its expiry.
    pub fn token_expired() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "token expired")
    }

    /// Audience or issuer did not match the configured values.
    pub fn invalid_claims() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "invalid claims")
    }

    /// Verified token whose payload carries no `permissions` field at all.
    pub fn permissions_missing() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid claims")
    }

    /// Verified token lacking the specific permission for the operation.
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::FORBIDDEN, "unauthorized")
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::Auth(self).into_response()
    }
}

/// Claims
///
/// The decoded, verified payload of a bearer token. `permissions` stays
/// optional so a token that omits the field entirely can be told apart from
/// one carrying an empty list; the guard treats the two differently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): identifier of the credential's principal.
    pub sub: String,
    /// Expiration Time (exp): timestamp after which the token is rejected.
    pub exp: usize,
    /// Scope strings granted to the credential, e.g. "post:drinks".
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
}

/// require_permission
///
/// The authorization guard. Protected handlers call this with the scope they
/// need before touching the store.
///
/// - 400 "invalid claims" when the verified token has no `permissions` field.
/// - 403 "unauthorized" when the field exists but lacks the required scope.
pub fn require_permission(permission: &str, claims: &Claims) -> Result<(), AuthError> {
    let granted = claims
        .permissions
        .as_ref()
        .ok_or_else(AuthError::permissions_missing)?;
    if !granted.iter().any(|p| p == permission) {
        return Err(AuthError::unauthorized());
    }
    Ok(())
}

/// TokenVerifier
///
/// Abstract contract for turning a raw bearer token into verified claims.
/// The production implementation (`JwksVerifier`) talks to the configured
/// issuer; tests substitute a mock behind the same trait object, mirroring
/// how the repository is swapped out.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError>;
}

/// VerifierState
///
/// The concrete type used to share the verifier across the application state.
pub type VerifierState = Arc<dyn TokenVerifier>;

/// JwksVerifier
///
/// Verifies RS256-signed bearer tokens against the issuer's published JWKS.
/// The key set is fetched per verification: the issuer stays the single
/// source of truth and the process holds no mutable key cache.
pub struct JwksVerifier {
    http: reqwest::Client,
    jwks_url: String,
    issuer: String,
    audience: String,
}

impl JwksVerifier {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            jwks_url: config.jwks_url(),
            issuer: config.auth_issuer.clone(),
            audience: config.auth_audience.clone(),
        }
    }

    async fn fetch_keys(&self) -> Result<JwkSet, AuthError> {
        let response = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                tracing::error!("JWKS fetch from {} failed: {}", self.jwks_url, e);
                AuthError::invalid_header()
            })?;

        response.json::<JwkSet>().await.map_err(|e| {
            tracing::error!("JWKS payload from {} undecodable: {}", self.jwks_url, e);
            AuthError::invalid_header()
        })
    }
}

#[async_trait]
impl TokenVerifier for JwksVerifier {
    /// verify
    ///
    /// 1. Reads the token header and its key identifier (`kid`).
    /// 2. Fetches the issuer's key set and selects the matching key.
    /// 3. Decodes the token, validating signature, expiry, audience, and issuer.
    ///
    /// Failure mapping: expired signature → "token expired"; audience/issuer
    /// mismatch → "invalid claims"; everything else → "invalid header".
    async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let header = decode_header(token).map_err(|_| AuthError::invalid_header())?;
        let kid = header.kid.ok_or_else(AuthError::invalid_header)?;

        let jwks = self.fetch_keys().await?;
        let jwk = jwks.find(&kid).ok_or_else(AuthError::invalid_header)?;
        let key = DecodingKey::from_jwk(jwk).map_err(|_| AuthError::invalid_header())?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_issuer(&[self.issuer.as_str()]);

        let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::token_expired(),
            ErrorKind::InvalidAudience | ErrorKind::InvalidIssuer => AuthError::invalid_claims(),
            _ => AuthError::invalid_header(),
        })?;

        Ok(token_data.claims)
    }
}

/// BearerClaims
///
/// Extractor used by every protected handler. Implements Axum's
/// FromRequestParts trait, so a handler that lists `BearerClaims` as an
/// argument only runs once the bearer credential has been parsed out of the
/// `Authorization` header and verified; any failure rejects the request with
/// the corresponding `AuthError` before the handler body executes.
#[derive(Debug)]
pub struct BearerClaims(pub Claims);

impl<S> FromRequestParts<S> for BearerClaims
where
    S: Send + Sync,
    // Allows the extractor to pull the shared verifier from the app state.
    VerifierState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = VerifierState::from_ref(state);
        let token = bearer_token(&parts.headers)?;
        let claims = verifier.verify(token).await?;
        Ok(BearerClaims(claims))
    }
}

/// bearer_token
///
/// Splits `Bearer <token>` out of the `Authorization` header. The header must
/// consist of exactly two whitespace-separated parts with a case-insensitive
/// "Bearer" scheme.
fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let raw = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(AuthError::missing_header)?;
    let value = raw.to_str().map_err(|_| AuthError::invalid_header())?;

    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(AuthError::invalid_header()),
    }
}
