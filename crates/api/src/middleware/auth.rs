//! Bearer-token admin gate.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};
use brochure_core::auth::{AdminIdentity, Claims, TokenKind};
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// Token from `Authorization: Bearer <token>`, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
}

/// Verified access-token claims of the caller. Any role.
pub fn access_claims(state: &AppState, headers: &HeaderMap) -> Result<Claims, ApiError> {
    let token = bearer_token(headers)
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;
    state.tokens().verify(&token, TokenKind::Access).map_err(|e| {
        debug!(error = %e, "bearer token rejected");
        ApiError::from(e)
    })
}

/// The caller must present a valid administrator access token.
pub fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<AdminIdentity, ApiError> {
    let claims = access_claims(state, headers)?;
    Ok(AdminIdentity::from_claims(&claims)?)
}

/// Extractor for admin-only handlers: 401 without a valid token, 403 for
/// non-admin roles.
#[derive(Debug, Clone)]
pub struct Admin(pub AdminIdentity);

impl FromRequestParts<AppState> for Admin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        require_admin(state, &parts.headers).map(Admin)
    }
}
