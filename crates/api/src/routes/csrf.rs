use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_sessions::cookie::{Cookie, SameSite};
use tower_sessions::Session;

use crate::error::{ApiError, ApiResult};
use crate::middleware::csrf::issue_csrf;
use crate::state::AppState;

/// Cookie that mirrors the session's CSRF token for scripts.
pub const CSRF_COOKIE: &str = "XSRF-TOKEN";

pub fn routes() -> Router<AppState> {
    Router::new().route("/csrf", get(csrf_token))
}

/// Hand out the session's CSRF token, in the body and as a cookie.
async fn csrf_token(State(state): State<AppState>, session: Session) -> ApiResult<Response> {
    let token = issue_csrf(&state, &session).await?;

    let cookie = Cookie::build((CSRF_COOKIE, token.token.clone()))
        .path("/")
        .same_site(SameSite::Lax)
        .secure(state.config().secure_cookies)
        .build();
    let cookie = HeaderValue::from_str(&cookie.to_string())
        .map_err(|e| ApiError::Internal(format!("invalid CSRF cookie: {e}")))?;

    let mut response = Json(json!({
        "success": true,
        "csrfToken": token.token,
        "expiresAt": token.expires_at,
    }))
    .into_response();
    response.headers_mut().append(header::SET_COOKIE, cookie);
    Ok(response)
}
