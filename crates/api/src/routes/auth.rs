//! `/auth`: administrator login, token refresh and token validation.

use axum::{
    extract::State,
    http::HeaderMap,
    routing::get,
    Json, Router,
};
use brochure_core::auth::{AccountInfo, TokenKind, TokenPair};
use brochure_core::rate_limit::LimitCategory;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::middleware::auth::access_claims;
use crate::middleware::client_ip::ClientIp;
use crate::middleware::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/auth", get(validate).post(login_or_refresh))
}

#[derive(Debug, Default, Deserialize)]
struct AuthQuery {
    action: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: String,
}

#[derive(Debug, Serialize)]
struct SessionResponse {
    success: bool,
    #[serde(flatten)]
    tokens: TokenPair,
    user: AccountInfo,
}

async fn login_or_refresh(
    State(state): State<AppState>,
    ClientIp(client): ClientIp,
    ApiQuery(query): ApiQuery<AuthQuery>,
    ApiJson(body): ApiJson<Map<String, Value>>,
) -> ApiResult<Json<SessionResponse>> {
    let response = match query.action.as_deref() {
        Some("login") => login(&state, &client, parse(body)?).await?,
        Some("refresh") => refresh(&state, parse(body)?)?,
        Some(other) => return Err(ApiError::BadRequest(format!("unknown action '{other}'"))),
        None => return Err(ApiError::BadRequest("action is required".to_string())),
    };
    Ok(Json(response))
}

async fn login(state: &AppState, client: &str, request: LoginRequest) -> ApiResult<SessionResponse> {
    if let Err(retry) = state.limiter().check(LimitCategory::Login, client) {
        warn!(client, "login rate limited");
        return Err(ApiError::RateLimited(retry.0));
    }
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(ApiError::BadRequest("email and password are required".to_string()));
    }

    // argon2 verification is CPU-bound.
    let accounts = state.accounts();
    let user = tokio::task::spawn_blocking(move || {
        accounts.authenticate(&request.email, &request.password)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("login task failed: {e}")))??;

    let tokens = state.tokens().issue_pair(&user.email, &user.role)?;
    Ok(SessionResponse {
        success: true,
        tokens,
        user,
    })
}

fn refresh(state: &AppState, request: RefreshRequest) -> ApiResult<SessionResponse> {
    let claims = state.tokens().verify(&request.refresh_token, TokenKind::Refresh)?;
    let user = state
        .accounts()
        .find(&claims.sub)
        .ok_or_else(|| ApiError::Unauthorized("Account no longer exists".to_string()))?;

    let tokens = state.tokens().issue_pair(&user.email, &user.role)?;
    info!(email = %user.email, "tokens refreshed");
    Ok(SessionResponse {
        success: true,
        tokens,
        user,
    })
}

async fn validate(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<AuthQuery>,
) -> ApiResult<Json<Value>> {
    match query.action.as_deref() {
        Some("validate") => {}
        Some(other) => return Err(ApiError::BadRequest(format!("unknown action '{other}'"))),
        None => return Err(ApiError::BadRequest("action is required".to_string())),
    }

    let claims = access_claims(&state, &headers)?;
    Ok(Json(json!({
        "valid": true,
        "role": claims.role,
        "email": claims.sub,
        "expiresAt": claims.exp,
    })))
}

fn parse<T: serde::de::DeserializeOwned>(body: Map<String, Value>) -> ApiResult<T> {
    serde_json::from_value(Value::Object(body))
        .map_err(|e| ApiError::BadRequest(format!("invalid request body: {e}")))
}
