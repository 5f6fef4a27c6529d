use axum::{
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use brochure_core::contact::ContactForm;
use brochure_core::rate_limit::LimitCategory;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_sessions::Session;
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::middleware::auth::Admin;
use crate::middleware::client_ip::ClientIp;
use crate::middleware::csrf::verify_csrf;
use crate::middleware::extract::ApiForm;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/contact", post(submit))
        .route("/contact/messages", get(list_messages))
}

#[derive(Debug, Deserialize)]
struct ContactSubmission {
    #[serde(flatten)]
    form: ContactForm,
    csrf_token: Option<String>,
}

async fn submit(
    State(state): State<AppState>,
    ClientIp(client): ClientIp,
    session: Session,
    headers: HeaderMap,
    ApiForm(submission): ApiForm<ContactSubmission>,
) -> ApiResult<Json<Value>> {
    if let Err(retry) = state.limiter().check(LimitCategory::Contact, &client) {
        warn!(client = %client, "contact form rate limited");
        return Err(ApiError::RateLimited(retry.0));
    }
    verify_csrf(&state, &session, &headers, submission.csrf_token.as_deref(), None).await?;

    state.contact().submit(submission.form).await?;
    Ok(Json(json!({ "success": true })))
}

async fn list_messages(State(state): State<AppState>, Admin(_): Admin) -> ApiResult<Json<Value>> {
    let messages = state.contact().list().await?;
    Ok(Json(json!({ "total": messages.len(), "items": messages })))
}
