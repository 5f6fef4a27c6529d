pub mod auth;
pub mod contact;
pub mod content;
pub mod csrf;
pub mod health;
pub mod templates;
pub mod upload;

use axum::Router;
use tower_http::services::ServeDir;

use crate::error::ApiError;
use crate::state::AppState;

/// Assemble the full router with all route groups.
pub fn build_router(state: AppState) -> Router {
    let config = state.config();
    let mut router = Router::new()
        .merge(health::routes())
        .merge(content::routes())
        .merge(templates::routes())
        .merge(upload::routes(config.upload_max_bytes))
        .merge(contact::routes())
        .merge(auth::routes())
        .merge(csrf::routes());

    let base_url = config.upload_base_url.trim_end_matches('/');
    if base_url.starts_with('/') && base_url.len() > 1 {
        router = router.nest_service(base_url, ServeDir::new(&config.upload_dir));
    }

    router
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(not_found)
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Not found".to_string())
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
