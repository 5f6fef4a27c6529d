//! HTTP surface of the brochure site CMS.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::Router;
use tower_sessions::cookie::time::Duration;
use tower_sessions::cookie::SameSite;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

pub use state::AppState;

/// Idle time after which a session (and its CSRF token) is dropped.
const SESSION_IDLE_HOURS: i64 = 24;

/// The complete application: routes plus session, tracing and CORS layers.
pub fn app(state: AppState) -> Router {
    let config = state.config().clone();

    let mut router = routes::build_router(state);
    if config.debug {
        router = router.layer(axum::middleware::map_response(
            middleware::error_detail::attach_error_detail,
        ));
    }

    let sessions = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(config.secure_cookies)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(Duration::hours(SESSION_IDLE_HOURS)));

    router
        .layer(sessions)
        .layer(middleware::request_tracing::trace_layer())
        .layer(middleware::cors::cors_layer())
}
