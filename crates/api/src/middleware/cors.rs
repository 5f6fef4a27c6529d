use axum::http::{header, HeaderName, Method};
use tower_http::cors::{Any, CorsLayer};

use super::csrf::CSRF_HEADER;
use crate::routes::upload::UPLOAD_TOKEN_HEADER;

/// Build the CORS layer. Admin requests carry bearer tokens rather than
/// cookies, so any origin may call the API.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(CSRF_HEADER),
            HeaderName::from_static(UPLOAD_TOKEN_HEADER),
        ])
        .expose_headers([header::RETRY_AFTER])
}
