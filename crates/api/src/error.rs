use std::time::Duration;

use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::{FormRejection, JsonRejection, QueryRejection},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use brochure_core::auth::AuthError;
use brochure_core::document::validate::{FieldError, ValidationErrors};
use brochure_core::store::StoreError;
use brochure_core::upload::UploadError;
use brochure_core::CmsError;
use serde_json::json;

/// Internal failure detail, attached to 500 responses for the debug layer.
#[derive(Debug, Clone)]
pub struct InternalDetail(pub String);

/// API error type that maps to `{success: false, error}` JSON responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Validation(ValidationErrors),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("rate limited, retry in {0:?}")]
    RateLimited(Duration),

    #[error(transparent)]
    Storage(StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, fields): (StatusCode, String, Option<&[FieldError]>) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "Validation failed".to_string(),
                Some(errors.errors.as_slice()),
            ),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone(), None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone(), None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
            ApiError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                "Method not allowed".to_string(),
                None,
            ),
            ApiError::RateLimited(_) => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests, try again later".to_string(),
                None,
            ),
            ApiError::Storage(err) => {
                tracing::error!("Storage error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Storage unavailable".to_string(),
                    None,
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = match fields {
            Some(fields) => json!({ "success": false, "error": message, "fields": fields }),
            None => json!({ "success": false, "error": message }),
        };
        let mut response = (status, Json(body)).into_response();

        match self {
            ApiError::RateLimited(retry) => {
                let secs = retry.as_secs().max(1);
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(secs));
            }
            ApiError::Storage(err) => {
                response.extensions_mut().insert(InternalDetail(err.to_string()));
            }
            ApiError::Internal(msg) => {
                response.extensions_mut().insert(InternalDetail(msg));
            }
            _ => {}
        }
        response
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(err: ValidationErrors) -> Self {
        ApiError::Validation(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Storage(err)
    }
}

impl From<CmsError> for ApiError {
    fn from(err: CmsError) -> Self {
        match err {
            CmsError::Validation(errors) => ApiError::Validation(errors),
            CmsError::NotFound(what) => ApiError::NotFound(format!("{what} not found")),
            CmsError::Storage(err) => ApiError::Storage(err),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ApiError::Unauthorized("Invalid email or password".to_string()),
            AuthError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            AuthError::InvalidToken | AuthError::WrongTokenKind => {
                ApiError::Unauthorized("Invalid token".to_string())
            }
            AuthError::Forbidden => ApiError::Forbidden("Administrator role required".to_string()),
            AuthError::Crypto(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Storage(io) => ApiError::Internal(format!("asset storage failed: {io}")),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::BadRequest("file too large".to_string())
        } else {
            ApiError::BadRequest(err.body_text())
        }
    }
}

impl From<tower_sessions::session::Error> for ApiError {
    fn from(err: tower_sessions::session::Error) -> Self {
        ApiError::Internal(format!("session store failed: {err}"))
    }
}

/// Convenience type alias for route handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        let cases = [
            (ApiError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (ApiError::from(AuthError::Forbidden), StatusCode::FORBIDDEN),
            (ApiError::from(CmsError::NotFound("page 'x'".into())), StatusCode::NOT_FOUND),
            (ApiError::MethodNotAllowed, StatusCode::METHOD_NOT_ALLOWED),
            (
                ApiError::from(UploadError::UnsafeSvgContent("script".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(StoreError::Unavailable("down".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn rate_limited_sets_retry_after() {
        let response = ApiError::RateLimited(Duration::from_secs(42)).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }

    #[test]
    fn internal_failures_carry_detail_for_the_debug_layer() {
        let response = ApiError::Storage(StoreError::Unavailable("connection refused".into())).into_response();
        let detail = response.extensions().get::<InternalDetail>().unwrap();
        assert!(detail.0.contains("connection refused"));
    }
}
