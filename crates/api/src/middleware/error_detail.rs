use axum::body::{to_bytes, Body};
use axum::http::header;
use axum::response::Response;
use serde_json::Value;

use crate::error::InternalDetail;

const MAX_ERROR_BODY: usize = 64 * 1024;

/// Debug mode only: copy the logged failure detail into the 500 body as
/// `detail`.
pub async fn attach_error_detail(response: Response) -> Response {
    let Some(InternalDetail(detail)) = response.extensions().get::<InternalDetail>().cloned() else {
        return response;
    };

    let (mut parts, body) = response.into_parts();
    let mut value = match to_bytes(body, MAX_ERROR_BODY).await {
        Ok(bytes) => serde_json::from_slice::<Value>(&bytes).unwrap_or(Value::Null),
        Err(_) => Value::Null,
    };
    if !value.is_object() {
        value = serde_json::json!({ "success": false, "error": "An internal error occurred" });
    }
    if let Some(map) = value.as_object_mut() {
        map.insert("detail".to_string(), Value::String(detail));
    }

    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(value.to_string()))
}
