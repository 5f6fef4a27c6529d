//! `/upload`: validated asset uploads.

use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use brochure_core::auth::{AdminIdentity, Role, TokenKind};
use brochure_core::upload::UploadedAsset;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_sessions::Session;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::middleware::auth::{require_admin, Admin};
use crate::middleware::csrf::{verify_csrf, CSRF_FIELD};
use crate::middleware::extract::ApiQuery;
use crate::state::AppState;

/// Carries a signed direct-upload token in place of bearer auth + CSRF.
pub const UPLOAD_TOKEN_HEADER: &str = "x-upload-token";

/// Room for multipart boundaries and the small text fields.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload))
        .route("/upload/sign", post(sign_upload))
        .layer(DefaultBodyLimit::max(body_limit(max_upload_bytes)))
}

/// Request body cap: the file limit plus multipart framing.
fn body_limit(max_upload_bytes: usize) -> usize {
    max_upload_bytes.saturating_add(MULTIPART_OVERHEAD)
}

#[derive(Debug, Default, Deserialize)]
struct UploadQuery {
    csrf_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    success: bool,
    #[serde(flatten)]
    asset: UploadedAsset,
}

struct FilePart {
    name: String,
    content_type: Option<String>,
    data: Bytes,
}

#[derive(Default)]
struct UploadForm {
    file: Option<FilePart>,
    size: Option<u64>,
    csrf_token: Option<String>,
}

async fn read_form(multipart: &mut Multipart) -> ApiResult<UploadForm> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await?;
                form.file = Some(FilePart {
                    name: file_name,
                    content_type,
                    data,
                });
            }
            Some("size") => {
                let raw = field.text().await?;
                let size = raw
                    .trim()
                    .parse()
                    .map_err(|_| ApiError::BadRequest("size must be a byte count".to_string()))?;
                form.size = Some(size);
            }
            Some(CSRF_FIELD) => form.csrf_token = Some(field.text().await?),
            other => debug!(field = ?other, "ignoring multipart field"),
        }
    }
    Ok(form)
}

/// Identity from a signed direct-upload token, when one is presented.
fn signed_uploader(state: &AppState, headers: &HeaderMap) -> ApiResult<Option<AdminIdentity>> {
    let Some(token) = headers.get(UPLOAD_TOKEN_HEADER) else {
        return Ok(None);
    };
    let token = token
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Invalid token".to_string()))?;
    let claims = state.tokens().verify(token, TokenKind::Upload)?;
    Ok(Some(AdminIdentity::from_claims(&claims)?))
}

async fn upload(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<UploadQuery>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<UploadResponse>> {
    let (uploader, signed) = match signed_uploader(&state, &headers)? {
        Some(identity) => (identity, true),
        None => (require_admin(&state, &headers)?, false),
    };

    let mut multipart = multipart?;
    let form = read_form(&mut multipart).await?;
    if !signed {
        verify_csrf(
            &state,
            &session,
            &headers,
            form.csrf_token.as_deref(),
            query.csrf_token.as_deref(),
        )
        .await?;
    }

    let file = form
        .file
        .ok_or_else(|| ApiError::BadRequest("file field is required".to_string()))?;
    let asset = state
        .uploads()
        .upload(&file.name, file.content_type.as_deref(), form.size, &file.data)
        .await?;
    debug!(uploader = %uploader.email, signed, filename = %asset.filename, "upload accepted");

    Ok(Json(UploadResponse {
        success: true,
        asset,
    }))
}

/// Issue a short-lived token for direct uploads from the browser.
async fn sign_upload(
    State(state): State<AppState>,
    Admin(admin): Admin,
    session: Session,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<UploadQuery>,
) -> ApiResult<Json<Value>> {
    verify_csrf(&state, &session, &headers, None, query.csrf_token.as_deref()).await?;
    let token = state
        .tokens()
        .issue(&admin.email, &Role::Admin, TokenKind::Upload)?;
    Ok(Json(json!({
        "success": true,
        "uploadToken": token,
        "expiresIn": state.tokens().upload_ttl_secs(),
    })))
}
