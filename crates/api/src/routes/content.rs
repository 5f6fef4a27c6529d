//! `/content`: site singletons and pages, draft and live.

use axum::{
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use brochure_core::document::id::{ContentKind, Partition};
use brochure_core::pages::{NewPage, PagePatch};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tower_sessions::Session;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::middleware::auth::{require_admin, Admin};
use crate::middleware::csrf::{take_body_token, verify_csrf};
use crate::middleware::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/content",
            get(get_content)
                .post(create_content)
                .put(update_content)
                .delete(delete_content),
        )
        .route("/content/list", get(list_content))
        .route("/content/publish", post(publish))
        .route("/content/changes", get(pending_changes))
}

#[derive(Debug, Default, Deserialize)]
struct ContentQuery {
    #[serde(rename = "type")]
    kind: Option<String>,
    id: Option<String>,
    draft: Option<String>,
    csrf_token: Option<String>,
}

/// What a `/content` request addresses.
enum Target {
    Singleton(ContentKind),
    Page,
}

impl ContentQuery {
    fn target(&self) -> ApiResult<Target> {
        match self.kind.as_deref() {
            None | Some("") => Err(ApiError::BadRequest("type is required".to_string())),
            Some("page") => Ok(Target::Page),
            Some(other) => other
                .parse::<ContentKind>()
                .map(Target::Singleton)
                .map_err(ApiError::BadRequest),
        }
    }

    fn page_id(&self) -> ApiResult<&str> {
        self.id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::BadRequest("id is required".to_string()))
    }

    fn draft(&self) -> ApiResult<bool> {
        match self.draft.as_deref().map(str::trim) {
            None | Some("") | Some("0") | Some("false") => Ok(false),
            Some("1") | Some("true") => Ok(true),
            Some(other) => Err(ApiError::BadRequest(format!("invalid draft flag '{other}'"))),
        }
    }

    /// Draft content is only shown to administrators.
    fn partition(&self, state: &AppState, headers: &HeaderMap) -> ApiResult<Partition> {
        let draft = self.draft()?;
        if draft {
            require_admin(state, headers)?;
        }
        Ok(Partition::from_draft_flag(draft))
    }
}

async fn get_content(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<ContentQuery>,
) -> ApiResult<Json<Value>> {
    let target = query.target()?;
    let partition = query.partition(&state, &headers)?;

    let document = match target {
        Target::Singleton(kind) => to_json(state.content().get(kind, partition).await?)?,
        Target::Page => to_json(state.pages().get(query.page_id()?, partition).await?)?,
    };
    Ok(Json(document))
}

async fn list_content(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<ContentQuery>,
) -> ApiResult<Json<Value>> {
    if !matches!(query.target()?, Target::Page) {
        return Err(ApiError::BadRequest("only pages can be listed".to_string()));
    }
    let partition = query.partition(&state, &headers)?;
    let items = state.pages().list(partition).await?;
    Ok(Json(json!({ "total": items.len(), "items": items })))
}

/// POST creates a page; for singletons it is the same as PUT.
async fn create_content(
    State(state): State<AppState>,
    Admin(admin): Admin,
    session: Session,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<ContentQuery>,
    ApiJson(mut body): ApiJson<Map<String, Value>>,
) -> ApiResult<Json<Value>> {
    let target = query.target()?;
    let body_token = take_body_token(&mut body);
    verify_csrf(&state, &session, &headers, body_token.as_deref(), query.csrf_token.as_deref()).await?;

    match target {
        Target::Singleton(kind) => {
            let document = state.content().update(kind, body).await?;
            debug!(admin = %admin.email, content = kind.doc_id(), "content updated");
            Ok(Json(json!({ "success": true, "id": kind.doc_id(), "document": document })))
        }
        Target::Page => {
            if let Some(id) = query.id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
                match body.get("id") {
                    None => {
                        body.insert("id".to_string(), Value::String(id.to_string()));
                    }
                    Some(Value::String(body_id)) if body_id.trim() == id => {}
                    Some(_) => {
                        return Err(ApiError::BadRequest(
                            "id in query and body do not match".to_string(),
                        ))
                    }
                }
            }
            let new: NewPage = from_body(body)?;
            let page = state.pages().create(new).await?;
            debug!(admin = %admin.email, page = %page.id, "page created");
            Ok(Json(json!({ "success": true, "id": page.id, "document": page })))
        }
    }
}

async fn update_content(
    State(state): State<AppState>,
    Admin(admin): Admin,
    session: Session,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<ContentQuery>,
    ApiJson(mut body): ApiJson<Map<String, Value>>,
) -> ApiResult<Json<Value>> {
    let target = query.target()?;
    let body_token = take_body_token(&mut body);
    verify_csrf(&state, &session, &headers, body_token.as_deref(), query.csrf_token.as_deref()).await?;

    match target {
        Target::Singleton(kind) => {
            let document = state.content().update(kind, body).await?;
            debug!(admin = %admin.email, content = kind.doc_id(), "content updated");
            Ok(Json(json!({ "success": true, "id": kind.doc_id(), "document": document })))
        }
        Target::Page => {
            let id = query.page_id()?;
            let patch: PagePatch = from_body(body)?;
            let page = state.pages().update(id, patch).await?;
            debug!(admin = %admin.email, page = %page.id, "page updated");
            Ok(Json(json!({ "success": true, "id": page.id, "document": page })))
        }
    }
}

async fn delete_content(
    State(state): State<AppState>,
    Admin(admin): Admin,
    session: Session,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<ContentQuery>,
) -> ApiResult<Json<Value>> {
    if !matches!(query.target()?, Target::Page) {
        return Err(ApiError::BadRequest("only pages can be deleted".to_string()));
    }
    verify_csrf(&state, &session, &headers, None, query.csrf_token.as_deref()).await?;

    let id = query.page_id()?;
    state.pages().delete(id).await?;
    debug!(admin = %admin.email, page = id, "page delete requested");
    Ok(Json(json!({ "success": true })))
}

async fn publish(State(state): State<AppState>, Admin(admin): Admin) -> ApiResult<Json<Value>> {
    let timestamp = state.content().publish().await?;
    debug!(admin = %admin.email, %timestamp, "draft published");
    Ok(Json(json!({ "success": true, "timestamp": timestamp })))
}

async fn pending_changes(State(state): State<AppState>, Admin(_): Admin) -> ApiResult<Json<Value>> {
    let changes = state.content().pending_changes().await?;
    Ok(Json(json!({ "total": changes.len(), "items": changes })))
}

fn from_body<T: serde::de::DeserializeOwned>(body: Map<String, Value>) -> ApiResult<T> {
    serde_json::from_value(Value::Object(body))
        .map_err(|e| ApiError::BadRequest(format!("invalid request body: {e}")))
}

fn to_json<T: serde::Serialize>(value: T) -> ApiResult<Value> {
    serde_json::to_value(value).map_err(|e| ApiError::Internal(format!("failed to encode document: {e}")))
}
