use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/templates", get(list_templates))
}

/// Page templates and their field schemas, for building admin forms.
async fn list_templates(State(state): State<AppState>) -> Json<Value> {
    let templates: Vec<_> = state.templates().iter().collect();
    Json(json!({ "total": templates.len(), "items": templates }))
}
