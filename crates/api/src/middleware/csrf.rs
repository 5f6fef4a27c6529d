//! Session-bound CSRF checks for mutating requests.

use axum::http::HeaderMap;
use brochure_core::csrf::{self, CsrfCheck, CsrfToken, SESSION_KEY};
use serde_json::{Map, Value};
use tower_sessions::Session;
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;

pub const CSRF_HEADER: &str = "x-csrf-token";
/// Form, JSON body and query-string field name.
pub const CSRF_FIELD: &str = "csrf_token";

/// Return the session's token, minting one when it has none or it expired.
pub async fn issue_csrf(state: &AppState, session: &Session) -> Result<CsrfToken, ApiError> {
    let existing: Option<CsrfToken> = session.get(SESSION_KEY).await?;
    let token = state.csrf().issue(existing.clone());
    if existing.as_ref() != Some(&token) {
        session.insert(SESSION_KEY, &token).await?;
    }
    Ok(token)
}

/// Check the submitted token against the session. Header wins over body,
/// body over query string. An expired token is dropped from the session.
pub async fn verify_csrf(
    state: &AppState,
    session: &Session,
    headers: &HeaderMap,
    body: Option<&str>,
    query: Option<&str>,
) -> Result<(), ApiError> {
    let header = headers.get(CSRF_HEADER).and_then(|v| v.to_str().ok());
    let supplied = csrf::select_supplied(header, body, query);
    let stored: Option<CsrfToken> = session.get(SESSION_KEY).await?;

    match state.csrf().verify(stored.as_ref(), supplied) {
        CsrfCheck::Valid => Ok(()),
        CsrfCheck::Missing => Err(ApiError::Forbidden("CSRF token missing".to_string())),
        CsrfCheck::Mismatch => {
            warn!("CSRF token mismatch");
            Err(ApiError::Forbidden("Invalid CSRF token".to_string()))
        }
        CsrfCheck::Expired => {
            session.remove::<CsrfToken>(SESSION_KEY).await?;
            warn!("expired CSRF token purged");
            Err(ApiError::Forbidden("CSRF token expired".to_string()))
        }
    }
}

/// Pull the CSRF field out of a JSON body so it never reaches the document.
pub fn take_body_token(body: &mut Map<String, Value>) -> Option<String> {
    match body.remove(CSRF_FIELD) {
        Some(Value::String(token)) => Some(token),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::HeaderValue;
    use brochure_core::rate_limit::FixedWindowLimiter;
    use brochure_core::store::MemoryContentStore;
    use brochure_core::upload::LocalAssetStorage;
    use tower_sessions::MemoryStore;

    use super::*;
    use crate::config::AppConfig;

    fn state(csrf_token_ttl_secs: i64, uploads: &tempfile::TempDir) -> AppState {
        let config = AppConfig {
            csrf_token_ttl_secs,
            ..AppConfig::default()
        };
        AppState::new(
            config.clone(),
            Arc::new(MemoryContentStore::new()),
            Arc::new(LocalAssetStorage::new(uploads.path(), "/uploads")),
            Arc::new(FixedWindowLimiter::new(config.rate_limits())),
        )
    }

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn header(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CSRF_HEADER, HeaderValue::from_str(token).unwrap());
        headers
    }

    #[tokio::test]
    async fn expired_token_is_removed_from_the_session() {
        let uploads = tempfile::tempdir().unwrap();
        let state = state(0, &uploads);
        let session = session();

        let token = issue_csrf(&state, &session).await.unwrap();
        assert!(session.get::<CsrfToken>(SESSION_KEY).await.unwrap().is_some());

        let err = verify_csrf(&state, &session, &header(&token.token), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(ref msg) if msg == "CSRF token expired"));
        assert!(session.get::<CsrfToken>(SESSION_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn mismatch_keeps_the_session_token() {
        let uploads = tempfile::tempdir().unwrap();
        let state = state(3600, &uploads);
        let session = session();

        let token = issue_csrf(&state, &session).await.unwrap();
        let err = verify_csrf(&state, &session, &header("nope"), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        assert_eq!(session.get::<CsrfToken>(SESSION_KEY).await.unwrap(), Some(token.clone()));

        verify_csrf(&state, &session, &HeaderMap::new(), Some(&token.token), None)
            .await
            .unwrap();
    }
}
