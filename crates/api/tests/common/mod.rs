//! Shared harness: the real router over the in-memory store and a temporary
//! upload directory.

#![allow(dead_code)]

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use brochure_api::config::AppConfig;
use brochure_api::{app, AppState};
use brochure_core::auth::password::hash_password;
use brochure_core::rate_limit::FixedWindowLimiter;
use brochure_core::store::{ContentStore, MemoryContentStore};
use brochure_core::upload::LocalAssetStorage;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "correct horse battery";
pub const BOUNDARY: &str = "brochure-test-boundary";

/// argon2 is slow in debug builds; hash once per test binary.
fn admin_hash() -> String {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password(ADMIN_PASSWORD).unwrap()).clone()
}

pub fn test_config(uploads: &TempDir) -> AppConfig {
    AppConfig {
        jwt_secret: "integration-test-secret".to_string(),
        admin_email: Some(ADMIN_EMAIL.to_string()),
        admin_password_hash: Some(admin_hash()),
        upload_dir: uploads.path().to_path_buf(),
        ..AppConfig::default()
    }
}

pub struct TestApp {
    router: Router,
    pub config: AppConfig,
    pub uploads: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Session cookie plus the CSRF token bound to it.
pub struct CsrfSession {
    pub cookie: String,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        Self::with_store(adjust, Arc::new(MemoryContentStore::new()))
    }

    pub fn with_store(adjust: impl FnOnce(&mut AppConfig), store: Arc<dyn ContentStore>) -> Self {
        let uploads = tempfile::tempdir().unwrap();
        let mut config = test_config(&uploads);
        adjust(&mut config);

        let state = AppState::new(
            config.clone(),
            store,
            Arc::new(LocalAssetStorage::new(uploads.path(), config.upload_base_url.clone())),
            Arc::new(FixedWindowLimiter::new(config.rate_limits())),
        );
        Self {
            router: app(state),
            config,
            uploads,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse { status, headers, body }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        let mut builder = Request::get(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// Log in as the configured administrator and return the access token.
    pub async fn login(&self) -> String {
        let response = self
            .send(json_request(
                "POST",
                "/auth?action=login",
                &json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
            ))
            .await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {}", response.body);
        response.body["token"].as_str().unwrap().to_string()
    }

    /// Start a session and fetch its CSRF token.
    pub async fn csrf_session(&self) -> CsrfSession {
        let response = self.get("/csrf", None).await;
        assert_eq!(response.status, StatusCode::OK);
        let cookie = session_cookie(&response.headers).expect("session cookie");
        let token = response.body["csrfToken"].as_str().unwrap().to_string();
        CsrfSession { cookie, token }
    }

    /// An admin request carrying bearer token, session cookie and CSRF header.
    pub async fn admin_json(
        &self,
        method: &str,
        uri: &str,
        token: &str,
        csrf: &CsrfSession,
        body: &Value,
    ) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::COOKIE, &csrf.cookie)
            .header("x-csrf-token", &csrf.token)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// `name=value` of the tower-sessions cookie from `Set-Cookie` headers.
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .find(|pair| pair.starts_with("id="))
        .map(str::to_string)
}

/// One multipart part: field name, optional file name and content type, bytes.
pub struct Part<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub data: &'a [u8],
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
        if let Some(filename) = part.filename {
            disposition.push_str(&format!("; filename=\"{filename}\""));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(content_type) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_request(uri: &str) -> axum::http::request::Builder {
    Request::post(uri).header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={BOUNDARY}"),
    )
}
