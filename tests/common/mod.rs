use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use railgen::auth::PasswordHasher;
use railgen::auth::helpers::issue_token;
use railgen::license::TemplateStore;
use railgen::server::{AppState, RateLimits, create_router};
use railgen::store::{SqliteStore, Store};
use railgen::types::NewUser;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "correct horse battery staple";

pub fn template_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("templates")
}

/// An in-process server over an in-memory database.
pub struct TestApp {
    pub store: Arc<SqliteStore>,
    pub state: Arc<AppState>,
    pub admin_token: String,
    router: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response is JSON")
    }

    pub fn data(&self) -> Value {
        self.json()["data"].clone()
    }

    pub fn error(&self) -> String {
        self.json()["error"].as_str().unwrap_or_default().to_string()
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.to_vec()).expect("response is UTF-8")
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_limits(RateLimits::disabled())
    }

    pub fn with_limits(limits: RateLimits) -> Self {
        Self::build(limits, TemplateStore::new(template_dir()))
    }

    pub fn with_templates(templates: TemplateStore) -> Self {
        Self::build(RateLimits::disabled(), templates)
    }

    fn build(limits: RateLimits, templates: TemplateStore) -> Self {
        let store = Arc::new(SqliteStore::in_memory().expect("open store"));
        store.initialize().expect("initialize store");

        let mut state = AppState::new(store.clone(), templates);
        state.limits = limits;
        let state = Arc::new(state);

        let hashed_password = PasswordHasher::new()
            .hash(ADMIN_PASSWORD)
            .expect("hash password");
        let admin = store
            .create_user(&NewUser {
                email: ADMIN_EMAIL.to_string(),
                full_name: "Admin".to_string(),
                hashed_password,
                is_active: true,
                is_superuser: true,
            })
            .expect("create superuser");
        let (admin_token, _) = issue_token(&state, &admin).expect("issue token");

        Self {
            store,
            router: create_router(state.clone()),
            state,
            admin_token,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn admin_post(&self, uri: &str, body: Value) -> Value {
        let response = self.post(uri, Some(&self.admin_token), body).await;
        assert_eq!(
            response.status,
            StatusCode::OK,
            "POST {uri} failed: {}",
            response.text()
        );
        response.data()
    }

    /// Creates a domain, a source and one restriction per text, returning the
    /// restriction ids.
    pub async fn seed_restrictions(&self, domain: &str, texts: &[&str], approved: bool) -> Vec<i64> {
        let domain_id = self
            .admin_post("/api/v1/license/domain/", serde_json::json!({ "name": domain }))
            .await["id"]
            .as_i64()
            .expect("domain id");
        let source_id = self
            .admin_post(
                "/api/v1/license/source/",
                serde_json::json!({ "name": format!("{domain} source") }),
            )
            .await["id"]
            .as_i64()
            .expect("source id");

        let mut ids = Vec::new();
        for text in texts {
            let restriction = self
                .admin_post(
                    "/api/v1/license/restriction/",
                    serde_json::json!({
                        "text": text,
                        "domain_id": domain_id,
                        "source_id": source_id,
                        "approved": approved,
                    }),
                )
                .await;
            ids.push(restriction["id"].as_i64().expect("restriction id"));
        }
        ids
    }
}
