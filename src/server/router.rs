use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::http::{HeaderValue, Method, header};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};
use tower_http::cors::{AllowOrigin, CorsLayer};

use super::account::account_router;
use super::licenses::license_router;
use super::rate_limit::RateLimits;
use crate::config::ServerConfig;
use crate::license::{Converter, TemplateStore};
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub templates: TemplateStore,
    pub converter: Converter,
    pub limits: RateLimits,
    pub token_lifetime: chrono::Duration,
    pub cors_origins: Vec<String>,
}

impl AppState {
    /// State with default converter settings, no rate limiting and no CORS.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, templates: TemplateStore) -> Self {
        let defaults = ServerConfig::default();
        Self {
            store,
            templates,
            converter: Converter::default(),
            limits: RateLimits::disabled(),
            token_lifetime: defaults.token_lifetime(),
            cors_origins: Vec::new(),
        }
    }

    /// State as configured for a running server.
    #[must_use]
    pub fn from_config(store: Arc<dyn Store>, config: &ServerConfig) -> Self {
        let mut templates = TemplateStore::new(&config.template_dir);
        if let Some(repo) = &config.template_repo {
            templates = templates.with_history(repo, &config.template_repo_prefix);
        }

        Self {
            store,
            templates,
            converter: Converter::new(&config.pandoc, config.pandoc_timeout()),
            limits: RateLimits::new(config.rate_limit, config.trusted_proxies.clone()),
            token_lifetime: config.token_lifetime(),
            cors_origins: config.cors_origins.clone(),
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim_end_matches('/')) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{origin}'");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/health", get(health))
        .nest("/api/v1", account_router())
        .nest("/api/v1", license_router())
        .layer(middleware::from_fn(log_request));

    if !state.cors_origins.is_empty() {
        router = router.layer(cors_layer(&state.cors_origins));
    }

    router.with_state(state)
}
