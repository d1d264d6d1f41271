use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;

use super::AppState;
use super::response::ApiError;

/// Windows are pruned once this many clients are tracked.
const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimitConfig {
    #[must_use]
    pub const fn per_minute(max_requests: u32) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started: Instant,
}

#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Arc<Mutex<HashMap<String, Window>>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Counts a request from `key`. `false` once the window is exhausted.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());

        if windows.len() >= PRUNE_THRESHOLD {
            let window = self.config.window;
            windows.retain(|_, w| now.duration_since(w.started) < window);
        }

        let entry = windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            started: now,
        });

        if now.duration_since(entry.started) >= self.config.window {
            entry.count = 0;
            entry.started = now;
        }

        if entry.count >= self.config.max_requests {
            false
        } else {
            entry.count += 1;
            true
        }
    }

    fn exceeded(&self) -> ApiError {
        ApiError::too_many_requests(format!(
            "Rate limit exceeded: {} per {} seconds",
            self.config.max_requests,
            self.config.window.as_secs()
        ))
    }
}

/// The limiters of the public endpoints.
#[derive(Debug, Clone)]
pub struct RateLimits {
    pub enabled: bool,
    pub trusted_proxies: Vec<IpAddr>,
    pub generate: RateLimiter,
    pub create_license: RateLimiter,
}

impl RateLimits {
    #[must_use]
    pub fn new(enabled: bool, trusted_proxies: Vec<IpAddr>) -> Self {
        Self {
            enabled,
            trusted_proxies,
            generate: RateLimiter::new(RateLimitConfig::per_minute(5)),
            create_license: RateLimiter::new(RateLimitConfig::per_minute(1)),
        }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self::new(false, Vec::new())
    }

    /// Peer address, or the first forwarded hop when the peer is a trusted
    /// proxy.
    #[must_use]
    pub fn client_key(&self, parts: &Parts) -> String {
        let Some(ConnectInfo(peer)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() else {
            return "unknown".to_string();
        };

        if self.trusted_proxies.contains(&peer.ip()) {
            let forwarded = parts
                .headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty());

            if let Some(client) = forwarded {
                return client.to_string();
            }
        }

        peer.ip().to_string()
    }

    fn admit(&self, parts: &Parts, limiter: &RateLimiter) -> Result<(), ApiError> {
        if !self.enabled {
            return Ok(());
        }

        let key = self.client_key(parts);
        if limiter.check(&key) {
            Ok(())
        } else {
            tracing::info!(client = %key, "Rate limit exceeded");
            Err(limiter.exceeded())
        }
    }
}

/// Admits a document generation request.
pub struct GenerateQuota;

/// Admits a license creation request.
pub struct CreateLicenseQuota;

impl FromRequestParts<Arc<AppState>> for GenerateQuota {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        state.limits.admit(parts, &state.limits.generate)?;
        Ok(GenerateQuota)
    }
}

impl FromRequestParts<Arc<AppState>> for CreateLicenseQuota {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        state.limits.admit(parts, &state.limits.create_license)?;
        Ok(CreateLicenseQuota)
    }
}
