use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Eight days.
const DEFAULT_TOKEN_LIFETIME_MINUTES: i64 = 60 * 24 * 8;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Directory holding one template per license family.
    pub template_dir: PathBuf,
    /// Git repository tracking the templates. Enables `git_sha` lookups.
    pub template_repo: Option<PathBuf>,
    /// Path of the template directory inside the repository tree.
    pub template_repo_prefix: String,
    pub pandoc: String,
    pub pandoc_timeout_secs: u64,
    pub rate_limit: bool,
    /// Peers whose `X-Forwarded-For` header is trusted for rate limiting.
    pub trusted_proxies: Vec<IpAddr>,
    pub cors_origins: Vec<String>,
    pub token_lifetime_minutes: i64,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("railgen.db")
    }

    #[must_use]
    pub fn pandoc_timeout(&self) -> Duration {
        Duration::from_secs(self.pandoc_timeout_secs)
    }

    #[must_use]
    pub fn token_lifetime(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.token_lifetime_minutes)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&raw)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            template_dir: PathBuf::from("./templates"),
            template_repo: None,
            template_repo_prefix: "templates".to_string(),
            pandoc: crate::license::convert::DEFAULT_PANDOC.to_string(),
            pandoc_timeout_secs: crate::license::convert::DEFAULT_TIMEOUT.as_secs(),
            rate_limit: true,
            trusted_proxies: Vec::new(),
            cors_origins: Vec::new(),
            token_lifetime_minutes: DEFAULT_TOKEN_LIFETIME_MINUTES,
        }
    }
}

/// Rate limiting is switched off only by the exact value `true`.
#[must_use]
pub fn rate_limit_deactivated(value: Option<&str>) -> bool {
    value == Some("true")
}
