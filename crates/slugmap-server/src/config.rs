use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use slugmap_service::{ConnectionConfig, MappingService};
use slugmap_store::{LogConfig, SyncMode};

use crate::error::{ServerError, ServerResult};

/// Environment variables read by [`ServerConfig::apply_env`].
pub mod env {
    pub const DATABASE_URL: &str = "SLUGMAP_DATABASE_URL";
    /// Fallback for [`DATABASE_URL`], the name most hosting platforms inject.
    pub const DATABASE_URL_FALLBACK: &str = "DATABASE_URL";
    pub const BIND: &str = "SLUGMAP_BIND";
    pub const CONNECT_TIMEOUT_MS: &str = "SLUGMAP_CONNECT_TIMEOUT_MS";
    pub const OPERATION_TIMEOUT_MS: &str = "SLUGMAP_OPERATION_TIMEOUT_MS";
    pub const REQUEST_TIMEOUT_MS: &str = "SLUGMAP_REQUEST_TIMEOUT_MS";
    pub const LOG_SYNC: &str = "SLUGMAP_LOG_SYNC";
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// `postgres://…`, `file:<path>`, or `memory:`. Required; `memory:`
    /// keeps nothing across restarts.
    pub database_url: String,
    pub connect_timeout_ms: u64,
    pub operation_timeout_ms: u64,
    /// Wall-clock budget for a whole HTTP request.
    pub request_timeout_ms: u64,
    /// Flush policy for `file:` stores.
    pub log_sync: SyncMode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            database_url: String::new(),
            connect_timeout_ms: 5_000,
            operation_timeout_ms: 45_000,
            request_timeout_ms: 60_000,
            log_sync: SyncMode::default(),
        }
    }
}

impl ServerConfig {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> ServerResult<Self> {
        toml::from_str(s).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Read and parse a TOML config file.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Override fields from the process environment.
    pub fn apply_env(&mut self) -> ServerResult<()> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    /// Override fields from `lookup`, which maps a variable name to its value.
    pub fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) -> ServerResult<()> {
        if let Some(url) = lookup(env::DATABASE_URL).or_else(|| lookup(env::DATABASE_URL_FALLBACK)) {
            self.database_url = url;
        }
        if let Some(bind) = lookup(env::BIND) {
            self.bind_addr = bind
                .parse()
                .map_err(|e| ServerError::Config(format!("{}={bind}: {e}", env::BIND)))?;
        }
        if let Some(ms) = lookup(env::CONNECT_TIMEOUT_MS) {
            self.connect_timeout_ms = parse_millis(env::CONNECT_TIMEOUT_MS, &ms)?;
        }
        if let Some(ms) = lookup(env::OPERATION_TIMEOUT_MS) {
            self.operation_timeout_ms = parse_millis(env::OPERATION_TIMEOUT_MS, &ms)?;
        }
        if let Some(ms) = lookup(env::REQUEST_TIMEOUT_MS) {
            self.request_timeout_ms = parse_millis(env::REQUEST_TIMEOUT_MS, &ms)?;
        }
        if let Some(mode) = lookup(env::LOG_SYNC) {
            self.log_sync = mode
                .parse()
                .map_err(|e| ServerError::Config(format!("{}: {e}", env::LOG_SYNC)))?;
        }
        Ok(())
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> ServerResult<()> {
        if self.database_url.trim().is_empty() {
            return Err(ServerError::Config(format!(
                "database_url is required; set {} or pass --database-url",
                env::DATABASE_URL
            )));
        }
        for (name, ms) in [
            ("connect_timeout_ms", self.connect_timeout_ms),
            ("operation_timeout_ms", self.operation_timeout_ms),
            ("request_timeout_ms", self.request_timeout_ms),
        ] {
            if ms == 0 {
                return Err(ServerError::Config(format!("{name} must be positive")));
            }
        }
        Ok(())
    }

    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            operation_timeout: Duration::from_millis(self.operation_timeout_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            sync_mode: self.log_sync,
        }
    }

    /// Validate and build the mapping service this config describes.
    /// Nothing is connected until the first store operation.
    pub fn build_service(&self) -> ServerResult<MappingService> {
        self.validate()?;
        MappingService::from_url(&self.database_url, self.connection_config(), self.log_config())
            .map_err(|e| ServerError::Config(e.message().to_string()))
    }
}

// The database URL may carry a password.
impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("database_url", &"<redacted>")
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("operation_timeout_ms", &self.operation_timeout_ms)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("log_sync", &self.log_sync)
            .finish()
    }
}

fn parse_millis(name: &str, value: &str) -> ServerResult<u64> {
    value
        .trim()
        .parse()
        .map_err(|e| ServerError::Config(format!("{name}={value}: {e}")))
}
