//! # Configuration
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI arguments
//! 2. Environment variables (`TRIXEL_TAGS_*`)
//! 3. Config file (TOML)
//! 4. Built-in defaults
//!
//! ```toml
//! database = "tags.redb"
//!
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//! static_dir = "public"
//! body_limit = 4096
//!
//! [security]
//! api_key = "secret"
//! rate_limit = 100
//! cors_origins = "https://maps.example.org"
//! ```

use crate::AppError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default database file name.
pub const DEFAULT_DATABASE: &str = "trixel-tags.redb";

/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "TRIXEL_TAGS_API_KEY";
/// Environment variable holding the requests-per-second limit.
pub const ENV_RATE_LIMIT: &str = "TRIXEL_TAGS_RATE_LIMIT";
/// Environment variable holding the comma-separated CORS origins.
pub const ENV_CORS_ORIGINS: &str = "TRIXEL_TAGS_CORS_ORIGINS";
/// Environment variable selecting `json` log output.
pub const ENV_LOG_FORMAT: &str = "TRIXEL_TAGS_LOG_FORMAT";

// =============================================================================
// CONFIG TYPES
// =============================================================================

/// Complete application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Path of the redb database file.
    pub database: PathBuf,
    /// `[server]`
    pub server: ServerConfig,
    /// `[security]`
    pub security: SecurityConfig,
}

/// The `[server]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory served for paths no API route matches. Unset disables it.
    pub static_dir: Option<PathBuf>,
    /// Maximum request body size in bytes.
    pub body_limit: usize,
}

/// The `[security]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecurityConfig {
    /// Bearer token required for mutating requests. Unset disables auth.
    pub api_key: Option<String>,
    /// Global requests per second, 0 disables limiting.
    pub rate_limit: u32,
    /// Comma-separated allowed origins, or `*`. Unset means localhost only.
    pub cors_origins: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            server: ServerConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            static_dir: None,
            body_limit: 4 * 1024,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            rate_limit: 100,
            cors_origins: None,
        }
    }
}

// =============================================================================
// LOADING
// =============================================================================

impl Config {
    /// Defaults, overlaid with the TOML file at `path` (if any) and then
    /// with the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Parse a TOML config file. An empty file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
            .map_err(|e| AppError::Config(format!("cannot parse {}: {}", path.display(), e)))
    }

    /// Parse TOML text.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Overlay values from an environment lookup.
    ///
    /// Empty variables count as unset. An unparsable rate limit is ignored
    /// with a warning.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(key) = var(ENV_API_KEY) {
            self.security.api_key = Some(key);
        }
        if let Some(raw) = var(ENV_RATE_LIMIT) {
            match raw.trim().parse() {
                Ok(rps) => self.security.rate_limit = rps,
                Err(e) => tracing::warn!(
                    variable = ENV_RATE_LIMIT,
                    value = %raw,
                    error = %e,
                    "ignoring invalid rate limit"
                ),
            }
        }
        if let Some(origins) = var(ENV_CORS_ORIGINS) {
            self.security.cors_origins = Some(origins);
        }
    }

    /// `host:port` for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// The configured API key, if non-empty.
    pub fn api_key(&self) -> Option<&str> {
        self.security.api_key.as_deref().filter(|k| !k.is_empty())
    }
}

// =============================================================================
// TESTS
// =============================================================================
