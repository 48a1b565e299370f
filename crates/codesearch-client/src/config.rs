//! Client configuration and cache mode selection.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// Default TTL for the ephemeral in-memory store (30 minutes).
pub const DEFAULT_MEMORY_TTL_SECS: u64 = 30 * 60;

/// How the dispatcher combines the cache and the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheMode {
    /// Always call the backend; optionally write responses through to the cache.
    #[default]
    Live,
    /// Serve from cache, fall back to the backend on a miss.
    CachedFirst,
    /// Never call the backend. A miss is fatal and recorded for out-of-band fetching.
    ReplayOnly,
}

impl CacheMode {
    pub fn reads_cache(self) -> bool {
        !matches!(self, CacheMode::Live)
    }

    pub fn allows_network(self) -> bool {
        !matches!(self, CacheMode::ReplayOnly)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CacheMode::Live => "live",
            CacheMode::CachedFirst => "cached-first",
            CacheMode::ReplayOnly => "replay-only",
        }
    }
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheMode {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "live" | "off" => Ok(CacheMode::Live),
            "cached-first" | "cached" => Ok(CacheMode::CachedFirst),
            "replay-only" | "replay" | "offline" => Ok(CacheMode::ReplayOnly),
            other => Err(ClientError::Config {
                message: format!(
                    "unknown cache mode {:?} (expected live, cached-first or replay-only)",
                    other
                ),
            }),
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend base URL.
    #[serde(default = "default_host")]
    pub host: String,

    /// Path of the JSON RPC endpoint below `host`.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Package name used when building file specs.
    #[serde(default = "default_package_name")]
    pub package_name: String,

    #[serde(default)]
    pub cache_mode: CacheMode,

    /// Persistent cache directory. `None` selects the in-memory store.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Entry expiry. `None` means entries never expire (fixture replay).
    #[serde(default)]
    pub cache_ttl_secs: Option<u64>,

    /// Persist successful live responses.
    #[serde(default = "default_write_through")]
    pub write_through: bool,
}

fn default_host() -> String {
    "https://cs.chromium.org".to_string()
}

fn default_endpoint() -> String {
    "codesearch/json".to_string()
}

fn default_timeout() -> u64 {
    3
}

fn default_user_agent() -> String {
    concat!("codesearch-client/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_package_name() -> String {
    "chromium".to_string()
}

fn default_write_through() -> bool {
    true
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
            package_name: default_package_name(),
            cache_mode: CacheMode::default(),
            cache_dir: None,
            cache_ttl_secs: None,
            write_through: default_write_through(),
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables, ignoring malformed values.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `CODESEARCH_HOST` | Backend base URL |
    /// | `CODESEARCH_TIMEOUT` | Request timeout in seconds |
    /// | `CODESEARCH_USER_AGENT` | User-Agent header |
    /// | `CODESEARCH_PACKAGE` | Package name for file specs |
    /// | `CODESEARCH_CACHE_MODE` | `live`, `cached-first` or `replay-only` |
    /// | `CODESEARCH_CACHE_DIR` | Persistent cache directory |
    /// | `CODESEARCH_CACHE_TTL` | Entry expiry in seconds |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env_string("CODESEARCH_HOST").unwrap_or(defaults.host),
            endpoint: defaults.endpoint,
            timeout_secs: env_string("CODESEARCH_TIMEOUT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_secs),
            user_agent: env_string("CODESEARCH_USER_AGENT").unwrap_or(defaults.user_agent),
            package_name: env_string("CODESEARCH_PACKAGE").unwrap_or(defaults.package_name),
            cache_mode: env_string("CODESEARCH_CACHE_MODE")
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            cache_dir: env_string("CODESEARCH_CACHE_DIR").map(PathBuf::from),
            cache_ttl_secs: env_string("CODESEARCH_CACHE_TTL").and_then(|v| v.parse().ok()),
            write_through: defaults.write_through,
        }
    }

    /// Like [`ClientConfig::from_env`] but malformed values are errors.
    pub fn from_env_strict() -> ClientResult<Self> {
        let mut config = Self::from_env();

        if let Some(mode) = env_string("CODESEARCH_CACHE_MODE") {
            config.cache_mode = mode.parse()?;
        }
        if let Some(timeout) = env_string("CODESEARCH_TIMEOUT") {
            config.timeout_secs = parse_number("CODESEARCH_TIMEOUT", &timeout)?;
        }
        if let Some(ttl) = env_string("CODESEARCH_CACHE_TTL") {
            config.cache_ttl_secs = Some(parse_number("CODESEARCH_CACHE_TTL", &ttl)?);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ClientResult<()> {
        if self.host.trim().is_empty() {
            return Err(ClientError::Config {
                message: "host must not be empty".to_string(),
            });
        }
        if self.timeout_secs == 0 {
            return Err(ClientError::Config {
                message: "timeout must be at least one second".to_string(),
            });
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl_secs.map(Duration::from_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Set the backend host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_cache_mode(mut self, mode: CacheMode) -> Self {
        self.cache_mode = mode;
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn with_cache_ttl_secs(mut self, ttl: u64) -> Self {
        self.cache_ttl_secs = Some(ttl);
        self
    }

    pub fn with_timeout_secs(mut self, timeout: u64) -> Self {
        self.timeout_secs = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_package_name(mut self, package: impl Into<String>) -> Self {
        self.package_name = package.into();
        self
    }

    pub fn with_write_through(mut self, write_through: bool) -> Self {
        self.write_through = write_through;
        self
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_number(key: &str, value: &str) -> ClientResult<u64> {
    value.trim().parse().map_err(|_| ClientError::Config {
        message: format!("{} must be a non-negative integer, got {:?}", key, value),
    })
}
