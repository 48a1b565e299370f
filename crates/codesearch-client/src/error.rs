//! Error types for the code search client.

use std::path::PathBuf;

use crate::fingerprint::Fingerprint;

/// Client errors.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Request payload could not be serialized. Caller bug, never retried.
    #[error("serialization error: {message}")]
    Serialization { message: String },

    /// Connection failure or timeout talking to the backend.
    #[error("network error: {message}")]
    Network { message: String },

    /// Non-success status, or a success status with a body that is not JSON.
    #[error("server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// Replay-only miss. A descriptor was recorded for out-of-band fetching.
    #[error(
        "{method} request is not cached (fingerprint {fingerprint}). {}",
        descriptor_hint(.descriptor.as_ref())
    )]
    ResourceNotCached {
        fingerprint: Fingerprint,
        method: String,
        descriptor: Option<PathBuf>,
    },

    /// A cached payload exists but does not parse.
    #[error("corrupt cache entry {fingerprint}{}: {reason}", path_suffix(.path.as_ref()))]
    CorruptCacheEntry {
        fingerprint: Fingerprint,
        path: Option<PathBuf>,
        reason: String,
    },

    /// Local cache I/O failure.
    #[error("cache error: {message}")]
    Cache { message: String },

    /// A string that should name a fingerprint does not.
    #[error("invalid fingerprint: {value:?}")]
    InvalidFingerprint { value: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

fn descriptor_hint(descriptor: Option<&PathBuf>) -> String {
    match descriptor {
        Some(path) => {
            let dir = path
                .parent()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| ".".to_string());
            format!(
                "Recorded {}; run `codesearch fetch-missing {}` to populate the cache, then rerun.",
                path.display(),
                dir
            )
        }
        None => "The in-memory store recorded the request; populate it with a live fetch before replaying.".to_string(),
    }
}

fn path_suffix(path: Option<&PathBuf>) -> String {
    path.map(|p| format!(" ({})", p.display()))
        .unwrap_or_default()
}

impl ClientError {
    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            // Bad input from the command line
            Self::InvalidFingerprint { .. } => 2,

            Self::ResourceNotCached { .. } => 3,

            Self::CorruptCacheEntry { .. } => 4,
            Self::Cache { .. } => 4,

            Self::Network { .. } => 5,
            Self::Server { .. } => 5,

            Self::Serialization { .. } => 6,

            Self::Config { .. } => 7,
        }
    }

    /// Whether the caller may reasonably retry. The client itself never does.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    pub(crate) fn cache(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Cache {
            message: format!("{}: {}", context, err),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("request timed out: {}", err)
        } else {
            err.to_string()
        };
        Self::Network { message }
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
