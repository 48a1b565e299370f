//! Fixture reconciliation for replay-only test runs.
//!
//! A replay-only miss leaves a descriptor behind. Each fingerprint then moves
//! through these states:
//!
//! ```text
//! Empty --(replay miss)--> Missing --(fetch)--> Fetched --(drop descriptor)--> Cached
//! ```
//!
//! [`resolve_missing`] performs the last two steps for every descriptor in a
//! store.

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use crate::cache::CacheStore;
use crate::error::ClientResult;
use crate::fingerprint::Fingerprint;
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FixtureState {
    /// Neither a response nor a descriptor.
    Empty,
    /// Descriptor recorded, no response yet.
    Missing,
    /// Response stored but the descriptor was not removed.
    Fetched,
    Cached,
}

impl FixtureState {
    pub async fn of(store: &dyn CacheStore, fingerprint: &Fingerprint) -> ClientResult<Self> {
        let cached = store.get(fingerprint).await?.is_some();
        let missing = store.get_missing(fingerprint).await?.is_some();
        Ok(match (cached, missing) {
            (false, false) => Self::Empty,
            (false, true) => Self::Missing,
            (true, true) => Self::Fetched,
            (true, false) => Self::Cached,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Missing => "missing",
            Self::Fetched => "fetched",
            Self::Cached => "cached",
        }
    }
}

impl fmt::Display for FixtureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolveFailure {
    pub fingerprint: Fingerprint,
    pub method: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolveReport {
    pub resolved: Vec<Fingerprint>,
    pub failed: Vec<ResolveFailure>,
}

impl ResolveReport {
    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty() && self.failed.is_empty()
    }
}

/// Fetch every recorded descriptor live and store the responses.
///
/// A failed descriptor stays in place and is reported; the rest are still
/// attempted.
pub async fn resolve_missing(
    store: &dyn CacheStore,
    transport: &dyn Transport,
) -> ClientResult<ResolveReport> {
    let mut report = ResolveReport::default();

    for missing in store.list_missing().await? {
        let fingerprint = missing.fingerprint.clone();
        let outcome: ClientResult<()> = async {
            let payload = transport.call(&missing.request()).await?;
            store.put(&fingerprint, &payload).await?;
            store.remove_missing(&fingerprint).await
        }
        .await;

        match outcome {
            Ok(()) => {
                info!(method = %missing.method, fingerprint = %fingerprint.short(), "fetched");
                report.resolved.push(fingerprint);
            }
            Err(e) => {
                warn!(method = %missing.method, fingerprint = %fingerprint.short(), error = %e, "fetch failed");
                report.failed.push(ResolveFailure {
                    fingerprint,
                    method: missing.method.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(report)
}
