//! Content-addressed response cache.
//!
//! Entries are keyed by [`Fingerprint`] and hold the exact response bytes.
//! A fingerprint's payload is immutable once written; only explicit refresh
//! tooling overwrites it.
//!
//! # Disk Layout
//!
//! ```text
//! {cache_dir}/
//!   {fingerprint}.json      # response payload, byte-for-byte
//!   {fingerprint}.missing   # descriptor for a replay-only miss
//! ```
//!
//! The entry's creation time is the file's mtime. Writes go through a
//! uniquely named temp file in the same directory followed by a rename, so a
//! concurrent reader sees either the old entry, the new one, or nothing.

use std::fmt::Debug;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::ClientResult;
use crate::fingerprint::{Fingerprint, Request};

mod disk;
pub(crate) mod io;
pub(crate) mod keys;
mod memory;
mod policy;

pub use disk::DiskCache;
pub use keys::{ENTRY_SUFFIX, MISSING_SUFFIX};
pub use memory::MemoryCache;

/// A cached response.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub fingerprint: Fingerprint,

    /// Raw response bytes as received from the backend.
    pub payload: Vec<u8>,

    pub created_at: DateTime<Utc>,

    /// `None` when the store has no expiry configured.
    pub expires_at: Option<DateTime<Utc>>,

    /// Backing file, for disk stores.
    pub location: Option<PathBuf>,
}

/// Listing row for maintenance tooling.
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntryInfo {
    pub fingerprint: Fingerprint,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Descriptor written when a replay-only request misses the cache.
///
/// Holds everything the fetch tool needs to replay the call live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingResource {
    pub fingerprint: Fingerprint,
    pub method: String,
    pub payload: JsonValue,

    /// File name the fetched response must be stored under.
    pub filename: String,

    pub recorded_at: DateTime<Utc>,
}

impl MissingResource {
    pub fn new(fingerprint: Fingerprint, request: &Request) -> Self {
        let filename = keys::entry_file_name(&fingerprint);
        Self {
            fingerprint,
            method: request.method.clone(),
            payload: request.payload.clone(),
            filename,
            recorded_at: Utc::now(),
        }
    }

    /// Reconstruct the original request.
    pub fn request(&self) -> Request {
        Request::from_value(self.method.clone(), self.payload.clone())
    }
}

/// Key-value store of response payloads.
///
/// Lookups are purely local and never touch the network.
#[async_trait]
pub trait CacheStore: Send + Sync + Debug {
    /// Look up an entry. Expired entries read as absent.
    async fn get(&self, fingerprint: &Fingerprint) -> ClientResult<Option<CacheEntry>>;

    /// Store a payload, replacing any existing entry.
    async fn put(&self, fingerprint: &Fingerprint, payload: &[u8]) -> ClientResult<()>;

    /// Persist a missing-resource descriptor. Returns its location, if any.
    async fn record_missing(&self, missing: &MissingResource) -> ClientResult<Option<PathBuf>>;

    /// Remove an entry. Removing an absent entry is not an error.
    async fn remove(&self, fingerprint: &Fingerprint) -> ClientResult<()>;

    async fn get_missing(&self, fingerprint: &Fingerprint)
        -> ClientResult<Option<MissingResource>>;

    async fn list_missing(&self) -> ClientResult<Vec<MissingResource>>;

    async fn remove_missing(&self, fingerprint: &Fingerprint) -> ClientResult<()>;

    async fn list(&self) -> ClientResult<Vec<CacheEntryInfo>>;

    /// Drop expired entries; returns how many were removed.
    async fn purge_expired(&self) -> ClientResult<usize>;

    /// Remove every entry and descriptor owned by this store.
    async fn clear(&self) -> ClientResult<()>;

    /// Short human-readable description (`disk:/path` or `memory`).
    fn describe(&self) -> String;

    async fn contains(&self, fingerprint: &Fingerprint) -> ClientResult<bool> {
        Ok(self.get(fingerprint).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_resource_reconstructs_request() {
        let request = Request::from_value("search", json!({"query": "hello world"}));
        let fp = request.fingerprint().unwrap();
        let missing = MissingResource::new(fp.clone(), &request);

        assert_eq!(missing.filename, format!("{}.json", fp));
        assert_eq!(missing.request(), request);
        assert_eq!(missing.request().fingerprint().unwrap(), fp);
    }
}
