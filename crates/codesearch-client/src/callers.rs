//! Call-site tracking for cached responses.
//!
//! The dispatcher notes the source location that issued each request. A dump
//! writes `callers.json` beside the cached responses: a map from fingerprint
//! to the request and every call site that asked for it. A cached entry no
//! call site maps to is a fixture nothing reads anymore.
//!
//! Dumps merge into an existing file, so several test binaries can share one
//! response directory.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::Location;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::cache::{io, keys, CacheEntryInfo, CacheStore};
use crate::error::{ClientError, ClientResult};
use crate::fingerprint::{Fingerprint, Request};

/// File name of the dump inside a response directory.
pub const CALLERS_FILE: &str = "callers.json";

/// Source location a request was issued from.
pub type Caller = &'static Location<'static>;

/// Contents of a callers file.
pub type CallerMap = BTreeMap<Fingerprint, CallerRecord>;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CallSite {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl From<Caller> for CallSite {
    fn from(location: Caller) -> Self {
        Self {
            file: location.file().to_string(),
            line: location.line(),
            column: location.column(),
        }
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// One request and the call sites that issued it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallerRecord {
    pub method: String,
    pub payload: JsonValue,

    /// Response file the request is cached under.
    pub filename: String,

    /// Sorted, without duplicates.
    pub callers: Vec<CallSite>,
}

impl CallerRecord {
    fn new(fingerprint: &Fingerprint, request: &Request) -> Self {
        Self {
            method: request.method.clone(),
            payload: request.payload.clone(),
            filename: keys::entry_file_name(fingerprint),
            callers: Vec::new(),
        }
    }

    fn add(&mut self, site: CallSite) {
        if let Err(pos) = self.callers.binary_search(&site) {
            self.callers.insert(pos, site);
        }
    }

    fn absorb(&mut self, newer: CallerRecord) {
        self.method = newer.method;
        self.payload = newer.payload;
        self.filename = newer.filename;
        self.callers.extend(newer.callers);
        self.callers.sort();
        self.callers.dedup();
    }
}

/// In-process record of who asked for what.
#[derive(Debug, Default)]
pub struct CallerLog {
    seen: Mutex<CallerMap>,
}

impl CallerLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, fingerprint: &Fingerprint, request: &Request, caller: Caller) {
        self.seen
            .lock()
            .await
            .entry(fingerprint.clone())
            .or_insert_with(|| CallerRecord::new(fingerprint, request))
            .add(CallSite::from(caller));
    }

    pub async fn snapshot(&self) -> CallerMap {
        self.seen.lock().await.clone()
    }

    pub async fn callers_of(&self, fingerprint: &Fingerprint) -> Vec<CallSite> {
        self.seen
            .lock()
            .await
            .get(fingerprint)
            .map(|record| record.callers.clone())
            .unwrap_or_default()
    }

    pub async fn is_empty(&self) -> bool {
        self.seen.lock().await.is_empty()
    }

    /// Merge into `{dir}/callers.json`.
    pub async fn dump_into(&self, dir: &Path) -> ClientResult<usize> {
        self.dump(&dir.join(CALLERS_FILE)).await
    }

    /// Merge the log into the callers file at `path`.
    ///
    /// Returns the number of fingerprints in the file afterwards. A file
    /// that does not parse is replaced.
    pub async fn dump(&self, path: &Path) -> ClientResult<usize> {
        let mut merged = match io::read_optional(path).await? {
            None => CallerMap::new(),
            Some(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "replacing unreadable callers file");
                CallerMap::new()
            }),
        };

        for (fingerprint, record) in self.snapshot().await {
            match merged.get_mut(&fingerprint) {
                Some(existing) => existing.absorb(record),
                None => {
                    merged.insert(fingerprint, record);
                }
            }
        }

        let bytes = serde_json::to_vec_pretty(&merged)
            .map_err(|e| ClientError::cache("failed to encode callers", e))?;
        io::write_atomic_impl(path, &bytes).await?;
        debug!(path = %path.display(), entries = merged.len(), "callers dumped");
        Ok(merged.len())
    }
}

/// Read a callers file. A file that does not exist reads as empty.
pub async fn load(path: &Path) -> ClientResult<CallerMap> {
    let Some(bytes) = io::read_optional(path).await? else {
        return Ok(CallerMap::new());
    };
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Cache {
        message: format!("invalid callers file {}: {}", path.display(), e),
    })
}

/// Cached entries that no recorded call site asked for.
pub async fn unreferenced(
    store: &dyn CacheStore,
    callers: &CallerMap,
) -> ClientResult<Vec<CacheEntryInfo>> {
    Ok(store
        .list()
        .await?
        .into_iter()
        .filter(|entry| !callers.contains_key(&entry.fingerprint))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use serde_json::json;
    use tempfile::TempDir;

    fn search(query: &str) -> (Fingerprint, Request) {
        let request = Request::from_value("search", json!({ "query": query }));
        (request.fingerprint().unwrap(), request)
    }

    #[tokio::test]
    async fn test_record_keeps_each_site_once() {
        let log = CallerLog::new();
        let (fp, request) = search("hello");

        let here = Location::caller();
        log.record(&fp, &request, here).await;
        log.record(&fp, &request, here).await;
        let there = Location::caller();
        log.record(&fp, &request, there).await;

        let sites = log.callers_of(&fp).await;
        assert_eq!(sites.len(), 2);
        assert!(sites[0] < sites[1]);
        assert_eq!(sites[0].file, file!());
        assert_eq!(sites[0].line, here.line());
    }

    #[tokio::test]
    async fn test_dump_writes_callers_json() {
        let temp_dir = TempDir::new().unwrap();
        let log = CallerLog::new();
        let (fp, request) = search("hello");
        log.record(&fp, &request, Location::caller()).await;

        assert_eq!(log.dump_into(temp_dir.path()).await.unwrap(), 1);

        let written = load(&temp_dir.path().join(CALLERS_FILE)).await.unwrap();
        let record = &written[&fp];
        assert_eq!(record.method, "search");
        assert_eq!(record.payload, json!({"query": "hello"}));
        assert_eq!(record.filename, format!("{fp}.json"));
        assert_eq!(record.callers.len(), 1);
    }

    #[tokio::test]
    async fn test_dump_merges_with_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let (fp, request) = search("hello");
        let (other_fp, other_request) = search("world");

        let earlier = CallerLog::new();
        earlier.record(&fp, &request, Location::caller()).await;
        earlier.record(&other_fp, &other_request, Location::caller()).await;
        earlier.dump_into(temp_dir.path()).await.unwrap();

        let later = CallerLog::new();
        later.record(&fp, &request, Location::caller()).await;
        assert_eq!(later.dump_into(temp_dir.path()).await.unwrap(), 2);

        let written = load(&temp_dir.path().join(CALLERS_FILE)).await.unwrap();
        assert_eq!(written[&fp].callers.len(), 2);
        assert_eq!(written[&other_fp].callers.len(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_callers_file_is_replaced() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CALLERS_FILE);
        tokio::fs::write(&path, "{ not json").await.unwrap();
        assert!(matches!(load(&path).await, Err(ClientError::Cache { .. })));

        let log = CallerLog::new();
        let (fp, request) = search("hello");
        log.record(&fp, &request, Location::caller()).await;
        assert_eq!(log.dump(&path).await.unwrap(), 1);
        assert!(load(&path).await.unwrap().contains_key(&fp));
    }

    #[tokio::test]
    async fn test_missing_callers_file_reads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let loaded = load(&temp_dir.path().join(CALLERS_FILE)).await.unwrap();
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn test_unreferenced_entries() {
        let store = MemoryCache::new();
        let (used, used_request) = search("used");
        let (stale, _) = search("stale");
        store.put(&used, b"{}").await.unwrap();
        store.put(&stale, b"{}").await.unwrap();

        let log = CallerLog::new();
        log.record(&used, &used_request, Location::caller()).await;

        let unused = unreferenced(&store, &log.snapshot().await).await.unwrap();
        assert_eq!(unused.len(), 1);
        assert_eq!(unused[0].fingerprint, stale);
    }
}
