//! Persistent directory-backed store.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};
use crate::fingerprint::Fingerprint;

use super::keys::{self, FileKind};
use super::{io, policy, CacheEntry, CacheEntryInfo, CacheStore, MissingResource};

/// Directory of `{fingerprint}.json` response files.
///
/// Any number of stores (and processes) may share one directory.
#[derive(Debug, Clone)]
pub struct DiskCache {
    cache_dir: PathBuf,
    ttl: Option<Duration>,
}

impl DiskCache {
    /// Create a cache at the default location (`~/.cache/codesearch/responses`).
    pub fn new() -> ClientResult<Self> {
        Ok(Self::with_dir(io::default_cache_dir_impl()?))
    }

    /// Create a cache rooted at `cache_dir`. The directory is created on first write.
    pub fn with_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ttl: None,
        }
    }

    /// Expire entries `ttl` after they were written.
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    pub fn entry_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        keys::entry_path(&self.cache_dir, fingerprint)
    }

    pub fn missing_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        keys::missing_path(&self.cache_dir, fingerprint)
    }

    async fn classified_files(&self) -> ClientResult<Vec<(Fingerprint, FileKind, PathBuf)>> {
        let names = io::list_file_names(&self.cache_dir).await?;
        Ok(names
            .into_iter()
            .filter_map(|name| {
                keys::classify(&name).map(|(fp, kind)| (fp, kind, self.cache_dir.join(&name)))
            })
            .collect())
    }

    async fn read_missing(&self, path: &Path) -> ClientResult<Option<MissingResource>> {
        let Some(bytes) = io::read_optional(path).await? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| ClientError::Cache {
                message: format!("invalid missing-resource descriptor {}: {}", path.display(), e),
            })
    }
}

#[async_trait]
impl CacheStore for DiskCache {
    async fn get(&self, fingerprint: &Fingerprint) -> ClientResult<Option<CacheEntry>> {
        let path = self.entry_path(fingerprint);

        let Some((_, created_at)) = io::stat(&path).await? else {
            debug!(fingerprint = %fingerprint.short(), "response not in cache");
            return Ok(None);
        };

        let expires_at = policy::expires_at_impl(created_at, self.ttl);
        if policy::is_expired_impl(expires_at, Utc::now()) {
            debug!(
                fingerprint = %fingerprint.short(),
                created_at = %created_at,
                "cache entry expired"
            );
            return Ok(None);
        }

        // The entry may have been removed between stat and read.
        let Some(payload) = io::read_optional(&path).await? else {
            return Ok(None);
        };

        debug!(fingerprint = %fingerprint.short(), bytes = payload.len(), "cache hit");
        Ok(Some(CacheEntry {
            fingerprint: fingerprint.clone(),
            payload,
            created_at,
            expires_at,
            location: Some(path),
        }))
    }

    async fn put(&self, fingerprint: &Fingerprint, payload: &[u8]) -> ClientResult<()> {
        let path = self.entry_path(fingerprint);
        io::write_atomic_impl(&path, payload).await?;
        debug!(fingerprint = %fingerprint.short(), bytes = payload.len(), "cached response");
        Ok(())
    }

    async fn record_missing(&self, missing: &MissingResource) -> ClientResult<Option<PathBuf>> {
        let path = self.missing_path(&missing.fingerprint);
        let json = serde_json::to_vec_pretty(missing).map_err(|e| ClientError::Cache {
            message: format!("failed to serialize missing-resource descriptor: {}", e),
        })?;
        io::write_atomic_impl(&path, &json).await?;
        debug!(
            fingerprint = %missing.fingerprint.short(),
            method = %missing.method,
            path = %path.display(),
            "recorded missing resource"
        );
        Ok(Some(path))
    }

    async fn remove(&self, fingerprint: &Fingerprint) -> ClientResult<()> {
        if io::remove_if_exists(&self.entry_path(fingerprint)).await? {
            debug!(fingerprint = %fingerprint.short(), "evicted from cache");
        }
        Ok(())
    }

    async fn get_missing(
        &self,
        fingerprint: &Fingerprint,
    ) -> ClientResult<Option<MissingResource>> {
        self.read_missing(&self.missing_path(fingerprint)).await
    }

    async fn list_missing(&self) -> ClientResult<Vec<MissingResource>> {
        let mut result = Vec::new();
        for (fingerprint, kind, path) in self.classified_files().await? {
            if kind != FileKind::Missing {
                continue;
            }
            match self.read_missing(&path).await {
                Ok(Some(missing)) if missing.fingerprint == fingerprint => result.push(missing),
                Ok(Some(missing)) => warn!(
                    path = %path.display(),
                    recorded = %missing.fingerprint.short(),
                    "descriptor fingerprint does not match its file name; skipping"
                ),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "skipping unreadable descriptor"),
            }
        }
        Ok(result)
    }

    async fn remove_missing(&self, fingerprint: &Fingerprint) -> ClientResult<()> {
        io::remove_if_exists(&self.missing_path(fingerprint)).await?;
        Ok(())
    }

    async fn list(&self) -> ClientResult<Vec<CacheEntryInfo>> {
        let mut result = Vec::new();
        for (fingerprint, kind, path) in self.classified_files().await? {
            if kind != FileKind::Entry {
                continue;
            }
            if let Some((size, created_at)) = io::stat(&path).await? {
                result.push(CacheEntryInfo {
                    fingerprint,
                    size,
                    created_at,
                    expires_at: policy::expires_at_impl(created_at, self.ttl),
                });
            }
        }
        Ok(result)
    }

    async fn purge_expired(&self) -> ClientResult<usize> {
        if self.ttl.is_none() {
            return Ok(0);
        }

        let now = Utc::now();
        let mut removed = 0;
        for info in self.list().await? {
            if policy::is_expired_impl(info.expires_at, now)
                && io::remove_if_exists(&self.entry_path(&info.fingerprint)).await?
            {
                removed += 1;
            }
        }

        debug!(removed, dir = %self.cache_dir.display(), "purged expired entries");
        Ok(removed)
    }

    async fn clear(&self) -> ClientResult<()> {
        for (_, _, path) in self.classified_files().await? {
            io::remove_if_exists(&path).await?;
        }
        debug!(dir = %self.cache_dir.display(), "cleared response cache");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("disk:{}", self.cache_dir.display())
    }
}
