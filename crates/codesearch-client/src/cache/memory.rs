//! Ephemeral in-process store.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::DEFAULT_MEMORY_TTL_SECS;
use crate::error::ClientResult;
use crate::fingerprint::Fingerprint;

use super::{policy, CacheEntry, CacheEntryInfo, CacheStore, MissingResource};

#[derive(Debug, Clone)]
struct Slot {
    payload: Vec<u8>,
    created_at: DateTime<Utc>,
}

/// In-memory store. Entries expire after 30 minutes unless configured otherwise.
#[derive(Debug)]
pub struct MemoryCache {
    entries: RwLock<HashMap<Fingerprint, Slot>>,
    missing: RwLock<HashMap<Fingerprint, MissingResource>>,
    ttl: Option<Duration>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_ttl(Some(Duration::from_secs(DEFAULT_MEMORY_TTL_SECS)))
    }

    pub fn with_ttl(ttl: Option<Duration>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            missing: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, fingerprint: &Fingerprint) -> ClientResult<Option<CacheEntry>> {
        let entries = self.entries.read().await;
        let Some(slot) = entries.get(fingerprint) else {
            return Ok(None);
        };

        let expires_at = policy::expires_at_impl(slot.created_at, self.ttl);
        if policy::is_expired_impl(expires_at, Utc::now()) {
            debug!(fingerprint = %fingerprint.short(), "memory cache entry expired");
            return Ok(None);
        }

        Ok(Some(CacheEntry {
            fingerprint: fingerprint.clone(),
            payload: slot.payload.clone(),
            created_at: slot.created_at,
            expires_at,
            location: None,
        }))
    }

    async fn put(&self, fingerprint: &Fingerprint, payload: &[u8]) -> ClientResult<()> {
        self.entries.write().await.insert(
            fingerprint.clone(),
            Slot {
                payload: payload.to_vec(),
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn record_missing(&self, missing: &MissingResource) -> ClientResult<Option<PathBuf>> {
        self.missing
            .write()
            .await
            .insert(missing.fingerprint.clone(), missing.clone());
        Ok(None)
    }

    async fn remove(&self, fingerprint: &Fingerprint) -> ClientResult<()> {
        self.entries.write().await.remove(fingerprint);
        Ok(())
    }

    async fn get_missing(
        &self,
        fingerprint: &Fingerprint,
    ) -> ClientResult<Option<MissingResource>> {
        Ok(self.missing.read().await.get(fingerprint).cloned())
    }

    async fn list_missing(&self) -> ClientResult<Vec<MissingResource>> {
        let mut result: Vec<_> = self.missing.read().await.values().cloned().collect();
        result.sort_by(|a, b| a.fingerprint.cmp(&b.fingerprint));
        Ok(result)
    }

    async fn remove_missing(&self, fingerprint: &Fingerprint) -> ClientResult<()> {
        self.missing.write().await.remove(fingerprint);
        Ok(())
    }

    async fn list(&self) -> ClientResult<Vec<CacheEntryInfo>> {
        let mut result: Vec<_> = self
            .entries
            .read()
            .await
            .iter()
            .map(|(fingerprint, slot)| CacheEntryInfo {
                fingerprint: fingerprint.clone(),
                size: slot.payload.len() as u64,
                created_at: slot.created_at,
                expires_at: policy::expires_at_impl(slot.created_at, self.ttl),
            })
            .collect();
        result.sort_by(|a, b| a.fingerprint.cmp(&b.fingerprint));
        Ok(result)
    }

    async fn purge_expired(&self) -> ClientResult<usize> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, slot| {
            !policy::is_expired_impl(policy::expires_at_impl(slot.created_at, self.ttl), now)
        });
        Ok(before - entries.len())
    }

    async fn clear(&self) -> ClientResult<()> {
        self.entries.write().await.clear();
        self.missing.write().await.clear();
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
