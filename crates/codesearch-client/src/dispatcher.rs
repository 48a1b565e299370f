//! Request dispatch: fingerprint, consult the store, fall back to transport.
//!
//! The mode is fixed when the dispatcher is built:
//!
//! | Mode | Reads store | Calls transport | On miss |
//! |------|-------------|-----------------|---------|
//! | `live` | no | yes | call transport |
//! | `cached-first` | yes | yes | call transport |
//! | `replay-only` | yes | never | record descriptor, fail |
//!
//! Successful live responses are written back when `write_through` is set,
//! which also clears any descriptor left by an earlier replay-only miss.
//! Failures are never cached and never retried.
//!
//! Every request's call site goes into the dispatcher's [`CallerLog`].

use std::future::Future;
use std::panic::Location;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::cache::{CacheEntry, CacheStore, MissingResource};
use crate::callers::{Caller, CallerLog};
use crate::config::CacheMode;
use crate::error::{ClientError, ClientResult};
use crate::fingerprint::{Fingerprint, Request};
use crate::transport::Transport;

/// Parsed response plus where it came from.
#[derive(Debug, Clone)]
pub struct Response {
    pub fingerprint: Fingerprint,
    pub body: JsonValue,
    pub from_cache: bool,

    /// Backing file when served from a disk store.
    pub location: Option<PathBuf>,
}

/// Counter snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub network_requests: u64,
    pub missing_recorded: u64,
}

#[derive(Debug, Default)]
struct Counters {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    network_requests: AtomicU64,
    missing_recorded: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> DispatchStats {
        DispatchStats {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            network_requests: self.network_requests.load(Ordering::Relaxed),
            missing_recorded: self.missing_recorded.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug)]
pub struct Dispatcher {
    mode: CacheMode,
    write_through: bool,
    store: Arc<dyn CacheStore>,
    transport: Arc<dyn Transport>,
    counters: Counters,
    callers: CallerLog,
}

impl Dispatcher {
    pub fn new(
        mode: CacheMode,
        write_through: bool,
        store: Arc<dyn CacheStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        debug!(
            mode = %mode,
            write_through,
            store = %store.describe(),
            transport = transport.name(),
            "dispatcher created"
        );
        Self {
            mode,
            write_through,
            store,
            transport,
            counters: Counters::default(),
            callers: CallerLog::new(),
        }
    }

    pub fn mode(&self) -> CacheMode {
        self.mode
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn stats(&self) -> DispatchStats {
        self.counters.snapshot()
    }

    pub fn callers(&self) -> &CallerLog {
        &self.callers
    }

    /// Send a request and return the parsed JSON body.
    #[track_caller]
    pub fn send<'a>(
        &'a self,
        request: &'a Request,
    ) -> impl Future<Output = ClientResult<Response>> + Send + 'a {
        self.send_from(request, Location::caller())
    }

    /// [`send`](Self::send) on behalf of `caller`.
    pub async fn send_from(&self, request: &Request, caller: Caller) -> ClientResult<Response> {
        let fingerprint = request.fingerprint()?;
        self.callers.record(&fingerprint, request, caller).await;

        if self.mode.reads_cache() {
            if let Some(entry) = self.store.get(&fingerprint).await? {
                let body = parse_cached(&entry).inspect_err(|e| warn!("{}", e))?;
                Counters::bump(&self.counters.cache_hits);
                debug!(method = %request.method, fingerprint = %fingerprint.short(), "cache hit");
                return Ok(Response {
                    fingerprint,
                    body,
                    from_cache: true,
                    location: entry.location,
                });
            }
            Counters::bump(&self.counters.cache_misses);
            debug!(method = %request.method, fingerprint = %fingerprint.short(), "cache miss");
        }

        if !self.mode.allows_network() {
            return Err(self.record_missing(fingerprint, request).await?);
        }

        Counters::bump(&self.counters.network_requests);
        let bytes = self.transport.call(request).await?;
        let body: JsonValue =
            serde_json::from_slice(&bytes).map_err(|e| ClientError::Server {
                status: 200,
                message: format!("malformed response: {}", e),
            })?;

        if self.write_through {
            self.write_back(&fingerprint, &bytes).await;
        }

        Ok(Response {
            fingerprint,
            body,
            from_cache: false,
            location: None,
        })
    }

    /// Send a request and decode the body into `T`.
    #[track_caller]
    pub fn send_as<'a, T>(
        &'a self,
        request: &'a Request,
    ) -> impl Future<Output = ClientResult<T>> + Send + 'a
    where
        T: DeserializeOwned + Send + 'a,
    {
        self.send_as_from(request, Location::caller())
    }

    /// [`send_as`](Self::send_as) on behalf of `caller`.
    pub async fn send_as_from<T: DeserializeOwned>(
        &self,
        request: &Request,
        caller: Caller,
    ) -> ClientResult<T> {
        let response = self.send_from(request, caller).await?;
        serde_json::from_value(response.body).map_err(|e| {
            if response.from_cache {
                ClientError::CorruptCacheEntry {
                    fingerprint: response.fingerprint,
                    path: response.location,
                    reason: format!("cached {} response does not decode: {}", request.method, e),
                }
            } else {
                ClientError::Server {
                    status: 200,
                    message: format!("malformed {} response: {}", request.method, e),
                }
            }
        })
    }

    /// Cache write failures are logged, not returned.
    async fn write_back(&self, fingerprint: &Fingerprint, bytes: &[u8]) {
        if let Err(e) = self.store.put(fingerprint, bytes).await {
            warn!(fingerprint = %fingerprint.short(), error = %e, "failed to cache response");
            return;
        }
        if let Err(e) = self.store.remove_missing(fingerprint).await {
            warn!(fingerprint = %fingerprint.short(), error = %e, "failed to remove missing descriptor");
        }
    }

    async fn record_missing(
        &self,
        fingerprint: Fingerprint,
        request: &Request,
    ) -> ClientResult<ClientError> {
        let missing = MissingResource::new(fingerprint.clone(), request);
        let descriptor = self.store.record_missing(&missing).await?;
        Counters::bump(&self.counters.missing_recorded);

        let err = ClientError::ResourceNotCached {
            fingerprint,
            method: request.method.clone(),
            descriptor,
        };
        warn!("{}", err);
        Ok(err)
    }
}

fn parse_cached(entry: &CacheEntry) -> ClientResult<JsonValue> {
    serde_json::from_slice(&entry.payload).map_err(|e| ClientError::CorruptCacheEntry {
        fingerprint: entry.fingerprint.clone(),
        path: entry.location.clone(),
        reason: e.to_string(),
    })
}
