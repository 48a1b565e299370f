//! High-level code search client.
//!
//! Builds compound requests, sends them through the [`Dispatcher`], and
//! unwraps the single sub-response each helper asked for. No caching or
//! status code knowledge lives here.
//!
//! Query methods are `#[track_caller]` and return their future, so the call
//! site recorded in the dispatcher's [`CallerLog`] is the caller's, not this
//! module's.

use std::collections::HashMap;
use std::future::Future;
use std::panic::Location;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::{CacheStore, DiskCache, MemoryCache};
use crate::callers::{Caller, CallerLog};
use crate::config::{CacheMode, ClientConfig};
use crate::dispatcher::{DispatchStats, Dispatcher};
use crate::error::{ClientError, ClientResult};
use crate::messages::{
    Annotation, AnnotationRequest, AnnotationType, CompoundRequest, CompoundResponse, EdgeKind,
    FileInfo, FileInfoRequest, FileSpec, SearchRequest, SearchResult, StatusResponse,
    XrefSearchRequest, XrefSearchResult,
};
use crate::transport::{HttpTransport, OfflineTransport, Transport};

mod xref;

pub use xref::XrefNode;

/// Code search client.
#[derive(Debug)]
pub struct CodeSearchClient {
    config: ClientConfig,
    dispatcher: Dispatcher,
    file_info_cache: RwLock<HashMap<String, FileInfo>>,
}

impl CodeSearchClient {
    /// Wire a client from configuration.
    ///
    /// A `cache_dir` selects the disk store, otherwise responses are kept in
    /// memory. Replay-only clients get an [`OfflineTransport`].
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        config.validate()?;

        let store: Arc<dyn CacheStore> = match &config.cache_dir {
            Some(dir) => Arc::new(DiskCache::with_dir(dir.clone()).with_ttl(config.cache_ttl())),
            None => match config.cache_ttl() {
                Some(ttl) => Arc::new(MemoryCache::with_ttl(Some(ttl))),
                None => Arc::new(MemoryCache::new()),
            },
        };

        let transport: Arc<dyn Transport> = if config.cache_mode == CacheMode::ReplayOnly {
            Arc::new(OfflineTransport::new())
        } else {
            Arc::new(HttpTransport::new(&config)?)
        };

        Ok(Self::with_parts(config, store, transport))
    }

    pub fn from_env() -> ClientResult<Self> {
        Self::new(ClientConfig::from_env_strict()?)
    }

    /// Build a client around an explicit store and transport.
    pub fn with_parts(
        config: ClientConfig,
        store: Arc<dyn CacheStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let dispatcher =
            Dispatcher::new(config.cache_mode, config.write_through, store, transport);
        Self {
            config,
            dispatcher,
            file_info_cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        self.dispatcher.store()
    }

    pub fn stats(&self) -> DispatchStats {
        self.dispatcher.stats()
    }

    pub fn callers(&self) -> &CallerLog {
        self.dispatcher.callers()
    }

    /// Merge the call sites seen so far into `callers.json` in the cache
    /// directory. Returns the number of fingerprints in the file.
    pub async fn dump_callers(&self) -> ClientResult<usize> {
        let Some(dir) = &self.config.cache_dir else {
            return Err(ClientError::Config {
                message: "dumping callers needs a cache directory".to_string(),
            });
        };
        self.callers().dump_into(dir).await
    }

    /// File spec for a path relative to the source root.
    ///
    /// An empty path names the root (`.`).
    pub fn file_spec(&self, path: &str) -> FileSpec {
        let mut name = path.trim();
        while let Some(rest) = name.strip_prefix("./") {
            name = rest;
        }
        let name = name.trim_end_matches('/');
        let name = if name.is_empty() { "." } else { name };
        FileSpec::new(name, self.config.package_name.clone())
    }

    #[track_caller]
    pub fn send_request<'a>(
        &'a self,
        request: &'a CompoundRequest,
    ) -> impl Future<Output = ClientResult<CompoundResponse>> + Send + 'a {
        self.send_request_from(request, Location::caller())
    }

    async fn send_request_from(
        &self,
        request: &CompoundRequest,
        caller: Caller,
    ) -> ClientResult<CompoundResponse> {
        let request = request.to_request()?;
        self.dispatcher.send_as_from(&request, caller).await
    }

    /// Text search.
    #[track_caller]
    pub fn search<'a>(
        &'a self,
        query: &'a str,
        max_results: u32,
    ) -> impl Future<Output = ClientResult<Vec<SearchResult>>> + Send + 'a {
        self.search_from(query, max_results, Location::caller())
    }

    async fn search_from(
        &self,
        query: &str,
        max_results: u32,
        caller: Caller,
    ) -> ClientResult<Vec<SearchResult>> {
        let request = SearchRequest {
            return_line_matches: true,
            ..SearchRequest::new(query).with_max_results(max_results)
        };
        let response = self
            .send_request_from(&CompoundRequest::search(request), caller)
            .await?;

        Ok(first(response.search_response)
            .map(|r| r.search_result)
            .unwrap_or_default())
    }

    /// Outgoing edges of `signature`, optionally restricted to `edge_filter`.
    #[track_caller]
    pub fn xrefs<'a>(
        &'a self,
        signature: &'a str,
        edge_filter: &'a [EdgeKind],
        max_results: u32,
    ) -> impl Future<Output = ClientResult<Vec<XrefSearchResult>>> + Send + 'a {
        self.xrefs_from(signature, edge_filter, max_results, Location::caller())
    }

    async fn xrefs_from(
        &self,
        signature: &str,
        edge_filter: &[EdgeKind],
        max_results: u32,
        caller: Caller,
    ) -> ClientResult<Vec<XrefSearchResult>> {
        let request = XrefSearchRequest {
            file_spec: self.file_spec(""),
            query: signature.to_string(),
            max_num_results: max_results,
            edge_filter: edge_filter.to_vec(),
        };
        let response = self
            .send_request_from(&CompoundRequest::xref_search(request), caller)
            .await?;

        Ok(first(response.xref_search_response)
            .map(|r| r.search_result)
            .unwrap_or_default())
    }

    /// File metadata and content. Memoised per path.
    #[track_caller]
    pub fn file_info<'a>(
        &'a self,
        path: &'a str,
    ) -> impl Future<Output = ClientResult<FileInfo>> + Send + 'a {
        self.file_info_from(path, Location::caller())
    }

    async fn file_info_from(&self, path: &str, caller: Caller) -> ClientResult<FileInfo> {
        self.file_info_with_from(FileInfoRequest::new(self.file_spec(path)), caller)
            .await
    }

    /// File info with explicit options. Only plain requests are memoised.
    #[track_caller]
    pub fn file_info_with(
        &self,
        request: FileInfoRequest,
    ) -> impl Future<Output = ClientResult<FileInfo>> + Send + '_ {
        self.file_info_with_from(request, Location::caller())
    }

    async fn file_info_with_from(
        &self,
        request: FileInfoRequest,
        caller: Caller,
    ) -> ClientResult<FileInfo> {
        let plain = request.is_plain();
        let key = request.file_spec.name.clone();

        if plain {
            if let Some(info) = self.file_info_cache.read().await.get(&key) {
                debug!(path = %key, "file info memo hit");
                return Ok(info.clone());
            }
        }

        let response = self
            .send_request_from(&CompoundRequest::file_info(request), caller)
            .await?;
        let Some(file_response) = first(response.file_info_response) else {
            return Err(no_file_info(&key, ""));
        };
        let Some(info) = file_response.file_info else {
            return Err(no_file_info(&key, &file_response.error_message));
        };

        if plain {
            self.file_info_cache
                .write()
                .await
                .insert(key, info.clone());
        }
        Ok(info)
    }

    /// Definition links and xref signatures in a file.
    #[track_caller]
    pub fn annotations<'a>(
        &'a self,
        path: &'a str,
    ) -> impl Future<Output = ClientResult<Vec<Annotation>>> + Send + 'a {
        self.annotations_from(path, Location::caller())
    }

    async fn annotations_from(&self, path: &str, caller: Caller) -> ClientResult<Vec<Annotation>> {
        let request = AnnotationRequest {
            file_spec: self.file_spec(path),
            types: vec![
                AnnotationType::new(AnnotationType::LINK_TO_DEFINITION),
                AnnotationType::new(AnnotationType::XREF_SIGNATURE),
            ],
            md5: String::new(),
        };
        let response = self
            .send_request_from(&CompoundRequest::annotation(request), caller)
            .await?;

        Ok(first(response.annotation_response)
            .map(|r| r.annotation)
            .unwrap_or_default())
    }

    #[track_caller]
    pub fn status(&self) -> impl Future<Output = ClientResult<StatusResponse>> + Send + '_ {
        self.status_from(Location::caller())
    }

    async fn status_from(&self, caller: Caller) -> ClientResult<StatusResponse> {
        let response = self
            .send_request_from(&CompoundRequest::status(), caller)
            .await?;
        Ok(first(response.status_response).unwrap_or_default())
    }

    /// Signature of the first annotated symbol covering `line:column`.
    #[track_caller]
    pub fn signature_for_location<'a>(
        &'a self,
        path: &'a str,
        line: u32,
        column: u32,
    ) -> impl Future<Output = ClientResult<Option<String>>> + Send + 'a {
        self.signature_for_location_from(path, line, column, Location::caller())
    }

    async fn signature_for_location_from(
        &self,
        path: &str,
        line: u32,
        column: u32,
        caller: Caller,
    ) -> ClientResult<Option<String>> {
        let annotations = self.annotations_from(path, caller).await?;
        Ok(annotations
            .iter()
            .filter(|a| a.range.contains(line, column))
            .find_map(|a| a.signature().map(str::to_string)))
    }

    /// Signature of a named symbol declared or referenced in `path`.
    #[track_caller]
    pub fn signature_for_symbol<'a>(
        &'a self,
        path: &'a str,
        symbol: &'a str,
    ) -> impl Future<Output = ClientResult<Option<String>>> + Send + 'a {
        self.signature_for_symbol_from(path, symbol, Location::caller())
    }

    async fn signature_for_symbol_from(
        &self,
        path: &str,
        symbol: &str,
        caller: Caller,
    ) -> ClientResult<Option<String>> {
        let call = format!("{}(", symbol);
        let member = format!("::{}", symbol);
        let class = format!("class-{}", symbol);

        let annotations = self.annotations_from(path, caller).await?;
        for annotation in &annotations {
            if let Some(xref) = &annotation.xref_signature {
                if xref.signature.contains(&call) {
                    return Ok(Some(xref.signature.clone()));
                }
            } else if let Some(link) = &annotation.internal_link {
                if link.signature.contains(&member) || link.signature.contains(&class) {
                    return Ok(Some(link.signature.clone()));
                }
            }
        }
        Ok(None)
    }
}

fn first<T>(list: Option<Vec<T>>) -> Option<T> {
    list.and_then(|items| items.into_iter().next())
}

fn no_file_info(path: &str, server_message: &str) -> ClientError {
    let message = if server_message.is_empty() {
        format!("no file info returned for {}", path)
    } else {
        format!("no file info returned for {}: {}", path, server_message)
    };
    ClientError::Server {
        status: 200,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> CodeSearchClient {
        let config = ClientConfig::default().with_package_name("chromium");
        CodeSearchClient::with_parts(
            config,
            Arc::new(MemoryCache::new()),
            Arc::new(OfflineTransport::new()),
        )
    }

    #[test]
    fn test_file_spec_normalises_paths() {
        let client = client();
        assert_eq!(client.file_spec("").name, ".");
        assert_eq!(client.file_spec("./").name, ".");
        assert_eq!(client.file_spec("./base/logging.h").name, "base/logging.h");
        assert_eq!(client.file_spec("net/http/").name, "net/http");
        assert_eq!(client.file_spec("net").package_name, "chromium");
    }

    #[test]
    fn test_replay_only_config_gets_offline_transport() {
        let config = ClientConfig::default().with_cache_mode(CacheMode::ReplayOnly);
        let client = CodeSearchClient::new(config).unwrap();
        assert_eq!(client.dispatcher().transport().name(), "offline");
        assert_eq!(client.store().describe(), "memory");
    }

    #[test]
    fn test_cache_dir_selects_disk_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::default().with_cache_dir(dir.path());
        let client = CodeSearchClient::new(config).unwrap();
        assert!(client.store().describe().starts_with("disk:"));
        assert_eq!(client.dispatcher().transport().name(), "http");
    }

    #[tokio::test]
    async fn test_query_methods_record_the_callers_location() {
        let client = client();
        let line = line!() + 1;
        client.search("LOG", 5).await.unwrap_err();

        let snapshot = client.callers().snapshot().await;
        let record = snapshot.values().next().unwrap();
        assert_eq!(record.method, "search");
        assert_eq!(record.callers.len(), 1);
        assert_eq!(record.callers[0].file, file!());
        assert_eq!(record.callers[0].line, line);
    }

    #[tokio::test]
    async fn test_dump_callers_needs_a_cache_dir() {
        let err = client().dump_callers().await.unwrap_err();
        assert!(matches!(err, ClientError::Config { .. }));
    }

    #[tokio::test]
    async fn test_offline_miss_surfaces_network_error() {
        let client = client();
        let err = client.status().await.unwrap_err();
        assert!(matches!(err, ClientError::Network { .. }));
    }
}
