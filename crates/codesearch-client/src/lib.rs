//! Client for a code search JSON RPC backend.
//!
//! This crate provides:
//!
//! - Typed request/response messages and a high-level [`CodeSearchClient`]
//! - Content-addressed response caching on disk or in memory
//! - Three cache modes: live, cached-first and replay-only
//! - Missing-resource descriptors for out-of-band fixture fetching
//!
//! # Quick Start
//!
//! ```no_run
//! use codesearch_client::{CacheMode, ClientConfig, CodeSearchClient};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ClientConfig::default()
//!     .with_cache_dir("testdata/responses")
//!     .with_cache_mode(CacheMode::CachedFirst);
//! let client = CodeSearchClient::new(config)?;
//!
//! for result in client.search("LOG(INFO)", 5).await? {
//!     println!("{}", result.top_file.file.name);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Replay
//!
//! In replay-only mode the client never touches the network. A miss writes
//! `<fingerprint>.missing` next to the cached responses and fails with
//! [`ClientError::ResourceNotCached`]. Running `codesearch fetch-missing <dir>`
//! fetches every recorded request and stores the responses.
//!
//! Every request also notes its call site. [`CodeSearchClient::dump_callers`]
//! merges them into `callers.json`, and `codesearch cache unused <dir>` lists
//! cached responses that no recorded call site asked for.
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `CODESEARCH_HOST` | Backend base URL (default: `https://cs.chromium.org`) |
//! | `CODESEARCH_TIMEOUT` | Request timeout in seconds (default: 3) |
//! | `CODESEARCH_USER_AGENT` | User-Agent header |
//! | `CODESEARCH_PACKAGE` | Package name for file specs (default: `chromium`) |
//! | `CODESEARCH_CACHE_MODE` | `live`, `cached-first` or `replay-only` (default: `live`) |
//! | `CODESEARCH_CACHE_DIR` | Persistent cache directory (default: in-memory) |
//! | `CODESEARCH_CACHE_TTL` | Entry expiry in seconds (default: none on disk, 1800 in memory) |

pub mod cache;
pub mod callers;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod fingerprint;
pub mod fixtures;
pub mod messages;
pub mod transport;

// Re-export main types
pub use cache::{
    CacheEntry, CacheEntryInfo, CacheStore, DiskCache, MemoryCache, MissingResource,
    ENTRY_SUFFIX, MISSING_SUFFIX,
};
pub use callers::{CallSite, CallerLog, CallerMap, CallerRecord, CALLERS_FILE};
pub use client::{CodeSearchClient, XrefNode};
pub use config::{CacheMode, ClientConfig};
pub use dispatcher::{DispatchStats, Dispatcher, Response};
pub use error::{ClientError, ClientResult};
pub use fingerprint::{fingerprint, Fingerprint, Request};
pub use fixtures::{resolve_missing, FixtureState, ResolveFailure, ResolveReport};
pub use messages::{
    Annotation, AnnotationRequest, CompoundRequest, CompoundResponse, EdgeKind, FileInfo,
    FileInfoRequest, FileSpec, SearchRequest, SearchResult, StatusRequest, StatusResponse,
    TextRange, XrefSearchRequest, XrefSearchResult, XrefSingleMatch,
};
pub use transport::{HttpTransport, OfflineTransport, Transport};
