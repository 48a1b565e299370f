//! Transport layer: turns a [`Request`] into raw response bytes.
//!
//! No caching happens here. Implementations only perform the call and
//! classify failures as `Network` or `Server`.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::ClientResult;
use crate::fingerprint::Request;

mod http;
mod offline;
pub mod query;

pub use http::{HttpTransport, MAX_GET_URL_LEN};
pub use offline::OfflineTransport;

/// Performs the network call for a request.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Send `request` and return the response body.
    ///
    /// A returned body is always well-formed JSON.
    async fn call(&self, request: &Request) -> ClientResult<Vec<u8>>;

    fn name(&self) -> &'static str;
}
