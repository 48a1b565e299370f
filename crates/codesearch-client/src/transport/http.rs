//! HTTP transport: status mapping and GET/POST selection.
//!
//! This is the ONLY place that interprets status codes. One attempt per
//! call; retrying is left to the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::fingerprint::Request;

use super::{query, Transport};

/// URLs longer than this are sent as POST with the query in the body.
pub const MAX_GET_URL_LEN: usize = 1500;

const MAX_ERROR_BODY_CHARS: usize = 200;

/// Transport backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint_url: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let user_agent =
            HeaderValue::from_str(&config.user_agent).map_err(|e| ClientError::Config {
                message: format!("invalid user agent {:?}: {}", config.user_agent, e),
            })?;
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, user_agent);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| ClientError::Network {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        let endpoint_url = format!(
            "{}/{}",
            config.host.trim_end_matches('/'),
            config.endpoint.trim_start_matches('/')
        );

        Ok(Self {
            client,
            endpoint_url,
        })
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    async fn send_once(&self, request: &Request) -> ClientResult<reqwest::Response> {
        let qs = query::encode_query_string(&request.payload)?;
        let url = if qs.is_empty() {
            self.endpoint_url.clone()
        } else {
            format!("{}?{}", self.endpoint_url, qs)
        };

        let builder = if url.len() > MAX_GET_URL_LEN {
            debug!(method = %request.method, len = url.len(), "url too long, using POST");
            self.client
                .post(&self.endpoint_url)
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(qs)
        } else {
            debug!(method = %request.method, url = %url, "GET");
            self.client.get(&url)
        };

        Ok(builder.send().await?)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(&self, request: &Request) -> ClientResult<Vec<u8>> {
        let response = self.send_once(request).await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message: String = if body.trim().is_empty() {
                status.to_string()
            } else {
                body.chars().take(MAX_ERROR_BODY_CHARS).collect()
            };
            return Err(ClientError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await.map_err(|e| ClientError::Network {
            message: format!("failed to read response body: {}", e),
        })?;

        if let Err(e) = serde_json::from_slice::<serde::de::IgnoredAny>(&body) {
            return Err(ClientError::Server {
                status: status.as_u16(),
                message: format!("malformed response: {}", e),
            });
        }

        debug!(method = %request.method, bytes = body.len(), "response received");
        Ok(body.to_vec())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
