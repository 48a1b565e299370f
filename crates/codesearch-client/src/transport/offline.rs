use async_trait::async_trait;

use crate::error::{ClientError, ClientResult};
use crate::fingerprint::Request;

use super::Transport;

/// Inert transport. Every call fails with a `Network` error without touching
/// the network. Used for replay-only runs and hermetic tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineTransport;

impl OfflineTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for OfflineTransport {
    async fn call(&self, request: &Request) -> ClientResult<Vec<u8>> {
        Err(ClientError::Network {
            message: format!(
                "network access is disabled; refusing to send {} request",
                request.method
            ),
        })
    }

    fn name(&self) -> &'static str {
        "offline"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_every_call_fails() {
        let transport = OfflineTransport::new();
        let err = transport
            .call(&Request::from_value("status", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Network { .. }));
        assert!(err.to_string().contains("network access is disabled"));
        assert_eq!(transport.name(), "offline");
    }
}
