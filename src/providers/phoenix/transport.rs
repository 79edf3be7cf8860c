use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::error::{ErrorValue, MediaProviderError, Result};

/// Request timeout used when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// One request against the catalog API.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRequest {
    pub url: String,
    pub body: Value,
    /// Short label for logs
    pub tag: &'static str,
}

/// Raw catalog reply, before any interpretation beyond the HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogResponse {
    pub status: u16,
    pub body: String,
}

impl CatalogResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes catalog requests. Connection failures and timeouts are reported
/// as `TransportFailure`; HTTP status interpretation is left to the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogTransport: Send + Sync {
    async fn execute(&self, request: CatalogRequest) -> std::result::Result<CatalogResponse, ErrorValue>;
}

/// `reqwest`-backed transport posting JSON bodies.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("mediaproviders/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(MediaProviderError::Http)?;

        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(concat!("mediaproviders/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("HTTP client creation should not fail");

        Self::with_client(client)
    }
}

#[async_trait]
impl CatalogTransport for HttpTransport {
    async fn execute(&self, request: CatalogRequest) -> std::result::Result<CatalogResponse, ErrorValue> {
        debug!("Sending {} request to: {}", request.tag, request.url);

        let response = self.client
            .post(&request.url)
            .json(&request.body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ErrorValue::transport(format!("{} request timed out: {}", request.tag, e))
                } else {
                    ErrorValue::transport(format!("{} request failed: {}", request.tag, e))
                }
            })?;

        let status = response.status().as_u16();
        let body = response.text().await
            .map_err(|e| ErrorValue::transport(format!("Failed to read {} response: {}", request.tag, e)))?;

        debug!("{} response status {} ({} bytes)", request.tag, status, body.len());
        Ok(CatalogResponse { status, body })
    }
}
