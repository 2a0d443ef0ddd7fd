//! HTTP client for the data-acquisition gateway.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::normalize::{self, Reading};
use crate::config::GatewayConfig;
use crate::types::TestCommand;

/// Gateway request errors
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("gateway returned HTTP {0}")]
    Status(reqwest::StatusCode),
}

/// Client for the rig gateway's live-data and command endpoints.
///
/// Each call is an independent request with a bounded timeout; the client
/// holds no connection state beyond reqwest's internal pool.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    collection_url: String,
    write_url: String,
}

impl GatewayClient {
    pub fn new(cfg: &GatewayConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            collection_url: cfg.collection_url(),
            write_url: cfg.write_url(),
        })
    }

    /// One uncached read of the live endpoint, normalized.
    ///
    /// An unreachable gateway and an unusable payload both map to
    /// [`Reading::Empty`] — errors never escape this call, and no value is
    /// ever fabricated.
    pub async fn fetch_current(&self) -> Reading {
        match self.fetch_raw().await {
            Ok(payload) => normalize::normalize(&payload),
            Err(e) => {
                debug!(error = %e, "live data fetch failed");
                Reading::Empty
            }
        }
    }

    /// Fetch the raw live payload without normalization.
    pub async fn fetch_raw(&self) -> Result<Value, GatewayError> {
        let resp = self
            .http
            .get(&self.collection_url)
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(GatewayError::Status(resp.status()));
        }

        Ok(resp.json::<Value>().await?)
    }

    /// Forward an operator command to the gateway write endpoint.
    ///
    /// Returns the gateway's response body (null when the body is empty or
    /// not JSON — some flows acknowledge with a bare 200).
    pub async fn send_command(&self, command: &TestCommand) -> Result<Value, GatewayError> {
        let resp = self.http.post(&self.write_url).json(command).send().await?;

        if !resp.status().is_success() {
            return Err(GatewayError::Status(resp.status()));
        }

        Ok(resp.json::<Value>().await.unwrap_or(Value::Null))
    }

    /// Collection endpoint URL, for status displays.
    pub fn collection_url(&self) -> &str {
        &self.collection_url
    }
}
