use log::debug;
use reqwest::Client;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Server answered with status {0}")]
    Status(u16),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid response body: {0}")]
    Decode(reqwest::Error),
}

/// Source of the latest reading for a device.
pub trait LatestFetcher {
    fn fetch_latest(&self, device_id: &str) -> impl Future<Output = Result<Value, FetchError>> + Send;
}

/// Client for `GET /api/data/latest/{deviceId}`.
#[derive(Clone)]
pub struct TelemetryClient {
    client: Client,
    base_url: String,
}

impl TelemetryClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn latest_url(&self, device_id: &str) -> String {
        format!("{}/api/data/latest/{}", self.base_url, device_id)
    }
}

impl LatestFetcher for TelemetryClient {
    async fn fetch_latest(&self, device_id: &str) -> Result<Value, FetchError> {
        let url = self.latest_url(device_id);
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        response.json::<Value>().await.map_err(FetchError::Decode)
    }
}
