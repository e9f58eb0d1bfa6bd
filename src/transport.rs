//! The HTTP seam every station fetch goes through.

use async_trait::async_trait;
use log::{info, warn};
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Data download or decompression failed")]
    DownloadIo(#[from] std::io::Error),

    #[error("Failed to parse JSON data")]
    JsonParse(#[from] serde_json::Error),

    #[error("Endpoint unavailable: {0}")]
    Unavailable(String),
}

/// `GET url?params` returning a JSON document.
#[async_trait]
pub trait JsonTransport: Send + Sync {
    async fn get_json(&self, url: &str, params: &[(&str, String)]) -> Result<Value, TransportError>;
}

/// [`JsonTransport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }
}

/// Turns a non-success status into [`TransportError::HttpStatus`].
pub(crate) fn check_status(
    url: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, TransportError> {
    match response.error_for_status() {
        Ok(resp) => Ok(resp),
        Err(e) => {
            warn!("HTTP error for {}: {:?}", url, e);
            Err(if let Some(status) = e.status() {
                TransportError::HttpStatus {
                    url: url.to_string(),
                    status,
                    source: e,
                }
            } else {
                TransportError::NetworkRequest(url.to_string(), e)
            })
        }
    }
}

#[async_trait]
impl JsonTransport for HttpTransport {
    async fn get_json(&self, url: &str, params: &[(&str, String)]) -> Result<Value, TransportError> {
        info!("Requesting {} with {:?}", url, params);
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| TransportError::NetworkRequest(url.to_string(), e))?;
        let response = check_status(url, response)?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::NetworkRequest(url.to_string(), e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
