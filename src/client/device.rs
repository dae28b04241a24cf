//! AgriShield HTTP API Client
//!
//! Provides a typed client for the device's REST surface. Every response is
//! checked against its [`EndpointContract`] and decoded once; failures come
//! back as a [`DeviceError`] that knows which [`FailureKind`] it belongs to.

use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

use super::contract::{self, EndpointContract};
use super::types::*;
use crate::checks::FailureKind;

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that can occur when talking to the device
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("{endpoint} returned 404 Not Found")]
    NotFound { endpoint: &'static str },

    #[error("{endpoint} returned HTTP {status}")]
    HttpStatus {
        endpoint: &'static str,
        status: StatusCode,
    },

    #[error("{endpoint} returned a malformed body: {reason}")]
    MalformedBody {
        endpoint: &'static str,
        reason: String,
    },

    #[error("{endpoint} response is missing field(s): {}", .fields.join(", "))]
    MissingFields {
        endpoint: &'static str,
        fields: Vec<&'static str>,
    },

    #[error("{endpoint} response has an invalid value: {source}")]
    InvalidValue {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl DeviceError {
    /// Which part of the error taxonomy this error falls in
    pub fn kind(&self) -> FailureKind {
        match self {
            DeviceError::Request(e) if e.is_decode() => FailureKind::Schema,
            DeviceError::Request(_)
            | DeviceError::InvalidUrl(_)
            | DeviceError::NotFound { .. }
            | DeviceError::HttpStatus { .. } => FailureKind::Transport,
            DeviceError::MalformedBody { .. } | DeviceError::MissingFields { .. } => {
                FailureKind::Schema
            }
            DeviceError::InvalidValue { .. } => FailureKind::Semantic,
        }
    }

    /// Whether the request itself timed out
    pub fn is_timeout(&self) -> bool {
        matches!(self, DeviceError::Request(e) if e.is_timeout())
    }
}

/// Result type for device API operations
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Client for one device's HTTP API
///
/// # Example
/// ```no_run
/// use agriprobe::client::DeviceClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let device = DeviceClient::new("http://192.168.4.1")?;
/// let status = device.status().await?;
/// println!("Alert level: {}", status.alert_level);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DeviceClient {
    /// Base URL of the device (e.g., http://192.168.4.1)
    base_url: Url,
    /// HTTP client for making requests
    client: Client,
    /// Device name for logging/identification
    name: Option<String>,
}

impl DeviceClient {
    /// Create a client with the default 5 second request timeout
    pub fn new(base_url: &str) -> DeviceResult<Self> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a client with a custom per-request timeout
    pub fn with_timeout(base_url: &str, timeout: Duration) -> DeviceResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Self::with_client(base_url, client)
    }

    /// Create a client around an existing HTTP client
    pub fn with_client(base_url: &str, client: Client) -> DeviceResult<Self> {
        let mut base_url = Url::parse(base_url)?;
        // Url::join drops the last path segment unless it ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            base_url,
            client,
            name: None,
        })
    }

    /// Set a name for this device (useful for logging)
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Get the device name if set
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Name if set, otherwise the base URL
    pub fn label(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.base_url.to_string())
    }

    // =========================================================================
    // Liveness Endpoints
    // =========================================================================

    /// GET /health
    pub async fn health(&self) -> DeviceResult<HealthResponse> {
        self.fetch(&contract::HEALTH).await
    }

    /// GET /ping
    pub async fn ping(&self) -> DeviceResult<PingResponse> {
        self.fetch(&contract::PING).await
    }

    // =========================================================================
    // Telemetry Endpoints
    // =========================================================================

    /// GET /status
    pub async fn status(&self) -> DeviceResult<StatusSnapshot> {
        self.fetch(&contract::STATUS).await
    }

    /// GET /data/log
    ///
    /// Returns `None` when the device answers 404, which it does until the
    /// first log record has been written.
    pub async fn data_log(&self) -> DeviceResult<Option<DataLog>> {
        match self.fetch(&contract::DATA_LOG).await {
            Ok(log) => Ok(Some(log)),
            Err(DeviceError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    // =========================================================================
    // Configuration Endpoints
    // =========================================================================

    /// GET /config
    pub async fn config(&self) -> DeviceResult<DeviceConfig> {
        self.fetch(&contract::CONFIG).await
    }

    /// POST /config
    pub async fn apply_config(&self, config: &DeviceConfig) -> DeviceResult<ConfigApplyResponse> {
        let response = self.send(&contract::CONFIG_APPLY, Some(config)).await?;
        decode(&contract::CONFIG_APPLY, response).await
    }

    async fn fetch<T: DeserializeOwned>(&self, contract: &EndpointContract) -> DeviceResult<T> {
        let response = self.send(contract, None::<&()>).await?;
        decode(contract, response).await
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        contract: &EndpointContract,
        body: Option<&B>,
    ) -> DeviceResult<Response> {
        let url = self.base_url.join(contract.path)?;
        let mut request = self.client.request(contract.method.clone(), url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        debug!(
            device = %self.label(),
            route = %contract.route(),
            status = response.status().as_u16(),
            "Device responded"
        );
        Ok(response)
    }
}

/// Check status, parse, check required fields, then decode into `T`
async fn decode<T: DeserializeOwned>(
    contract: &EndpointContract,
    response: Response,
) -> DeviceResult<T> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(DeviceError::NotFound {
            endpoint: contract.name,
        });
    }
    if !status.is_success() {
        return Err(DeviceError::HttpStatus {
            endpoint: contract.name,
            status,
        });
    }

    let bytes = response.bytes().await?;
    let body: Value = serde_json::from_slice(&bytes).map_err(|e| DeviceError::MalformedBody {
        endpoint: contract.name,
        reason: e.to_string(),
    })?;
    debug!(endpoint = contract.name, body = %body, "Decoding response body");

    if !body.is_object() {
        return Err(DeviceError::MalformedBody {
            endpoint: contract.name,
            reason: "expected a JSON object".to_string(),
        });
    }

    let missing = contract.missing_fields(&body);
    if !missing.is_empty() {
        return Err(DeviceError::MissingFields {
            endpoint: contract.name,
            fields: missing,
        });
    }

    serde_json::from_value(body).map_err(|source| DeviceError::InvalidValue {
        endpoint: contract.name,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = DeviceClient::new("http://192.168.4.1").unwrap();
        assert_eq!(client.base_url().as_str(), "http://192.168.4.1/");
    }

    #[test]
    fn test_base_path_kept_for_joins() {
        let client = DeviceClient::new("http://gateway.local/devices/as-001").unwrap();
        assert_eq!(
            client.base_url().join("status").unwrap().as_str(),
            "http://gateway.local/devices/as-001/status"
        );
    }

    #[test]
    fn test_invalid_url() {
        let err = DeviceClient::new("not a url").unwrap_err();
        assert!(matches!(err, DeviceError::InvalidUrl(_)));
        assert_eq!(err.kind(), FailureKind::Transport);
    }

    #[test]
    fn test_client_with_name() {
        let client = DeviceClient::new("http://192.168.4.1")
            .unwrap()
            .with_name("north-field");
        assert_eq!(client.name(), Some("north-field"));
        assert_eq!(client.label(), "north-field");
    }

    #[test]
    fn test_label_without_name() {
        let client = DeviceClient::new("http://192.168.4.1").unwrap();
        assert_eq!(client.label(), "http://192.168.4.1/");
    }

    #[test]
    fn test_error_kinds() {
        let missing = DeviceError::MissingFields {
            endpoint: "health",
            fields: vec!["uptime_ms"],
        };
        assert_eq!(missing.kind(), FailureKind::Schema);
        assert_eq!(
            missing.to_string(),
            "health response is missing field(s): uptime_ms"
        );

        let malformed = DeviceError::MalformedBody {
            endpoint: "data log",
            reason: "expected value at line 1 column 1".into(),
        };
        assert_eq!(malformed.kind(), FailureKind::Schema);

        let status = DeviceError::HttpStatus {
            endpoint: "status",
            status: StatusCode::INTERNAL_SERVER_ERROR,
        };
        assert_eq!(status.kind(), FailureKind::Transport);

        let source = serde_json::from_str::<AlertLevel>("\"BLUE\"").unwrap_err();
        let invalid = DeviceError::InvalidValue {
            endpoint: "status",
            source,
        };
        assert_eq!(invalid.kind(), FailureKind::Semantic);
    }
}
