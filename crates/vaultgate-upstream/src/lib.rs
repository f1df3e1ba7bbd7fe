//! vaultgate-upstream: per-request credentials and the banking API client.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use vaultgate_config::UpstreamConfig;

/// API client credentials supplied with each inbound request.
///
/// Held in memory for one request only. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            secret: secret.into(),
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Storage namespace: hex SHA-256 of `client_id:secret`.
    pub fn namespace(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.client_id.as_bytes());
        hasher.update(b":");
        hasher.update(self.secret.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Error payload returned by the upstream API.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiError {
    #[serde(default)]
    pub error_type: String,
    #[serde(default)]
    pub error_code: String,
    #[serde(default)]
    pub error_message: String,
    #[serde(default)]
    pub display_message: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.error_type, self.error_code, self.error_message)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("Upstream API error: {0}")]
    Api(ApiError),
    #[error("Upstream transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Invalid upstream URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Undecodable upstream response (HTTP {status}): {message}")]
    Decode { status: u16, message: String },
}

impl UpstreamError {
    /// Error fields as an [`ApiError`], synthesising one for non-API failures.
    pub fn to_api_error(&self) -> ApiError {
        match self {
            UpstreamError::Api(e) => e.clone(),
            UpstreamError::Transport(e) => ApiError {
                error_type: "TRANSPORT_ERROR".into(),
                error_code: "REQUEST_FAILED".into(),
                error_message: e.to_string(),
                ..Default::default()
            },
            UpstreamError::InvalidUrl(e) => ApiError {
                error_type: "TRANSPORT_ERROR".into(),
                error_code: "INVALID_URL".into(),
                error_message: e.to_string(),
                ..Default::default()
            },
            UpstreamError::Decode { status, message } => ApiError {
                error_type: "TRANSPORT_ERROR".into(),
                error_code: "INVALID_RESPONSE".into(),
                error_message: format!("HTTP {status}: {message}"),
                ..Default::default()
            },
        }
    }
}

/// Anything that can POST a JSON body to an upstream endpoint.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Call `endpoint` (e.g. `/accounts/get`) with `body`.
    async fn request(&self, endpoint: &str, body: Value) -> Result<Value, UpstreamError>;
}

/// HTTP client for the banking API. Built fresh for every inbound request.
pub struct PlaidHttpClient {
    base_url: url::Url,
    credentials: Credentials,
    client: reqwest::Client,
}

impl PlaidHttpClient {
    pub fn new(config: &UpstreamConfig, credentials: Credentials) -> Result<Self, UpstreamError> {
        Self::with_client(config, credentials, reqwest::Client::new())
    }

    /// Share a connection pool across per-request clients.
    pub fn with_client(
        config: &UpstreamConfig,
        credentials: Credentials,
        client: reqwest::Client,
    ) -> Result<Self, UpstreamError> {
        // Trailing slash so endpoints join under any path prefix
        let mut base = config.resolved_base_url().trim_end_matches('/').to_string();
        base.push('/');
        Ok(Self {
            base_url: url::Url::parse(&base)?,
            credentials,
            client,
        })
    }

    fn endpoint_url(&self, endpoint: &str) -> Result<url::Url, UpstreamError> {
        Ok(self.base_url.join(endpoint.trim_start_matches('/'))?)
    }
}

#[async_trait]
impl UpstreamClient for PlaidHttpClient {
    async fn request(&self, endpoint: &str, body: Value) -> Result<Value, UpstreamError> {
        let url = self.endpoint_url(endpoint)?;
        let body = inject_credentials(&self.credentials, body);

        tracing::debug!(endpoint, "Upstream request");

        let resp = self.client.post(url).json(&body).send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        let json: Value = serde_json::from_str(&text).map_err(|e| UpstreamError::Decode {
            status: status.as_u16(),
            message: e.to_string(),
        })?;

        let result = classify_response(status, json);
        if let Err(UpstreamError::Api(e)) = &result {
            tracing::warn!(
                endpoint,
                error_type = %e.error_type,
                error_code = %e.error_code,
                request_id = e.request_id.as_deref().unwrap_or("unknown"),
                "Upstream API error"
            );
        }
        result
    }
}

/// Body with `client_id` and `secret` first, then the caller's fields.
fn inject_credentials(credentials: &Credentials, body: Value) -> Value {
    let mut merged = Map::new();
    merged.insert("client_id".into(), Value::String(credentials.client_id.clone()));
    merged.insert("secret".into(), Value::String(credentials.secret.clone()));
    if let Value::Object(fields) = body {
        merged.extend(fields);
    }
    Value::Object(merged)
}

/// A response is an error when the status is not 2xx or it carries `error_type`.
///
/// Error bodies missing the API's fields are filled in from the HTTP status.
fn classify_response(status: reqwest::StatusCode, json: Value) -> Result<Value, UpstreamError> {
    if status.is_success() && json.get("error_type").is_none() {
        return Ok(json);
    }
    let mut api: ApiError = serde_json::from_value(json).unwrap_or_default();
    if api.error_type.is_empty() {
        api.error_type = "API_ERROR".into();
    }
    if api.error_code.is_empty() {
        api.error_code = format!("HTTP_{}", status.as_u16());
    }
    if api.error_message.is_empty() {
        api.error_message = status
            .canonical_reason()
            .unwrap_or("Upstream request failed")
            .to_string();
    }
    Err(UpstreamError::Api(api))
}
