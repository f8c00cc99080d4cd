// crates/acr-probe-core/src/registry_api.rs
// ============================================================================
// Module: Registry API Client
// Description: Authenticated read of a container registry resource.
// Purpose: Fetch registry configuration from the cloud management API.
// Dependencies: reqwest, serde_json, url
// ============================================================================

//! ## Overview
//! [`RegistryApiClient`] issues one bearer-authenticated GET against
//! `{endpoint}/subscriptions/{sub}/resourceGroups/{rg}/providers/`
//! `Microsoft.ContainerRegistry/registries/{name}?api-version=...` and decodes
//! the body as an untyped JSON object.
//!
//! Non-success status codes fail under [`StatusPolicy::Strict`]. Under
//! [`StatusPolicy::Lenient`] the body is decoded regardless of status, so an
//! ARM error document is returned as if it were registry details.
//!
//! [`public_network_access`] never fails: a missing or mistyped path is
//! reported through fixed sentinel strings.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::token::AccessToken;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default Azure Resource Manager endpoint.
pub const DEFAULT_MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";
/// Container registry API version used for the details read.
pub const REGISTRY_API_VERSION: &str = "2023-06-01-preview";
/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Maximum accepted response body size in bytes.
pub const MAX_DETAILS_BYTES: usize = 4 * 1024 * 1024;
/// Sentinel returned when the details have no `properties` object.
pub const PROPERTIES_NOT_FOUND: &str = "properties not found";
/// Sentinel returned when `properties.publicNetworkAccess` is absent or not a string.
pub const PUBLIC_NETWORK_ACCESS_NOT_FOUND: &str = "publicNetworkAccess not found or not a string";
/// Maximum characters of a non-JSON error body carried into an error.
const MAX_ERROR_BODY_CHARS: usize = 512;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors returned by the registry API client.
#[derive(Debug, Error)]
pub enum RegistryApiError {
    /// The configured endpoint is unusable.
    #[error("invalid management endpoint: {0}")]
    InvalidEndpoint(String),
    /// Transport-level failure (connect, TLS, timeout, body read).
    #[error("network failure: {0}")]
    Network(String),
    /// Non-success HTTP status under the strict policy.
    #[error("management api returned http status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// ARM error summary or truncated body.
        message: String,
    },
    /// Response body exceeded [`MAX_DETAILS_BYTES`].
    #[error("response exceeds size limit of {max_bytes} bytes")]
    TooLarge {
        /// Maximum accepted size.
        max_bytes: usize,
    },
    /// Response body is not a JSON object.
    #[error("decode failure: {0}")]
    Decode(String),
}

// ============================================================================
// SECTION: Registry Details
// ============================================================================

/// Untyped registry resource document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegistryDetails(Map<String, Value>);

impl RegistryDetails {
    /// Wraps a decoded JSON object.
    #[must_use]
    pub const fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Parses registry details from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryApiError::Decode`] when the bytes are neither a JSON
    /// object nor `null`. A `null` document decodes to empty details.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, RegistryApiError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|err| RegistryApiError::Decode(err.to_string()))?;
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            Value::Null => Ok(Self::default()),
            other => Err(RegistryApiError::Decode(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Returns a top-level field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the underlying object.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Returns the network-access mode or a sentinel string.
    #[must_use]
    pub fn public_network_access(&self) -> String {
        public_network_access(self)
    }
}

/// Reads `properties.publicNetworkAccess` from registry details.
///
/// Returns the value verbatim when it is a string,
/// [`PUBLIC_NETWORK_ACCESS_NOT_FOUND`] when `properties` is an object without
/// a string `publicNetworkAccess`, and [`PROPERTIES_NOT_FOUND`] otherwise.
#[must_use]
pub fn public_network_access(details: &RegistryDetails) -> String {
    let Some(Value::Object(properties)) = details.get("properties") else {
        return PROPERTIES_NOT_FOUND.to_string();
    };
    match properties.get("publicNetworkAccess") {
        Some(Value::String(mode)) => mode.clone(),
        _ => PUBLIC_NETWORK_ACCESS_NOT_FOUND.to_string(),
    }
}

/// Names the JSON type of a value for diagnostics.
const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Handling of non-success HTTP status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusPolicy {
    /// Fail with [`RegistryApiError::Status`] on non-2xx responses.
    #[default]
    Strict,
    /// Decode the body regardless of status.
    Lenient,
}

/// Registry API client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryApiConfig {
    /// Management endpoint base URL.
    pub endpoint: String,
    /// `api-version` query value.
    pub api_version: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Status-code handling.
    pub status_policy: StatusPolicy,
}

impl Default for RegistryApiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_MANAGEMENT_ENDPOINT.to_string(),
            api_version: REGISTRY_API_VERSION.to_string(),
            timeout: DEFAULT_TIMEOUT,
            status_policy: StatusPolicy::Strict,
        }
    }
}

// ============================================================================
// SECTION: Reader Trait
// ============================================================================

/// Source of registry details.
pub trait RegistryReader: Send + Sync {
    /// Fetches the registry resource document.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryApiError`] when the document cannot be fetched or decoded.
    fn registry_details(
        &self,
        token: &AccessToken,
        subscription_id: &str,
        resource_group: &str,
        registry_name: &str,
    ) -> Result<RegistryDetails, RegistryApiError>;
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Blocking client for the container registry management API.
#[derive(Debug, Clone)]
pub struct RegistryApiClient {
    /// HTTP client used for requests.
    client: Client,
    /// Parsed endpoint base.
    endpoint: Url,
    /// Client settings.
    config: RegistryApiConfig,
}

impl RegistryApiClient {
    /// Builds a client from settings.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryApiError`] when the endpoint is invalid or the HTTP
    /// client cannot be constructed.
    pub fn new(config: RegistryApiConfig) -> Result<Self, RegistryApiError> {
        let endpoint = parse_endpoint(&config.endpoint)?;
        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(config.timeout)
            .build()
            .map_err(|err| RegistryApiError::Network(err.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            config,
        })
    }

    /// Returns the client settings.
    #[must_use]
    pub const fn config(&self) -> &RegistryApiConfig {
        &self.config
    }

    /// Builds the registry resource URL. Path segments are percent-encoded.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryApiError::InvalidEndpoint`] when the endpoint cannot
    /// carry path segments.
    pub fn registry_url(
        &self,
        subscription_id: &str,
        resource_group: &str,
        registry_name: &str,
    ) -> Result<Url, RegistryApiError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| RegistryApiError::InvalidEndpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .extend([
                "subscriptions",
                subscription_id,
                "resourceGroups",
                resource_group,
                "providers",
                "Microsoft.ContainerRegistry",
                "registries",
                registry_name,
            ]);
        url.query_pairs_mut().clear().append_pair("api-version", &self.config.api_version);
        Ok(url)
    }

    /// Fetches registry details.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryApiError::Network`] on transport failure,
    /// [`RegistryApiError::Status`] on a non-success status under the strict
    /// policy, and [`RegistryApiError::Decode`] when the body is not a JSON
    /// object.
    pub fn get_registry_details(
        &self,
        token: &AccessToken,
        subscription_id: &str,
        resource_group: &str,
        registry_name: &str,
    ) -> Result<RegistryDetails, RegistryApiError> {
        let url = self.registry_url(subscription_id, resource_group, registry_name)?;
        let response = self
            .client
            .get(url.as_str())
            .header(AUTHORIZATION, format!("Bearer {}", token.as_str()))
            .send()
            .map_err(|err| RegistryApiError::Network(err.to_string()))?;
        let status = response.status();
        if let Some(length) = response.content_length()
            && length > MAX_DETAILS_BYTES as u64
        {
            return Err(RegistryApiError::TooLarge {
                max_bytes: MAX_DETAILS_BYTES,
            });
        }
        let mut limited = response.take((MAX_DETAILS_BYTES + 1) as u64);
        let mut body = Vec::new();
        limited.read_to_end(&mut body).map_err(|err| RegistryApiError::Network(err.to_string()))?;
        if body.len() > MAX_DETAILS_BYTES {
            return Err(RegistryApiError::TooLarge {
                max_bytes: MAX_DETAILS_BYTES,
            });
        }
        if !status.is_success() && self.config.status_policy == StatusPolicy::Strict {
            return Err(RegistryApiError::Status {
                status: status.as_u16(),
                message: arm_error_message(&body),
            });
        }
        RegistryDetails::from_slice(&body)
    }
}

impl RegistryReader for RegistryApiClient {
    fn registry_details(
        &self,
        token: &AccessToken,
        subscription_id: &str,
        resource_group: &str,
        registry_name: &str,
    ) -> Result<RegistryDetails, RegistryApiError> {
        self.get_registry_details(token, subscription_id, resource_group, registry_name)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses and checks the management endpoint.
fn parse_endpoint(raw: &str) -> Result<Url, RegistryApiError> {
    let url = Url::parse(raw).map_err(|err| RegistryApiError::InvalidEndpoint(err.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(RegistryApiError::InvalidEndpoint(format!("unsupported scheme {scheme}")));
        }
    }
    if url.cannot_be_a_base() {
        return Err(RegistryApiError::InvalidEndpoint(raw.to_string()));
    }
    Ok(url)
}

/// Summarizes an ARM error body as `code: message`, falling back to raw text.
fn arm_error_message(body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<Value>(body) {
        let error = &value["error"];
        let code = error["code"].as_str();
        let message = error["message"].as_str();
        match (code, message) {
            (Some(code), Some(message)) => return format!("{code}: {message}"),
            (Some(code), None) => return code.to_string(),
            (None, Some(message)) => return message.to_string(),
            (None, None) => {}
        }
    }
    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect()
}
