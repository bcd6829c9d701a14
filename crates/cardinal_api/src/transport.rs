//! reqwest-backed transport.

use crate::ApiConfig;
use async_trait::async_trait;
use cardinal_error::{ApiError, CardinalResult, HttpError, JsonError};
use cardinal_interface::{ApiResponse, Method, Transport};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

/// HTTP client for the Cardinal API.
///
/// Every request carries `Content-Type: application/json` and the bearer
/// token the transport was built with.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Build a transport for `config.base_url` authenticated with `token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    #[instrument(skip(config, token), fields(base_url = %config.base_url()))]
    pub fn new(config: &ApiConfig, token: impl Into<String>) -> CardinalResult<Self> {
        debug!("Creating new HTTP transport");
        let client = Client::builder()
            .timeout(Duration::from_secs(*config.timeout_secs()))
            .build()
            .map_err(|e| HttpError::new(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.normalized_base_url().to_string(),
            token: token.into(),
        })
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip_all, fields(method = %method, path = %path))]
    async fn request(
        &self,
        path: &str,
        method: Method,
        body: Option<&JsonValue>,
    ) -> CardinalResult<ApiResponse> {
        let url = format!("{}{}", self.base_url, path);
        let serialized = body
            .map(serde_json::to_string)
            .transpose()
            .map_err(JsonError::from)?;

        debug!(has_body = serialized.is_some(), "Sending request to Cardinal API");

        let mut request = self
            .client
            .request(reqwest_method(method), &url)
            .header(CONTENT_TYPE, "application/json")
            .bearer_auth(&self.token);
        if let Some(payload) = &serialized {
            request = request.body(payload.clone());
        }

        let response = request.send().await.map_err(|e| {
            error!(error = ?e, "Failed to send request to Cardinal API");
            HttpError::new(format!("Request failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            if status.is_server_error() {
                error!(status = %status, "Cardinal API returned error");
            } else {
                warn!(status = %status, "Cardinal API rejected request");
            }
            return Err(ApiError::new(
                status.canonical_reason().unwrap_or("Unknown Status"),
                status.as_u16(),
                method.as_ref(),
                url,
                serialized,
            )
            .into());
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/json"));

        let bytes = response.bytes().await.map_err(|e| {
            error!(error = ?e, "Failed to read Cardinal API response");
            HttpError::new(format!("Failed to read response body: {}", e))
        })?;

        if bytes.is_empty() {
            debug!(status = %status, "Received empty response");
            return Ok(ApiResponse::Empty);
        }

        if is_json {
            let value = serde_json::from_slice(&bytes).map_err(JsonError::from)?;
            debug!(status = %status, "Received JSON response");
            Ok(ApiResponse::Json(value))
        } else {
            debug!(status = %status, len = bytes.len(), "Received raw response");
            Ok(ApiResponse::Bytes(bytes.to_vec()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_token() {
        let transport = HttpTransport::new(&ApiConfig::default(), "very-secret").unwrap();
        let rendered = format!("{:?}", transport);
        assert!(!rendered.contains("very-secret"));
        assert!(rendered.contains("api.cardinal.example"));
    }

    #[test]
    fn test_base_url_is_normalized() {
        let config = ApiConfig::default().with_base_url("http://localhost:8080/v1/".to_string());
        let transport = HttpTransport::new(&config, "token").unwrap();
        assert_eq!(transport.base_url(), "http://localhost:8080/v1");
    }

    #[test]
    fn test_method_mapping() {
        assert_eq!(reqwest_method(Method::Get), reqwest::Method::GET);
        assert_eq!(reqwest_method(Method::Patch), reqwest::Method::PATCH);
    }
}
