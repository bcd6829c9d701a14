//! The transport trait.

use crate::{ApiResponse, Method};
use async_trait::async_trait;
use cardinal_error::CardinalResult;
use serde_json::Value as JsonValue;

/// Performs one request against the Cardinal API.
///
/// Implementations send `body` as JSON and authenticate with the bearer
/// token they were built with. A 2xx answer is returned as an
/// [`ApiResponse`]; anything else fails with an
/// [`ApiError`](cardinal_error::ApiError) carrying the status, method,
/// path and the serialized body. Failures before a status is known are
/// reported as [`HttpError`](cardinal_error::HttpError).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request to `path` (relative to the API base URL).
    async fn request(
        &self,
        path: &str,
        method: Method,
        body: Option<&JsonValue>,
    ) -> CardinalResult<ApiResponse>;
}
