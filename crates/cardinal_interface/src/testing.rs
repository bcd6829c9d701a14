//! Scripted transport for tests.
//!
//! [`MockTransport`] answers requests from per-route response queues and
//! records every request it receives, so tests can assert both the
//! outcome of an operation and the exact network traffic it caused.
//!
//! ```rust,ignore
//! use cardinal_interface::testing::{MockResponse, MockTransport};
//! use cardinal_interface::{Method, Transport};
//! use serde_json::json;
//!
//! let transport = MockTransport::new();
//! transport.on(Method::Get, "/users/me", MockResponse::Json(json!({ "username": "bot" })));
//!
//! let response = transport.request("/users/me", Method::Get, None).await?;
//! assert_eq!(response.as_json().unwrap()["username"], "bot");
//! assert_eq!(transport.count(Method::Get, "/users/me"), 1);
//! ```

use crate::{ApiResponse, Method, Transport};
use async_trait::async_trait;
use cardinal_error::{ApiError, CardinalResult, HttpError};
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use std::collections::{HashMap, VecDeque};

/// A scripted answer for one request.
#[derive(Debug, Clone, PartialEq)]
pub enum MockResponse {
    /// 2xx with a JSON body.
    Json(JsonValue),
    /// 2xx with a non-JSON body.
    Bytes(Vec<u8>),
    /// 2xx without a body.
    Empty,
    /// Non-2xx status; produces an [`ApiError`].
    Status(u16),
    /// Failure before any status; produces an [`HttpError`].
    Network(String),
}

/// A request received by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    /// Method of the request.
    pub method: Method,
    /// Path of the request.
    pub path: String,
    /// JSON body, if one was sent.
    pub body: Option<JsonValue>,
}

/// Transport that replays scripted responses.
///
/// Responses registered for a route are consumed in order; the last one
/// is repeated for any further request. Requests to unscripted routes get
/// a 404.
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<MockResponse>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    /// Create a transport with no scripted routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `response` for requests to `method path`.
    pub fn on(&self, method: Method, path: impl Into<String>, response: MockResponse) -> &Self {
        self.routes
            .lock()
            .entry((method, path.into()))
            .or_default()
            .push_back(response);
        self
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests received for `method path`.
    pub fn count(&self, method: Method, path: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    /// Most recent body sent to `method path`.
    pub fn last_body(&self, method: Method, path: &str) -> Option<JsonValue> {
        self.requests
            .lock()
            .iter()
            .rev()
            .find(|r| r.method == method && r.path == path)
            .and_then(|r| r.body.clone())
    }

    /// Total number of requests received.
    pub fn total(&self) -> usize {
        self.requests.lock().len()
    }

    fn next_response(&self, method: Method, path: &str) -> MockResponse {
        let mut routes = self.routes.lock();
        match routes.get_mut(&(method, path.to_string())) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(MockResponse::Status(404)),
            Some(queue) => queue.front().cloned().unwrap_or(MockResponse::Status(404)),
            None => MockResponse::Status(404),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request(
        &self,
        path: &str,
        method: Method,
        body: Option<&JsonValue>,
    ) -> CardinalResult<ApiResponse> {
        self.requests.lock().push(RecordedRequest {
            method,
            path: path.to_string(),
            body: body.cloned(),
        });

        match self.next_response(method, path) {
            MockResponse::Json(value) => Ok(ApiResponse::Json(value)),
            MockResponse::Bytes(bytes) => Ok(ApiResponse::Bytes(bytes)),
            MockResponse::Empty => Ok(ApiResponse::Empty),
            MockResponse::Status(status) => Err(ApiError::new(
                status_text(status),
                status,
                method.as_ref(),
                path,
                body.map(|b| b.to_string()),
            )
            .into()),
            MockResponse::Network(message) => Err(HttpError::new(message).into()),
        }
    }
}

fn status_text(status: u16) -> &'static str {
    match status {
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Error",
    }
}
