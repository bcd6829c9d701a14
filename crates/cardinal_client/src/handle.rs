//! Shared transport slot.
//!
//! The client, every manager and every entity hold a clone of the same
//! [`ApiHandle`]. `login` installs a transport into the slot; until then
//! every request fails with `NotConnected`.

use cardinal_error::{CardinalError, CardinalResult, ClientError, ClientErrorKind, JsonError};
use cardinal_interface::{ApiResponse, Method, Transport};
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone, Default)]
pub(crate) struct ApiHandle {
    slot: Arc<RwLock<Option<Arc<dyn Transport>>>>,
}

impl ApiHandle {
    pub(crate) fn with_transport(transport: Arc<dyn Transport>) -> Self {
        let handle = Self::default();
        handle.install(transport);
        handle
    }

    pub(crate) fn install(&self, transport: Arc<dyn Transport>) {
        *self.slot.write() = Some(transport);
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.slot.read().is_some()
    }

    pub(crate) fn transport(&self) -> CardinalResult<Arc<dyn Transport>> {
        self.slot
            .read()
            .clone()
            .ok_or_else(|| ClientError::new(ClientErrorKind::NotConnected).into())
    }

    pub(crate) async fn request(
        &self,
        path: &str,
        method: Method,
        body: Option<&JsonValue>,
    ) -> CardinalResult<ApiResponse> {
        let transport = self.transport()?;
        debug!(%method, path, "Sending request");
        transport.request(path, method, body).await
    }

    /// Send `body` serialized as JSON.
    pub(crate) async fn send<B: Serialize>(
        &self,
        path: &str,
        method: Method,
        body: &B,
    ) -> CardinalResult<ApiResponse> {
        let body = serde_json::to_value(body).map_err(JsonError::from)?;
        self.request(path, method, Some(&body)).await
    }

    /// GET a single resource. A 404 is `Ok(None)`; any other failure is
    /// logged and returned.
    pub(crate) async fn fetch_one<T: DeserializeOwned>(&self, path: &str) -> CardinalResult<Option<T>> {
        match self.request(path, Method::Get, None).await {
            Ok(response) => response.decode().map(Some),
            Err(err) if err.is_not_found() => {
                debug!(path, "Resource not found");
                Ok(None)
            }
            Err(err) => {
                warn!(path, error = %err, "Failed to fetch resource");
                Err(err)
            }
        }
    }

    /// GET a collection that the server answers with a JSON array. A
    /// missing body counts as an empty collection.
    pub(crate) async fn fetch_all<T: DeserializeOwned>(&self, path: &str) -> CardinalResult<Vec<T>> {
        let response = self.request(path, Method::Get, None).await?;
        match response {
            ApiResponse::Json(JsonValue::Array(_)) => response.decode(),
            ApiResponse::Json(JsonValue::Null) | ApiResponse::Empty => Ok(Vec::new()),
            other => Err(CardinalError::from(ClientError::new(
                ClientErrorKind::UnexpectedResponse(format!(
                    "expected a JSON array from {path}, got {}",
                    describe(&other)
                )),
            ))),
        }
    }
}

fn describe(response: &ApiResponse) -> &'static str {
    match response {
        ApiResponse::Json(JsonValue::Object(_)) => "an object",
        ApiResponse::Json(_) => "a scalar",
        ApiResponse::Bytes(_) => "a non-JSON body",
        ApiResponse::Empty => "nothing",
    }
}

impl fmt::Debug for ApiHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiHandle")
            .field("connected", &self.is_connected())
            .finish()
    }
}
