//! Connect handshake.
//!
//! Before the client is used, it checks that the API is reachable and the
//! token is accepted by asking the server who it is talking to. The check
//! is retried a bounded number of times at startup; it is not a
//! reconnect loop.

use crate::ApiConfig;
use cardinal_error::{CardinalError, CardinalErrorKind, CardinalResult};
use cardinal_interface::{Method, Transport};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_retry2::strategy::{FixedInterval, jitter};
use tokio_retry2::{Retry, RetryError};
use tracing::{error, info, instrument, warn};

/// Path of the "who am I" endpoint.
pub const WHOAMI_PATH: &str = "/users/me";

/// The account the token belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct User {
    /// Display name of the account
    #[serde(default)]
    username: String,
    /// Any other fields the server reports
    #[serde(flatten)]
    extra: Map<String, JsonValue>,
}

/// How a connect attempt failed. Used for logging only; the error itself
/// is returned unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ConnectFailure {
    /// The server answered 5xx.
    #[display("server error")]
    Server,
    /// The token was rejected (401 or 403).
    #[display("invalid token")]
    Auth,
    /// Any other non-2xx answer.
    #[display("client error")]
    Client,
    /// No answer at all, or an unreadable one.
    #[display("network error")]
    Network,
}

impl ConnectFailure {
    /// Classify a failed attempt.
    pub fn classify(err: &CardinalError) -> Self {
        match err.kind() {
            CardinalErrorKind::Api(api) if api.is_server_error() => ConnectFailure::Server,
            CardinalErrorKind::Api(api) if api.is_auth_error() => ConnectFailure::Auth,
            CardinalErrorKind::Api(_) => ConnectFailure::Client,
            _ => ConnectFailure::Network,
        }
    }
}

/// Request `GET /users/me` until it succeeds or `max_attempts` is reached.
///
/// Every failed attempt is logged with its [`ConnectFailure`] class. When
/// all attempts fail, the error of the last one is returned.
///
/// # Errors
///
/// Returns the last attempt's error once the attempts are exhausted.
#[instrument(skip_all, fields(max_attempts = *config.max_attempts()))]
pub async fn connect(transport: &dyn Transport, config: &ApiConfig) -> CardinalResult<User> {
    let max_attempts = (*config.max_attempts()).max(1);
    let strategy = FixedInterval::from_millis(*config.retry_backoff_ms())
        .map(jitter)
        .take(max_attempts - 1);
    let attempts = &AtomicUsize::new(0);

    let outcome = Retry::spawn(strategy, || async move {
        let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
        info!(attempt, "Connecting to Cardinal API");

        let result = match transport.request(WHOAMI_PATH, Method::Get, None).await {
            Ok(response) => response.decode::<User>(),
            Err(err) => Err(err),
        };

        match result {
            Ok(user) => Ok(user),
            Err(err) => {
                let failure = ConnectFailure::classify(&err);
                warn!(attempt, %failure, error = %err, "Connection attempt failed");
                if attempt < max_attempts {
                    info!("Retrying connection to Cardinal API");
                }
                Err(RetryError::Transient {
                    err,
                    retry_after: None,
                })
            }
        }
    })
    .await;

    match outcome {
        Ok(user) => {
            info!(username = %user.username, "Connected to Cardinal API");
            Ok(user)
        }
        Err(err) => {
            error!(
                attempts = attempts.load(Ordering::SeqCst),
                "Max connection attempts to Cardinal API reached"
            );
            Err(err)
        }
    }
}
