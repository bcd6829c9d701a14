//! HTTP transport, configuration and connect handshake for the Cardinal API.
//!
//! - [`ApiConfig`] - layered TOML/environment configuration
//! - [`HttpTransport`] - reqwest implementation of
//!   [`Transport`](cardinal_interface::Transport)
//! - [`connect`] - bounded-retry startup check against `GET /users/me`

#![warn(missing_docs)]

mod config;
mod connect;
mod transport;

pub use config::ApiConfig;
pub use connect::{ConnectFailure, User, WHOAMI_PATH, connect};
pub use transport::HttpTransport;
