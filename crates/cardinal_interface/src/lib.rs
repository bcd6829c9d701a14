//! Transport boundary for the Cardinal API client.
//!
//! The entity layer depends on exactly one capability: issuing a request
//! against a path with a method and an optional JSON body. This crate
//! defines that capability as the [`Transport`] trait so the HTTP
//! implementation can be swapped for a scripted one in tests.

#![warn(missing_docs)]

mod traits;
mod types;

#[cfg(feature = "testing")]
pub mod testing;

pub use traits::Transport;
pub use types::{ApiResponse, Method};
