//! Error types for the Cardinal API client.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - each `*Error` struct records the file and line it was created at
//!   via `#[track_caller]`
//! - `*ErrorKind` enums name specific conditions where one struct covers
//!   several
//! - [`CardinalError`] boxes a [`CardinalErrorKind`] and is what every
//!   fallible operation in the workspace returns
//!
//! # Examples
//!
//! ```
//! use cardinal_error::{CardinalResult, HttpError};
//!
//! fn fetch_data() -> CardinalResult<String> {
//!     Err(HttpError::new("Connection refused"))?
//! }
//!
//! match fetch_data() {
//!     Ok(data) => println!("Got: {}", data),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod api;
mod client;
mod error;
mod message;

pub use api::ApiError;
pub use client::{ClientError, ClientErrorKind};
pub use error::{CardinalError, CardinalErrorKind, CardinalResult};
pub use message::{ConfigError, HttpError, JsonError};
