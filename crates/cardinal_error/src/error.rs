//! Top-level error wrapper types.

use crate::{ApiError, ClientError, ConfigError, HttpError, JsonError};

/// Every error condition the Cardinal client can raise.
///
/// # Examples
///
/// ```
/// use cardinal_error::{CardinalError, HttpError};
///
/// let http_err = HttpError::new("Connection failed");
/// let err: CardinalError = http_err.into();
/// assert!(format!("{}", err).contains("HTTP Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum CardinalErrorKind {
    /// Non-2xx response from the API
    #[from(ApiError)]
    Api(ApiError),
    /// Network error
    #[from(HttpError)]
    Http(HttpError),
    /// JSON serialization/deserialization error
    #[from(JsonError)]
    Json(JsonError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Entity layer error
    #[from(ClientError)]
    Client(ClientError),
}

/// Cardinal error with kind discrimination.
///
/// # Examples
///
/// ```
/// use cardinal_error::{ApiError, CardinalResult};
///
/// fn lookup() -> CardinalResult<()> {
///     Err(ApiError::new("Internal Server Error", 500, "GET", "/users/me", None))?
/// }
///
/// let err = lookup().unwrap_err();
/// assert_eq!(err.status(), Some(500));
/// assert!(!err.is_not_found());
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Cardinal Error: {}", _0)]
pub struct CardinalError(Box<CardinalErrorKind>);

impl CardinalError {
    /// Create a new error from a kind.
    pub fn new(kind: CardinalErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &CardinalErrorKind {
        &self.0
    }

    /// HTTP status code, when the error came from an API response.
    pub fn status(&self) -> Option<u16> {
        match self.kind() {
            CardinalErrorKind::Api(err) => Some(err.status),
            _ => None,
        }
    }

    /// Whether this error is an API 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind(), CardinalErrorKind::Api(err) if err.is_not_found())
    }
}

// Generic From implementation for any type that converts to CardinalErrorKind
impl<T> From<T> for CardinalError
where
    T: Into<CardinalErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Cardinal operations.
pub type CardinalResult<T> = std::result::Result<T, CardinalError>;
