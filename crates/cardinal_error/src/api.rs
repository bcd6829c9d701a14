//! Errors returned by the Cardinal API itself.

/// Non-2xx response from the Cardinal API.
///
/// Carries everything needed to reproduce the failed call: the status text
/// and code, the HTTP method, the full request path and the serialized body
/// that was sent.
///
/// # Examples
///
/// ```
/// use cardinal_error::ApiError;
///
/// let err = ApiError::new("Not Found", 404, "GET", "/guilds/42", None);
/// assert!(err.is_not_found());
/// assert!(format!("{}", err).contains("/guilds/42"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display(
    "API Error: {} {} ({} {}) at line {} in {}",
    status,
    message,
    method,
    path,
    line,
    file
)]
pub struct ApiError {
    /// Status text returned by the server
    pub message: String,
    /// HTTP status code
    pub status: u16,
    /// HTTP method of the request
    pub method: String,
    /// Full path of the request
    pub path: String,
    /// Serialized request body, if any was sent
    pub body: Option<String>,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl ApiError {
    /// Create a new ApiError at the current location.
    #[track_caller]
    pub fn new(
        message: impl Into<String>,
        status: u16,
        method: impl Into<String>,
        path: impl Into<String>,
        body: Option<String>,
    ) -> Self {
        let location = std::panic::Location::caller();
        Self {
            message: message.into(),
            status,
            method: method.into(),
            path: path.into(),
            body,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Whether the server answered 404.
    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    /// Whether the server answered with a 5xx status.
    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }

    /// Whether the server rejected the bearer token (401 or 403).
    pub fn is_auth_error(&self) -> bool {
        matches!(self.status, 401 | 403)
    }
}
