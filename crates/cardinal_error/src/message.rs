//! Errors that carry only a message and the place they were raised.

macro_rules! message_error {
    ($(#[$meta:meta])* $name:ident => $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
        #[display("{} Error: {} at line {} in {}", $label, message, line, file)]
        pub struct $name {
            /// What went wrong
            pub message: String,
            /// Line where the error was raised
            pub line: u32,
            /// File where the error was raised
            pub file: &'static str,
        }

        impl $name {
            #[doc = concat!("Create a new `", stringify!($name), "` at the caller's location.")]
            #[track_caller]
            pub fn new(message: impl Into<String>) -> Self {
                let location = std::panic::Location::caller();
                Self {
                    message: message.into(),
                    line: location.line(),
                    file: location.file(),
                }
            }
        }
    };
}

message_error! {
    /// Network failure raised before an HTTP status was received.
    ///
    /// Timeouts, refused connections and TLS failures end up here. Responses
    /// that carry a status code are reported as [`ApiError`](crate::ApiError).
    ///
    /// ```
    /// use cardinal_error::HttpError;
    ///
    /// let err = HttpError::new("Connection refused");
    /// assert!(err.to_string().starts_with("HTTP Error: Connection refused"));
    /// ```
    HttpError => "HTTP"
}

message_error! {
    /// A payload could not be serialized or deserialized.
    JsonError => "JSON"
}

message_error! {
    /// Configuration could not be loaded or parsed.
    ConfigError => "Configuration"
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for JsonError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        JsonError::new(err.to_string())
    }
}
