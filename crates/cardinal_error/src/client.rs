//! Client-side error conditions of the entity layer.

/// Client error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum ClientErrorKind {
    /// A request was made before `login`/`connect` installed a transport.
    #[display("Client is not connected to the Cardinal API")]
    NotConnected,
    /// A payload lacked the identifier of the entity it describes.
    #[display("Payload is missing identifier field `{}`", _0)]
    MissingIdentifier(&'static str),
    /// The server answered with something the client cannot interpret.
    #[display("Unexpected response: {}", _0)]
    UnexpectedResponse(String),
}

/// Client error with source location tracking.
///
/// # Examples
///
/// ```
/// use cardinal_error::{ClientError, ClientErrorKind};
///
/// let err = ClientError::new(ClientErrorKind::MissingIdentifier("warnID"));
/// assert!(format!("{}", err).contains("warnID"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Client Error: {} at line {} in {}", kind, line, file)]
pub struct ClientError {
    /// The kind of error that occurred
    pub kind: ClientErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ClientError {
    /// Create a new ClientError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ClientErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
