//! Request and response types shared by every transport.

use cardinal_error::{CardinalResult, ClientError, ClientErrorKind, JsonError};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

/// HTTP methods used by the Cardinal API.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Method {
    /// Read a resource or collection.
    Get,
    /// Create a resource or trigger an action.
    Post,
    /// Partially update a resource.
    Patch,
    /// Delete a resource.
    Delete,
}

/// Successful response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// The server answered with `Content-Type: application/json`.
    Json(JsonValue),
    /// Any other content type.
    Bytes(Vec<u8>),
    /// No body at all (e.g. `204 No Content`).
    Empty,
}

impl ApiResponse {
    /// The JSON payload, if this response carried one.
    pub fn as_json(&self) -> Option<&JsonValue> {
        match self {
            ApiResponse::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Decode the JSON payload into `T`.
    ///
    /// Fails if the response was not JSON or does not match `T`.
    pub fn decode<T: DeserializeOwned>(self) -> CardinalResult<T> {
        match self {
            ApiResponse::Json(value) => {
                serde_json::from_value(value).map_err(|e| JsonError::from(e).into())
            }
            ApiResponse::Bytes(bytes) => Err(ClientError::new(
                ClientErrorKind::UnexpectedResponse(format!(
                    "expected JSON, got {} bytes",
                    bytes.len()
                )),
            )
            .into()),
            ApiResponse::Empty => Err(ClientError::new(ClientErrorKind::UnexpectedResponse(
                "expected JSON, got an empty body".to_string(),
            ))
            .into()),
        }
    }

    /// Decode the JSON payload into `T`, or `T::default()` when there is
    /// no JSON payload.
    ///
    /// Used for responses to mutations, where the server may or may not
    /// echo the updated resource.
    pub fn decode_or_default<T: DeserializeOwned + Default>(self) -> CardinalResult<T> {
        match self {
            ApiResponse::Json(JsonValue::Null) => Ok(T::default()),
            ApiResponse::Json(value) => {
                serde_json::from_value(value).map_err(|e| JsonError::from(e).into())
            }
            ApiResponse::Bytes(_) | ApiResponse::Empty => Ok(T::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::str::FromStr;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct User {
        username: Option<String>,
    }

    #[test]
    fn test_method_renders_uppercase() {
        assert_eq!(Method::Get.to_string(), "GET");
        assert_eq!(Method::Patch.as_ref(), "PATCH");
        assert_eq!(Method::from_str("DELETE").unwrap(), Method::Delete);
    }

    #[test]
    fn test_decode_json() {
        let response = ApiResponse::Json(json!({ "username": "cardinal" }));
        let user: User = response.decode().unwrap();
        assert_eq!(user.username.as_deref(), Some("cardinal"));
    }

    #[test]
    fn test_decode_rejects_bytes() {
        let response = ApiResponse::Bytes(b"<html>".to_vec());
        assert!(response.decode::<User>().is_err());
    }

    #[test]
    fn test_decode_or_default_tolerates_missing_body() {
        assert_eq!(
            ApiResponse::Empty.decode_or_default::<User>().unwrap(),
            User::default()
        );
        assert_eq!(
            ApiResponse::Json(JsonValue::Null)
                .decode_or_default::<User>()
                .unwrap(),
            User::default()
        );
    }
}
