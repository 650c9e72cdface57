use std::fmt;

use crate::api::client::HttpError;
use crate::core::token_store::StorageError;
use crate::core::validation::ValidationError;

/// Everything a caller of the book API can be told about a failed operation.
#[derive(Debug)]
pub enum ClientError {
    /// The request failed on the wire or the server rejected it.
    Http(HttpError),
    /// The token could not be read, written or removed.
    Storage(StorageError),
    /// Form input was rejected before any request was sent.
    Validation(ValidationError),
    /// A successful response did not have the expected shape.
    Decode(serde_json::Error),
}

impl ClientError {
    /// The HTTP status behind the failure, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http(e) => e.status(),
            _ => None,
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Http(e) => write!(f, "{e}"),
            ClientError::Storage(e) => write!(f, "{e}"),
            ClientError::Validation(e) => write!(f, "{e}"),
            ClientError::Decode(e) => write!(f, "unexpected response: {e}"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Http(e) => Some(e),
            ClientError::Storage(e) => Some(e),
            ClientError::Validation(e) => Some(e),
            ClientError::Decode(e) => Some(e),
        }
    }
}

impl From<HttpError> for ClientError {
    fn from(e: HttpError) -> Self {
        ClientError::Http(e)
    }
}

impl From<StorageError> for ClientError {
    fn from(e: StorageError) -> Self {
        ClientError::Storage(e)
    }
}

impl From<ValidationError> for ClientError {
    fn from(e: ValidationError) -> Self {
        ClientError::Validation(e)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Decode(e)
    }
}
