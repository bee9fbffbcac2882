//! Error types for the overlay node.

use postboard_core::wire::ErrorObject;
use postboard_core::CoreError;
use std::error::Error as StdError;
use std::fmt;
use warp::http::StatusCode;

/// Errors that can occur in the overlay node.
#[derive(Debug)]
pub enum NodeError {
    /// Error when a core operation fails.
    CoreError(CoreError),

    /// Error when a storage operation fails.
    StorageError(String),

    /// Error when a stored value cannot be encoded or decoded.
    SerializationError(String),

    /// Error when a request body cannot be read.
    InvalidRequest(String),

    /// Error when a submitted action is rejected.
    InvalidAction(String),

    /// Error when a lookup query is malformed.
    InvalidQuery(String),

    /// Error when no lookup service answers to a provider name.
    UnsupportedProvider(String),

    /// Error when a request is not properly authenticated.
    Unauthorized(String),

    /// Error when a message box is full.
    MessageBoxFull(String),

    /// Error when a metrics operation fails.
    MetricsError(String),
}

impl NodeError {
    /// Machine readable code sent back to clients.
    pub fn code(&self) -> &'static str {
        match self {
            NodeError::CoreError(_) | NodeError::InvalidAction(_) => "ERR_INVALID_ACTION",
            NodeError::InvalidRequest(_) => "ERR_INVALID_REQUEST",
            NodeError::InvalidQuery(_) => "ERR_INVALID_QUERY",
            NodeError::UnsupportedProvider(_) => "ERR_LOOKUP_SERVICE_NOT_SUPPORTED",
            NodeError::Unauthorized(_) => "ERR_UNAUTHORIZED",
            NodeError::MessageBoxFull(_) => "ERR_MESSAGE_BOX_FULL",
            NodeError::StorageError(_) | NodeError::SerializationError(_) | NodeError::MetricsError(_) => {
                "ERR_INTERNAL"
            }
        }
    }

    /// HTTP status for the error.
    pub fn status(&self) -> StatusCode {
        match self {
            NodeError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            NodeError::UnsupportedProvider(_) => StatusCode::NOT_FOUND,
            NodeError::MessageBoxFull(_) => StatusCode::TOO_MANY_REQUESTS,
            NodeError::StorageError(_) | NodeError::SerializationError(_) | NodeError::MetricsError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// The error object clients receive in place of a result.
    pub fn to_error_object(&self) -> ErrorObject {
        ErrorObject::new(self.code(), self.to_string())
    }
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeError::CoreError(e) => write!(f, "Core error: {}", e),
            NodeError::StorageError(msg) => write!(f, "Storage error: {}", msg),
            NodeError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            NodeError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            NodeError::InvalidAction(msg) => write!(f, "Invalid action: {}", msg),
            NodeError::InvalidQuery(msg) => write!(f, "Invalid query: {}", msg),
            NodeError::UnsupportedProvider(provider) => {
                write!(f, "Lookup service not supported: {}", provider)
            }
            NodeError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            NodeError::MessageBoxFull(msg) => write!(f, "Message box full: {}", msg),
            NodeError::MetricsError(msg) => write!(f, "Metrics error: {}", msg),
        }
    }
}

impl StdError for NodeError {}

impl From<CoreError> for NodeError {
    fn from(error: CoreError) -> Self {
        NodeError::CoreError(error)
    }
}

impl From<rocksdb::Error> for NodeError {
    fn from(error: rocksdb::Error) -> Self {
        NodeError::StorageError(error.to_string())
    }
}

impl From<bincode::Error> for NodeError {
    fn from(error: bincode::Error) -> Self {
        NodeError::SerializationError(error.to_string())
    }
}
