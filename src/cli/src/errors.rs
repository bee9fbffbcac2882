//! Error types for the Postboard client.

use postboard_core::{CoreError, Outpoint};
use std::error::Error as StdError;
use std::fmt;

/// Errors that can occur in the Postboard client.
#[derive(Debug)]
pub enum ClientError {
    /// Error when a file operation fails.
    FileError(std::io::Error),

    /// Error when JSON serialization or deserialization fails.
    JsonError(serde_json::Error),

    /// Error when a BIP32 operation fails.
    Bip32Error(bip32::Error),

    /// Error when an ed25519 operation fails.
    Ed25519Error(ed25519_dalek::SignatureError),

    /// Error when a token or payload cannot be handled.
    CoreError(CoreError),

    /// Error when user input is rejected before any service is called.
    ValidationError(String),

    /// Error when the signing service cannot produce a script or signature.
    SigningError(String),

    /// Error when the signing service cannot create an action.
    TransactionError(String),

    /// Error when the overlay rejects a submission.
    SubmissionError(String),

    /// Error object returned by the overlay lookup service.
    LookupError {
        /// Machine readable code
        code: String,
        /// Human readable description
        description: String,
    },

    /// Error when a request cannot reach a service.
    NetworkError(String),

    /// Error when the payment service fails.
    PaymentError(String),

    /// Error when a record or payment fails an integrity check.
    IntegrityError(String),

    /// Error when loading posts fails.
    LoadError(Box<ClientError>),

    /// Error when redeeming a post fails.
    RedemptionError(Box<ClientError>),

    /// Error when a wallet file operation fails.
    WalletError(String),

    /// Error when a post is not on the board.
    PostNotFound(Outpoint),
}

impl ClientError {
    /// Returns true for failures of an external service call.
    pub fn is_service_error(&self) -> bool {
        match self {
            ClientError::SigningError(_)
            | ClientError::TransactionError(_)
            | ClientError::SubmissionError(_)
            | ClientError::LookupError { .. }
            | ClientError::NetworkError(_)
            | ClientError::PaymentError(_) => true,
            ClientError::LoadError(inner) | ClientError::RedemptionError(inner) => inner.is_service_error(),
            _ => false,
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::FileError(e) => write!(f, "File error: {}", e),
            ClientError::JsonError(e) => write!(f, "JSON error: {}", e),
            ClientError::Bip32Error(e) => write!(f, "BIP32 error: {}", e),
            ClientError::Ed25519Error(e) => write!(f, "Ed25519 error: {}", e),
            ClientError::CoreError(e) => write!(f, "Token error: {}", e),
            ClientError::ValidationError(msg) => write!(f, "{}", msg),
            ClientError::SigningError(msg) => write!(f, "Signing error: {}", msg),
            ClientError::TransactionError(msg) => write!(f, "Transaction error: {}", msg),
            ClientError::SubmissionError(msg) => write!(f, "Overlay submission failed: {}", msg),
            ClientError::LookupError { code, description } => {
                write!(f, "Overlay lookup failed ({}): {}", code, description)
            }
            ClientError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            ClientError::PaymentError(msg) => write!(f, "Payment error: {}", msg),
            ClientError::IntegrityError(msg) => write!(f, "Integrity check failed: {}", msg),
            ClientError::LoadError(e) => write!(f, "Failed to load posts: {}", e),
            ClientError::RedemptionError(e) => write!(f, "Error redeeming post: {}", e),
            ClientError::WalletError(msg) => write!(f, "Wallet error: {}", msg),
            ClientError::PostNotFound(outpoint) => write!(f, "Post not found: {}", outpoint),
        }
    }
}

impl StdError for ClientError {}

impl From<std::io::Error> for ClientError {
    fn from(error: std::io::Error) -> Self {
        ClientError::FileError(error)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(error: serde_json::Error) -> Self {
        ClientError::JsonError(error)
    }
}

impl From<bip32::Error> for ClientError {
    fn from(error: bip32::Error) -> Self {
        ClientError::Bip32Error(error)
    }
}

impl From<ed25519_dalek::SignatureError> for ClientError {
    fn from(error: ed25519_dalek::SignatureError) -> Self {
        ClientError::Ed25519Error(error)
    }
}

impl From<CoreError> for ClientError {
    fn from(error: CoreError) -> Self {
        ClientError::CoreError(error)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(error: reqwest::Error) -> Self {
        ClientError::NetworkError(error.to_string())
    }
}
