//! Error types for the core crate.

use thiserror::Error;

/// Errors that can occur in the core crate.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Error when a locking script cannot be parsed.
    #[error("Malformed script at byte {offset}: {reason}")]
    MalformedScript {
        /// Byte offset where parsing stopped
        offset: usize,
        /// What was wrong
        reason: String,
    },

    /// Error when a token carries an unexpected number of fields.
    #[error("Invalid field count: expected {expected}, got {actual}")]
    InvalidFieldCount {
        /// The accepted field counts
        expected: String,
        /// The actual field count
        actual: usize,
    },

    /// Error when the namespace prefix does not belong to this protocol.
    #[error("Unknown protocol prefix: {0}")]
    UnknownPrefix(String),

    /// Error when a field is not valid UTF-8.
    #[error("Field {index} is not valid UTF-8")]
    InvalidUtf8 {
        /// The field index
        index: usize,
    },

    /// Error when a public key cannot be parsed.
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Error when a signature verification fails.
    #[error("Signature verification failed: {0}")]
    SignatureVerificationFailed(String),

    /// Error when hex decoding fails.
    #[error("Hex error: {0}")]
    HexError(#[from] hex::FromHexError),

    /// Error when serialization or deserialization fails.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}
