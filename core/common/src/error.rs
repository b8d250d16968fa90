//! Common error types for seeded key derivation.

use thiserror::Error;

/// Top-level error type for seeded operations.
///
/// Every failure is locally unrecoverable: identical inputs reproduce the
/// same error, so nothing in the workspace retries.
#[derive(Debug, Error)]
pub enum Error {
    /// JSON text could not be parsed, or a non-recipe JSON document is
    /// missing a required field.
    #[error("JSON parsing error: {0}")]
    JsonParsing(String),

    /// The recipe parsed as JSON but is structurally invalid.
    #[error("Invalid recipe JSON: {0}")]
    InvalidRecipeJson(String),

    /// A recognized recipe field holds a value that is illegal in context.
    #[error("Invalid recipe value: {0}")]
    InvalidRecipeValue(String),

    /// A byte length does not match what a primitive requires.
    #[error("Invalid key length: expected {expected}, got {actual}")]
    KeyLength { expected: usize, actual: usize },

    /// Authenticated decryption or signature verification failed.
    ///
    /// Treat as possible tampering.
    #[error("Cryptographic verification failure: {0}")]
    CryptographicVerificationFailure(String),

    /// A serialized form (binary framing, hex, base64, UTF-8) is malformed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Whether this error may indicate tampering rather than bad input.
    pub fn is_security_relevant(&self) -> bool {
        matches!(self, Self::CryptographicVerificationFailure(_))
    }

    /// Shorthand for a `KeyLength` error.
    pub fn key_length(expected: usize, actual: usize) -> Self {
        Self::KeyLength { expected, actual }
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
