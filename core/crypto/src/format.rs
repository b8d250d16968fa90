//! JSON and binary helpers shared by the key types.

use serde::de::DeserializeOwned;
use serde::Serialize;

use seeded_common::{Error, Result, SecureBuffer};

pub(crate) fn from_json<T: DeserializeOwned>(text: &str, what: &str) -> Result<T> {
    serde_json::from_str(text)
        .map_err(|e| Error::JsonParsing(format!("Invalid {} JSON: {}", what, e)))
}

pub(crate) fn to_json<T: Serialize>(value: &T, what: &str) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| Error::Serialization(format!("Failed to serialize {}: {}", what, e)))
}

/// Decode a hex field that must hold exactly `expected` bytes.
pub(crate) fn fixed_hex(hex: &str, expected: usize) -> Result<SecureBuffer> {
    let bytes = SecureBuffer::from_hex_string(hex)?;
    fixed_length(bytes, expected)
}

pub(crate) fn fixed_length(bytes: SecureBuffer, expected: usize) -> Result<SecureBuffer> {
    if bytes.len() != expected {
        return Err(Error::key_length(expected, bytes.len()));
    }
    Ok(bytes)
}

/// Copy a 32-byte field into an array.
pub(crate) fn key_array(bytes: &[u8]) -> Result<[u8; 32]> {
    bytes.try_into().map_err(|_| Error::key_length(32, bytes.len()))
}

/// Split a binary form into `count` framed fields.
pub(crate) fn split_fields(serialized: &[u8], count: usize) -> Result<Vec<SecureBuffer>> {
    SecureBuffer::from_slice(serialized).split_length_prefixed_list(count)
}
