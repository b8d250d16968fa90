//! Authenticated encryption using XChaCha20-Poly1305.
//!
//! XChaCha20-Poly1305 provides both confidentiality and authenticity,
//! with a 24-byte nonce that is safe for random generation. Every seal
//! binds a recipe and its unsealing instructions as associated data.

use chacha20poly1305::{
    aead::{generic_array::GenericArray, Aead, AeadCore, KeyInit, OsRng, Payload},
    XChaCha20Poly1305,
};
use tracing::warn;

use crate::recipe::KEY_LENGTH_IN_BYTES;
use seeded_common::{Error, Result, SecureBuffer};

/// Nonce size for XChaCha20-Poly1305 (24 bytes).
pub const NONCE_SIZE: usize = 24;

/// Authentication tag size (16 bytes).
pub const TAG_SIZE: usize = 16;

/// Domain tag at the start of every binding context.
pub const BINDING_CONTEXT_TAG: &[u8] = b"seeded/v1";

/// Associated data binding a seal to its recipe and instructions:
/// `tag || be32(len(recipe)) || recipe || be32(len(instr)) || instr`.
///
/// Absent instructions are the empty string.
///
/// # Errors
/// - `Serialization` if either string is longer than `u32::MAX` bytes
pub fn binding_context(recipe_json: &str, unsealing_instructions: Option<&str>) -> Result<Vec<u8>> {
    let instructions = unsealing_instructions.unwrap_or_default();
    let framed = SecureBuffer::combine_length_prefixed_list(&[
        recipe_json.as_bytes(),
        instructions.as_bytes(),
    ])?;

    let mut context = Vec::with_capacity(BINDING_CONTEXT_TAG.len() + framed.len());
    context.extend_from_slice(BINDING_CONTEXT_TAG);
    context.extend_from_slice(framed.as_bytes());
    Ok(context)
}

fn cipher(key: &[u8]) -> Result<XChaCha20Poly1305> {
    if key.len() != KEY_LENGTH_IN_BYTES {
        return Err(Error::key_length(KEY_LENGTH_IN_BYTES, key.len()));
    }
    Ok(XChaCha20Poly1305::new(GenericArray::from_slice(key)))
}

/// Encrypt plaintext using XChaCha20-Poly1305.
///
/// # Preconditions
/// - `key` must be exactly 32 bytes
///
/// # Postconditions
/// - Returns nonce || ciphertext || tag
/// - The nonce is randomly generated
///
/// # Errors
/// - `KeyLength` if the key length is incorrect
///
/// # Security
/// - Authenticates `aad` along with the ciphertext
pub fn encrypt(key: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    let cipher = cipher(key)?;
    let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, Payload { msg: plaintext, aad })
        .map_err(|e| Error::Serialization(format!("Encryption failed: {}", e)))?;

    let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    result.extend_from_slice(&nonce);
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

/// Decrypt nonce || ciphertext || tag produced by [`encrypt`].
///
/// # Errors
/// - `KeyLength` if the key length is incorrect
/// - `CryptographicVerificationFailure` if the input is too short, the
///   key is wrong, or the ciphertext or `aad` was altered
pub fn decrypt(key: &[u8], ciphertext: &[u8], aad: &[u8]) -> Result<SecureBuffer> {
    if ciphertext.len() < NONCE_SIZE + TAG_SIZE {
        warn!(len = ciphertext.len(), "ciphertext too short to unseal");
        return Err(Error::CryptographicVerificationFailure("Ciphertext too short".to_string()));
    }
    let (nonce, encrypted) = ciphertext.split_at(NONCE_SIZE);
    decrypt_with_nonce(key, nonce, encrypted, aad)
}

/// Encrypt with a caller-chosen nonce. Returns ciphertext || tag.
///
/// # Warning
/// Reusing a nonce with the same key breaks confidentiality. Only use this
/// when the key is single-use, as in the sealed box.
pub fn encrypt_with_nonce(
    key: &[u8],
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    cipher(key)?
        .encrypt(GenericArray::from_slice(nonce), Payload { msg: plaintext, aad })
        .map_err(|e| Error::Serialization(format!("Encryption failed: {}", e)))
}

/// Decrypt ciphertext || tag with a caller-supplied nonce.
pub fn decrypt_with_nonce(
    key: &[u8],
    nonce: &[u8],
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<SecureBuffer> {
    let cipher = cipher(key)?;
    if nonce.len() != NONCE_SIZE || ciphertext.len() < TAG_SIZE {
        warn!(len = ciphertext.len(), "ciphertext too short to unseal");
        return Err(Error::CryptographicVerificationFailure("Ciphertext too short".to_string()));
    }

    cipher
        .decrypt(GenericArray::from_slice(nonce), Payload { msg: ciphertext, aad })
        .map(SecureBuffer::from_vec)
        .map_err(|_| {
            warn!("authenticated decryption failed");
            Error::CryptographicVerificationFailure("Decryption failed".to_string())
        })
}
