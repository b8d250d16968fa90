//! Anonymous public-key sealing over X25519.
//!
//! Each seal generates a fresh ephemeral keypair. The AEAD key and nonce
//! come from BLAKE2b over the shared secret and both public keys, so a
//! key is only ever used for one message. Layout:
//! `ephemeral_public_key || ciphertext || tag`.

use blake2::digest::consts::{U24, U32};
use blake2::{Blake2b, Digest};
use chacha20poly1305::aead::OsRng;
use tracing::warn;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use crate::aead::{self, NONCE_SIZE, TAG_SIZE};
use crate::format::key_array;
use seeded_common::{Error, Result, SecureBuffer};

/// X25519 public and private key size.
pub const KEY_SIZE: usize = 32;

/// Bytes a sealed box adds to its plaintext.
pub const OVERHEAD: usize = KEY_SIZE + TAG_SIZE;

const KEY_DOMAIN: &[u8] = b"seeded-sealed-box-key";

/// Deterministic X25519 keypair from 32 bytes of secret material.
///
/// Returns `(private_key, public_key)`. The private key is the input as
/// given; clamping happens inside the scalar multiplication.
///
/// # Errors
/// - `KeyLength` unless `secret` is 32 bytes
pub fn keypair_from_secret(secret: &[u8]) -> Result<(SecureBuffer, [u8; KEY_SIZE])> {
    let static_secret = StaticSecret::from(key_array(secret)?);
    let public = PublicKey::from(&static_secret);
    Ok((SecureBuffer::from_slice(secret), public.to_bytes()))
}

fn low_order_error() -> Error {
    warn!("rejecting a low-order X25519 public key");
    Error::CryptographicVerificationFailure("Public key is a low-order point".to_string())
}

/// Reject public keys of small order. Sealing to one would produce a
/// shared secret that does not depend on any private key.
///
/// # Errors
/// - `CryptographicVerificationFailure` for a low-order point
pub fn check_public_key(public_key: &[u8; KEY_SIZE]) -> Result<()> {
    // A clamped scalar is a multiple of the cofactor, so it maps every
    // low-order point to the identity.
    let scalar = StaticSecret::from([1u8; KEY_SIZE]);
    if scalar.diffie_hellman(&PublicKey::from(*public_key)).was_contributory() {
        Ok(())
    } else {
        Err(low_order_error())
    }
}

fn box_key(shared: &[u8], ephemeral_public: &[u8], recipient_public: &[u8]) -> SecureBuffer {
    let mut hasher = Blake2b::<U32>::new();
    hasher.update(KEY_DOMAIN);
    hasher.update(shared);
    hasher.update(ephemeral_public);
    hasher.update(recipient_public);
    SecureBuffer::from_slice(&hasher.finalize())
}

fn box_nonce(ephemeral_public: &[u8], recipient_public: &[u8]) -> [u8; NONCE_SIZE] {
    let mut hasher = Blake2b::<U24>::new();
    hasher.update(ephemeral_public);
    hasher.update(recipient_public);
    let mut nonce = [0u8; NONCE_SIZE];
    nonce.copy_from_slice(&hasher.finalize());
    nonce
}

/// Seal `plaintext` to `recipient_public_key`, authenticating `aad`.
///
/// # Errors
/// - `KeyLength` unless the public key is 32 bytes
/// - `CryptographicVerificationFailure` if the public key is a low-order
///   point
pub fn seal(recipient_public_key: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    let recipient = PublicKey::from(key_array(recipient_public_key)?);
    let ephemeral = EphemeralSecret::random_from_rng(&mut OsRng);
    let ephemeral_public = PublicKey::from(&ephemeral);
    let shared = ephemeral.diffie_hellman(&recipient);
    if !shared.was_contributory() {
        return Err(low_order_error());
    }

    let key = box_key(shared.as_bytes(), ephemeral_public.as_bytes(), recipient.as_bytes());
    let nonce = box_nonce(ephemeral_public.as_bytes(), recipient.as_bytes());
    let ciphertext = aead::encrypt_with_nonce(key.as_bytes(), &nonce, plaintext, aad)?;

    let mut sealed = Vec::with_capacity(KEY_SIZE + ciphertext.len());
    sealed.extend_from_slice(ephemeral_public.as_bytes());
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Open a sealed box with the recipient's private key.
///
/// # Errors
/// - `KeyLength` unless the private key is 32 bytes
/// - `CryptographicVerificationFailure` if the box is malformed, was
///   sealed to another key, or the ciphertext or `aad` was altered
pub fn open(private_key: &[u8], sealed: &[u8], aad: &[u8]) -> Result<SecureBuffer> {
    let secret = StaticSecret::from(key_array(private_key)?);
    if sealed.len() < OVERHEAD {
        warn!(len = sealed.len(), "sealed box too short to open");
        return Err(Error::CryptographicVerificationFailure("Sealed box too short".to_string()));
    }

    let (ephemeral_bytes, ciphertext) = sealed.split_at(KEY_SIZE);
    let ephemeral_public = PublicKey::from(key_array(ephemeral_bytes)?);
    let recipient_public = PublicKey::from(&secret);
    let shared = secret.diffie_hellman(&ephemeral_public);
    if !shared.was_contributory() {
        warn!("sealed box uses a low-order ephemeral key");
        return Err(Error::CryptographicVerificationFailure(
            "Sealed box has an invalid ephemeral key".to_string(),
        ));
    }

    let key = box_key(shared.as_bytes(), ephemeral_public.as_bytes(), recipient_public.as_bytes());
    let nonce = box_nonce(ephemeral_public.as_bytes(), recipient_public.as_bytes());
    aead::decrypt_with_nonce(key.as_bytes(), &nonce, ciphertext, aad)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypair(fill: u8) -> (SecureBuffer, [u8; KEY_SIZE]) {
        keypair_from_secret(&[fill; KEY_SIZE]).unwrap()
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let (private, public) = keypair(7);
        let sealed = seal(&public, b"attack at dawn", b"ctx").unwrap();
        assert_eq!(sealed.len(), 14 + OVERHEAD);
        let opened = open(private.as_bytes(), &sealed, b"ctx").unwrap();
        assert_eq!(opened.as_bytes(), b"attack at dawn");
    }

    #[test]
    fn test_keypair_deterministic() {
        assert_eq!(keypair(1).1, keypair(1).1);
        assert_ne!(keypair(1).1, keypair(2).1);
    }

    #[test]
    fn test_each_seal_uses_fresh_ephemeral_key() {
        let (_, public) = keypair(7);
        let a = seal(&public, b"same", b"").unwrap();
        let b = seal(&public, b"same", b"").unwrap();
        assert_ne!(&a[..KEY_SIZE], &b[..KEY_SIZE]);
    }

    #[test]
    fn test_wrong_recipient_fails() {
        let (_, public) = keypair(7);
        let (other_private, _) = keypair(8);
        let sealed = seal(&public, b"secret", b"").unwrap();
        assert!(matches!(
            open(other_private.as_bytes(), &sealed, b""),
            Err(Error::CryptographicVerificationFailure(_))
        ));
    }

    #[test]
    fn test_tampering_fails() {
        let (private, public) = keypair(7);
        let sealed = seal(&public, b"secret", b"ctx").unwrap();
        for index in [0, KEY_SIZE, sealed.len() - 1] {
            let mut tampered = sealed.clone();
            tampered[index] ^= 0x01;
            assert!(open(private.as_bytes(), &tampered, b"ctx").is_err());
        }
        assert!(matches!(
            open(private.as_bytes(), &sealed, b"other"),
            Err(Error::CryptographicVerificationFailure(_))
        ));
    }

    #[test]
    fn test_low_order_ephemeral_rejected() {
        let (private, _) = keypair(7);
        let sealed = vec![0u8; OVERHEAD + 4];
        assert!(matches!(
            open(private.as_bytes(), &sealed, b""),
            Err(Error::CryptographicVerificationFailure(_))
        ));
    }

    #[test]
    fn test_low_order_recipient_rejected() {
        let zero = [0u8; KEY_SIZE];
        let mut one = [0u8; KEY_SIZE];
        one[0] = 1;
        for point in [zero, one] {
            assert!(matches!(
                seal(&point, b"top secret", b""),
                Err(Error::CryptographicVerificationFailure(_))
            ));
            assert!(check_public_key(&point).is_err());
        }
        assert!(check_public_key(&keypair(7).1).is_ok());
    }

    #[test]
    fn test_bad_key_lengths() {
        assert!(matches!(
            seal(&[0u8; 31], b"x", b""),
            Err(Error::KeyLength { expected: 32, actual: 31 })
        ));
        assert!(keypair_from_secret(&[0u8; 33]).is_err());
    }
}
