//! Recipe-driven key derivation and sealing.
//!
//! This crate provides:
//! - Recipe parsing and canonicalization
//! - Seed stretching with BLAKE2b, SHA-256, Argon2id or Scrypt
//! - Derived secrets, passwords, symmetric keys, X25519 sealing keys and
//!   Ed25519 signing keys
//! - Authenticated sealing that binds the recipe and unsealing
//!   instructions, packaged as [`PackagedSealedMessage`]
//!
//! # Security Guarantees
//! - All secret material lives in zeroizing buffers
//! - No seed, key or plaintext is ever logged
//! - The same seed and canonical recipe always derive the same key

pub mod aead;
pub mod asymmetric;
pub mod derivation;
mod format;
pub mod hash;
pub mod packaged;
pub mod password;
pub mod recipe;
pub mod sealed_box;
pub mod secret;
pub mod signing;
pub mod symmetric;
pub mod word_list;

pub use asymmetric::{SealingKey, UnsealingKey};
pub use derivation::{derive_primary_secret, derive_primary_secret_for, Seed};
pub use hash::{HashAlgorithm, HashFunction, MemoryHardParams};
pub use packaged::PackagedSealedMessage;
pub use password::Password;
pub use recipe::{Algorithm, Recipe, RecipeType};
pub use secret::Secret;
pub use signing::{SignatureVerificationKey, SigningKey};
pub use symmetric::SymmetricKey;
pub use word_list::WordListName;

pub use seeded_common::{Error, Result, SecureBuffer};
