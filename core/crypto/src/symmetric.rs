//! Symmetric keys for sealing and unsealing.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::aead::{self, binding_context};
use crate::derivation::derive_primary_secret_for;
use crate::format;
use crate::packaged::PackagedSealedMessage;
use crate::recipe::{RecipeType, KEY_LENGTH_IN_BYTES};
use seeded_common::{Result, SecureBuffer};

/// A 32-byte key for authenticated symmetric encryption.
///
/// Every seal binds this key's recipe JSON and the caller's unsealing
/// instructions as associated data.
#[derive(Clone, PartialEq, Eq)]
pub struct SymmetricKey {
    key_bytes: SecureBuffer,
    recipe_json: String,
}

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
struct SymmetricKeyJson {
    key_bytes: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    recipe_json: String,
}

impl SymmetricKey {
    /// # Errors
    /// - `KeyLength` unless `key_bytes` is 32 bytes
    pub fn new(key_bytes: SecureBuffer, recipe_json: impl Into<String>) -> Result<Self> {
        Ok(Self {
            key_bytes: format::fixed_length(key_bytes, KEY_LENGTH_IN_BYTES)?,
            recipe_json: recipe_json.into(),
        })
    }

    /// # Errors
    /// - Any recipe parsing error, including a recipe for another type or
    ///   a length other than 32 bytes
    pub fn derive_from_seed(seed: impl AsRef<[u8]>, recipe_json: &str) -> Result<Self> {
        let (recipe, key_bytes) = derive_primary_secret_for(
            seed.as_ref(),
            recipe_json,
            RecipeType::SymmetricKey,
            Some(KEY_LENGTH_IN_BYTES),
        )?;
        debug!("derived symmetric key");
        Self::new(key_bytes, recipe.canonical_json())
    }

    pub fn key_bytes(&self) -> &SecureBuffer {
        &self.key_bytes
    }

    pub fn recipe_json(&self) -> &str {
        &self.recipe_json
    }

    /// Seal and return only `nonce || ciphertext || tag`.
    pub fn seal_to_ciphertext_only(
        &self,
        plaintext: &[u8],
        unsealing_instructions: Option<&str>,
    ) -> Result<Vec<u8>> {
        let aad = binding_context(&self.recipe_json, unsealing_instructions)?;
        debug!(plaintext_len = plaintext.len(), "sealing with symmetric key");
        aead::encrypt(self.key_bytes.as_bytes(), plaintext, &aad)
    }

    /// Seal and package the ciphertext with this key's recipe and the
    /// instructions.
    pub fn seal(
        &self,
        plaintext: &[u8],
        unsealing_instructions: Option<&str>,
    ) -> Result<PackagedSealedMessage> {
        let ciphertext = self.seal_to_ciphertext_only(plaintext, unsealing_instructions)?;
        Ok(PackagedSealedMessage::new(ciphertext, self.recipe_json.clone(), unsealing_instructions))
    }

    /// Unseal ciphertext bound to this key's recipe JSON.
    ///
    /// # Errors
    /// - `CryptographicVerificationFailure` if the key is wrong or the
    ///   ciphertext or instructions were altered
    pub fn unseal_ciphertext(
        &self,
        ciphertext: &[u8],
        unsealing_instructions: Option<&str>,
    ) -> Result<SecureBuffer> {
        self.unseal_bound(ciphertext, &self.recipe_json, unsealing_instructions)
    }

    /// Unseal a packaged message, authenticating the recipe JSON and
    /// instructions it carries.
    ///
    /// # Errors
    /// - `CryptographicVerificationFailure` if the key is wrong or any of
    ///   the three fields was altered
    pub fn unseal(&self, message: &PackagedSealedMessage) -> Result<SecureBuffer> {
        self.unseal_bound(
            &message.ciphertext,
            &message.recipe_json,
            message.unsealing_instructions(),
        )
    }

    fn unseal_bound(
        &self,
        ciphertext: &[u8],
        recipe_json: &str,
        unsealing_instructions: Option<&str>,
    ) -> Result<SecureBuffer> {
        let aad = binding_context(recipe_json, unsealing_instructions)?;
        aead::decrypt(self.key_bytes.as_bytes(), ciphertext, &aad)
    }

    pub fn to_json(&self) -> Result<String> {
        format::to_json(
            &SymmetricKeyJson {
                key_bytes: self.key_bytes.to_hex_string(),
                recipe_json: self.recipe_json.clone(),
            },
            "symmetric key",
        )
    }

    /// # Errors
    /// - `JsonParsing` if the text is not a symmetric-key object
    /// - `Serialization` if `keyBytes` is not hex
    /// - `KeyLength` unless `keyBytes` holds 32 bytes
    pub fn from_json(json: &str) -> Result<Self> {
        let parsed: SymmetricKeyJson = format::from_json(json, "symmetric key")?;
        Self::new(
            format::fixed_hex(&parsed.key_bytes, KEY_LENGTH_IN_BYTES)?,
            parsed.recipe_json.clone(),
        )
    }

    pub fn to_serialized_binary_form(&self) -> Result<SecureBuffer> {
        SecureBuffer::combine_length_prefixed_list(&[
            self.key_bytes.as_bytes(),
            self.recipe_json.as_bytes(),
        ])
    }

    pub fn from_serialized_binary_form(serialized: &[u8]) -> Result<Self> {
        let fields = format::split_fields(serialized, 2)?;
        Self::new(fields[0].clone(), fields[1].to_utf8_string()?)
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymmetricKey([REDACTED], {})", self.recipe_json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use seeded_common::Error;

    const SEED: &str = "correct horse battery staple";

    fn key() -> SymmetricKey {
        SymmetricKey::derive_from_seed(SEED, r#"{"type":"SymmetricKey"}"#).unwrap()
    }

    #[test]
    fn test_seal_unseal_hello() {
        let key = key();
        let message = key.seal(b"hello", Some("")).unwrap();
        assert_eq!(message.recipe_json, r#"{"type":"SymmetricKey"}"#);
        assert_eq!(key.unseal(&message).unwrap().as_bytes(), b"hello");

        let again = key.seal(b"hello", Some("")).unwrap();
        assert_ne!(again.ciphertext, message.ciphertext);
        assert_eq!(key.unseal(&again).unwrap().as_bytes(), b"hello");
    }

    #[test]
    fn test_derivation_deterministic() {
        assert_eq!(key(), key());
        assert_eq!(key(), SymmetricKey::derive_from_seed(SEED, "").unwrap());
        assert_eq!(
            key(),
            SymmetricKey::derive_from_seed(SEED, key().recipe_json()).unwrap()
        );
    }

    #[test]
    fn test_invalid_recipe_rejected() {
        assert!(matches!(
            SymmetricKey::derive_from_seed(SEED, r#"{"type":"SymmetricKey","lengthInBytes":-1}"#),
            Err(Error::InvalidRecipeValue(_))
        ));
        assert!(matches!(
            SymmetricKey::derive_from_seed(SEED, r#"{"type":"SymmetricKey","lengthInBytes":16}"#),
            Err(Error::InvalidRecipeValue(_))
        ));
    }

    #[test]
    fn test_instructions_bound() {
        let key = key();
        let message = key.seal(b"payload", Some("open after 2030")).unwrap();
        assert_eq!(message.unsealing_instructions(), Some("open after 2030"));

        let mut altered = message.clone();
        altered.unsealing_instructions = "open now".to_string();
        assert!(matches!(key.unseal(&altered), Err(Error::CryptographicVerificationFailure(_))));

        let mut dropped = message.clone();
        dropped.unsealing_instructions.clear();
        assert!(key.unseal(&dropped).is_err());
    }

    #[test]
    fn test_recipe_bound() {
        let key = key();
        let mut message = key.seal(b"payload", None).unwrap();
        message.recipe_json = r#"{"type":"SymmetricKey","x":1}"#.to_string();
        assert!(matches!(key.unseal(&message), Err(Error::CryptographicVerificationFailure(_))));
    }

    #[test]
    fn test_cross_key_rejection() {
        let message = key().seal(b"payload", None).unwrap();
        let other_seed = SymmetricKey::derive_from_seed("another seed", "").unwrap();
        let other_recipe = SymmetricKey::derive_from_seed(SEED, r#"{"purpose":"mail"}"#).unwrap();
        assert!(other_seed.unseal(&message).is_err());
        assert!(other_recipe.unseal(&message).is_err());
    }

    #[test]
    fn test_ciphertext_only_round_trip() {
        let key = key();
        let ciphertext = key.seal_to_ciphertext_only(b"raw", Some("i")).unwrap();
        assert_eq!(key.unseal_ciphertext(&ciphertext, Some("i")).unwrap().as_bytes(), b"raw");
        assert!(key.unseal_ciphertext(&ciphertext, None).is_err());
    }

    #[test]
    fn test_json_and_binary_forms() {
        let key = key();
        let json = key.to_json().unwrap();
        assert!(json.contains(r#""keyBytes":""#));
        assert_eq!(SymmetricKey::from_json(&json).unwrap(), key);
        let binary = key.to_serialized_binary_form().unwrap();
        assert_eq!(SymmetricKey::from_serialized_binary_form(binary.as_bytes()).unwrap(), key);

        assert!(matches!(
            SymmetricKey::from_json(r#"{"keyBytes":"0011"}"#),
            Err(Error::KeyLength { expected: 32, actual: 2 })
        ));
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = key();
        assert!(!format!("{:?}", key).contains(&key.key_bytes().to_hex_string()));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_seal_unseal(
            plaintext in proptest::collection::vec(any::<u8>(), 0..512),
            instructions in proptest::option::of(".{0,32}"),
        ) {
            let key = key();
            let message = key.seal(&plaintext, instructions.as_deref()).unwrap();
            let unsealed = key.unseal(&message).unwrap();
            prop_assert_eq!(unsealed.as_bytes(), plaintext.as_slice());
        }

        #[test]
        fn prop_bit_flip_detected(
            plaintext in proptest::collection::vec(any::<u8>(), 0..64),
            flip in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let key = key();
            let mut message = key.seal(&plaintext, Some("instr")).unwrap();
            let index = flip.index(message.ciphertext.len());
            message.ciphertext[index] ^= 1 << bit;
            prop_assert!(matches!(
                key.unseal(&message),
                Err(Error::CryptographicVerificationFailure(_))
            ));
        }
    }
}
