//! Public-key sealing: [`SealingKey`] seals, [`UnsealingKey`] unseals.
//!
//! An `UnsealingKey` is derived from a seed. Its `SealingKey` carries only
//! the public key and recipe JSON, so it can be handed to anyone who needs
//! to seal messages for the key's owner.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::aead::binding_context;
use crate::derivation::derive_primary_secret_for;
use crate::format;
use crate::packaged::PackagedSealedMessage;
use crate::recipe::{RecipeType, KEY_LENGTH_IN_BYTES};
use crate::sealed_box::{self, KEY_SIZE};
use seeded_common::{Result, SecureBuffer};

/// Public half of an X25519 keypair, able to seal but not unseal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SealingKeyJson", into = "SealingKeyJson")]
pub struct SealingKey {
    public_key_bytes: [u8; KEY_SIZE],
    recipe_json: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SealingKeyJson {
    public_key_bytes: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    recipe_json: String,
}

impl From<SealingKey> for SealingKeyJson {
    fn from(key: SealingKey) -> Self {
        Self {
            public_key_bytes: hex::encode(key.public_key_bytes),
            recipe_json: key.recipe_json,
        }
    }
}

impl TryFrom<SealingKeyJson> for SealingKey {
    type Error = seeded_common::Error;

    fn try_from(json: SealingKeyJson) -> Result<Self> {
        let bytes = format::fixed_hex(&json.public_key_bytes, KEY_SIZE)?;
        SealingKey::new(bytes.as_bytes(), json.recipe_json)
    }
}

impl SealingKey {
    /// Rebuild a sealing key from its public bytes. No seed is needed.
    ///
    /// # Errors
    /// - `KeyLength` unless `public_key_bytes` is 32 bytes
    /// - `CryptographicVerificationFailure` if the bytes are a low-order
    ///   point
    pub fn new(public_key_bytes: &[u8], recipe_json: impl Into<String>) -> Result<Self> {
        let public_key_bytes = format::key_array(public_key_bytes)?;
        sealed_box::check_public_key(&public_key_bytes)?;
        Ok(Self {
            public_key_bytes,
            recipe_json: recipe_json.into(),
        })
    }

    /// Derive the unsealing key from the seed and keep its public half.
    pub fn derive_from_seed(seed: impl AsRef<[u8]>, recipe_json: &str) -> Result<Self> {
        Ok(UnsealingKey::derive_from_seed(seed, recipe_json)?.sealing_key())
    }

    pub fn public_key_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.public_key_bytes
    }

    pub fn recipe_json(&self) -> &str {
        &self.recipe_json
    }

    /// Seal to raw public-key bytes without building a `SealingKey`.
    ///
    /// # Errors
    /// - `KeyLength` unless `public_key_bytes` is 32 bytes
    /// - `CryptographicVerificationFailure` if the bytes are a low-order
    ///   point
    pub fn seal_to_public_key(
        public_key_bytes: &[u8],
        recipe_json: &str,
        plaintext: &[u8],
        unsealing_instructions: Option<&str>,
    ) -> Result<PackagedSealedMessage> {
        let aad = binding_context(recipe_json, unsealing_instructions)?;
        debug!(plaintext_len = plaintext.len(), "sealing to public key");
        let ciphertext = sealed_box::seal(public_key_bytes, plaintext, &aad)?;
        Ok(PackagedSealedMessage::new(ciphertext, recipe_json, unsealing_instructions))
    }

    /// Seal and return only `ephemeral_public_key || ciphertext || tag`.
    pub fn seal_to_ciphertext_only(
        &self,
        plaintext: &[u8],
        unsealing_instructions: Option<&str>,
    ) -> Result<Vec<u8>> {
        let aad = binding_context(&self.recipe_json, unsealing_instructions)?;
        debug!(plaintext_len = plaintext.len(), "sealing with sealing key");
        sealed_box::seal(&self.public_key_bytes, plaintext, &aad)
    }

    pub fn seal(
        &self,
        plaintext: &[u8],
        unsealing_instructions: Option<&str>,
    ) -> Result<PackagedSealedMessage> {
        Self::seal_to_public_key(
            &self.public_key_bytes,
            &self.recipe_json,
            plaintext,
            unsealing_instructions,
        )
    }

    pub fn to_json(&self) -> Result<String> {
        format::to_json(self, "sealing key")
    }

    pub fn from_json(json: &str) -> Result<Self> {
        format::from_json(json, "sealing key")
    }

    pub fn to_serialized_binary_form(&self) -> Result<SecureBuffer> {
        SecureBuffer::combine_length_prefixed_list(&[
            self.public_key_bytes.as_slice(),
            self.recipe_json.as_bytes(),
        ])
    }

    pub fn from_serialized_binary_form(serialized: &[u8]) -> Result<Self> {
        let fields = format::split_fields(serialized, 2)?;
        Self::new(fields[0].as_bytes(), fields[1].to_utf8_string()?)
    }
}

/// Private half of an X25519 keypair. Owns the private key bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct UnsealingKey {
    private_key_bytes: SecureBuffer,
    public_key_bytes: [u8; KEY_SIZE],
    recipe_json: String,
}

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
struct UnsealingKeyJson {
    private_key_bytes: String,
    public_key_bytes: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    recipe_json: String,
}

impl UnsealingKey {
    /// # Errors
    /// - `KeyLength` unless both keys are 32 bytes
    pub fn new(
        private_key_bytes: SecureBuffer,
        public_key_bytes: &[u8],
        recipe_json: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            private_key_bytes: format::fixed_length(private_key_bytes, KEY_SIZE)?,
            public_key_bytes: format::key_array(public_key_bytes)?,
            recipe_json: recipe_json.into(),
        })
    }

    /// Derive an X25519 keypair from `seed` and `recipe_json`.
    ///
    /// # Errors
    /// - Any recipe parsing error, including a recipe for another type or
    ///   a length other than 32 bytes
    pub fn derive_from_seed(seed: impl AsRef<[u8]>, recipe_json: &str) -> Result<Self> {
        let (recipe, secret) = derive_primary_secret_for(
            seed.as_ref(),
            recipe_json,
            RecipeType::UnsealingKey,
            Some(KEY_LENGTH_IN_BYTES),
        )?;
        let (private_key_bytes, public_key_bytes) =
            sealed_box::keypair_from_secret(secret.as_bytes())?;
        debug!("derived unsealing key");
        Self::new(private_key_bytes, &public_key_bytes, recipe.canonical_json())
    }

    pub fn private_key_bytes(&self) -> &SecureBuffer {
        &self.private_key_bytes
    }

    pub fn public_key_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.public_key_bytes
    }

    pub fn recipe_json(&self) -> &str {
        &self.recipe_json
    }

    /// The public counterpart, without re-deriving from the seed.
    pub fn sealing_key(&self) -> SealingKey {
        SealingKey {
            public_key_bytes: self.public_key_bytes,
            recipe_json: self.recipe_json.clone(),
        }
    }

    /// Unseal ciphertext bound to this key's recipe JSON.
    ///
    /// # Errors
    /// - `CryptographicVerificationFailure` if the message was sealed to
    ///   another key or the ciphertext or instructions were altered
    pub fn unseal_ciphertext(
        &self,
        ciphertext: &[u8],
        unsealing_instructions: Option<&str>,
    ) -> Result<SecureBuffer> {
        let aad = binding_context(&self.recipe_json, unsealing_instructions)?;
        sealed_box::open(self.private_key_bytes.as_bytes(), ciphertext, &aad)
    }

    /// Unseal a packaged message, authenticating the recipe JSON and
    /// instructions it carries.
    pub fn unseal(&self, message: &PackagedSealedMessage) -> Result<SecureBuffer> {
        let aad = binding_context(&message.recipe_json, message.unsealing_instructions())?;
        sealed_box::open(self.private_key_bytes.as_bytes(), &message.ciphertext, &aad)
    }

    pub fn to_json(&self) -> Result<String> {
        format::to_json(
            &UnsealingKeyJson {
                private_key_bytes: self.private_key_bytes.to_hex_string(),
                public_key_bytes: hex::encode(self.public_key_bytes),
                recipe_json: self.recipe_json.clone(),
            },
            "unsealing key",
        )
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let parsed: UnsealingKeyJson = format::from_json(json, "unsealing key")?;
        let public = format::fixed_hex(&parsed.public_key_bytes, KEY_SIZE)?;
        Self::new(
            format::fixed_hex(&parsed.private_key_bytes, KEY_SIZE)?,
            public.as_bytes(),
            parsed.recipe_json.clone(),
        )
    }

    pub fn to_serialized_binary_form(&self) -> Result<SecureBuffer> {
        SecureBuffer::combine_length_prefixed_list(&[
            self.private_key_bytes.as_bytes(),
            self.public_key_bytes.as_slice(),
            self.recipe_json.as_bytes(),
        ])
    }

    pub fn from_serialized_binary_form(serialized: &[u8]) -> Result<Self> {
        let fields = format::split_fields(serialized, 3)?;
        Self::new(fields[0].clone(), fields[1].as_bytes(), fields[2].to_utf8_string()?)
    }
}

impl fmt::Debug for UnsealingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnsealingKey")
            .field("private_key_bytes", &self.private_key_bytes)
            .field("public_key_bytes", &hex::encode(self.public_key_bytes))
            .field("recipe_json", &self.recipe_json)
            .finish()
    }
}
