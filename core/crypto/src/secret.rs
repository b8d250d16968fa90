//! Raw derived secrets of caller-chosen length.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::derivation::derive_primary_secret_for;
use crate::format;
use crate::recipe::RecipeType;
use seeded_common::{Result, SecureBuffer};

/// Secret bytes derived from a seed and a Secret recipe.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret {
    secret_bytes: SecureBuffer,
    recipe_json: String,
}

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
struct SecretJson {
    secret_bytes: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    recipe_json: String,
}

impl Secret {
    pub fn new(secret_bytes: SecureBuffer, recipe_json: impl Into<String>) -> Self {
        Self {
            secret_bytes,
            recipe_json: recipe_json.into(),
        }
    }

    /// Derive a secret. The length comes from the recipe and defaults to
    /// 32 bytes.
    ///
    /// # Errors
    /// - Any recipe parsing error, including a recipe for another type
    pub fn derive_from_seed(seed: impl AsRef<[u8]>, recipe_json: &str) -> Result<Self> {
        let (recipe, secret_bytes) =
            derive_primary_secret_for(seed.as_ref(), recipe_json, RecipeType::Secret, None)?;
        debug!(len = secret_bytes.len(), "derived secret");
        Ok(Self::new(secret_bytes, recipe.canonical_json()))
    }

    pub fn secret_bytes(&self) -> &SecureBuffer {
        &self.secret_bytes
    }

    pub fn recipe_json(&self) -> &str {
        &self.recipe_json
    }

    pub fn to_json(&self) -> Result<String> {
        format::to_json(
            &SecretJson {
                secret_bytes: self.secret_bytes.to_hex_string(),
                recipe_json: self.recipe_json.clone(),
            },
            "secret",
        )
    }

    /// # Errors
    /// - `JsonParsing` if the text is not a secret object
    /// - `Serialization` if `secretBytes` is not hex
    pub fn from_json(json: &str) -> Result<Self> {
        let parsed: SecretJson = format::from_json(json, "secret")?;
        Ok(Self::new(
            SecureBuffer::from_hex_string(&parsed.secret_bytes)?,
            parsed.recipe_json.clone(),
        ))
    }

    /// `be32(len) || secret || be32(len) || recipe_json`.
    pub fn to_serialized_binary_form(&self) -> Result<SecureBuffer> {
        SecureBuffer::combine_length_prefixed_list(&[
            self.secret_bytes.as_bytes(),
            self.recipe_json.as_bytes(),
        ])
    }

    pub fn from_serialized_binary_form(serialized: &[u8]) -> Result<Self> {
        let fields = format::split_fields(serialized, 2)?;
        Ok(Self::new(fields[0].clone(), fields[1].to_utf8_string()?))
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("secret_bytes", &self.secret_bytes)
            .field("recipe_json", &self.recipe_json)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seeded_common::Error;

    #[test]
    fn test_default_length() {
        let secret = Secret::derive_from_seed("seed", "").unwrap();
        assert_eq!(secret.secret_bytes().len(), 32);
        assert_eq!(secret.recipe_json(), r#"{"type":"Secret"}"#);
    }

    #[test]
    fn test_requested_length() {
        let secret = Secret::derive_from_seed("seed", r#"{"lengthInBits":100}"#).unwrap();
        assert_eq!(secret.secret_bytes().len(), 13);
        assert_eq!(secret.recipe_json(), r#"{"lengthInBytes":13,"type":"Secret"}"#);

        let long = Secret::derive_from_seed("seed", r#"{"lengthInBytes":1000}"#).unwrap();
        assert_eq!(long.secret_bytes().len(), 1000);
    }

    #[test]
    fn test_deterministic_and_seed_dependent() {
        let a = Secret::derive_from_seed("seed", "").unwrap();
        assert_eq!(a, Secret::derive_from_seed("seed", "{}").unwrap());
        assert_ne!(a, Secret::derive_from_seed("other", "").unwrap());
    }

    #[test]
    fn test_wrong_type_rejected() {
        assert!(matches!(
            Secret::derive_from_seed("seed", r#"{"type":"SymmetricKey"}"#),
            Err(Error::InvalidRecipeValue(_))
        ));
    }

    #[test]
    fn test_json_and_binary_forms() {
        let secret = Secret::derive_from_seed("seed", r#"{"lengthInBytes":8}"#).unwrap();
        let json = secret.to_json().unwrap();
        assert!(json.contains(r#""secretBytes":""#));
        assert_eq!(Secret::from_json(&json).unwrap(), secret);

        let binary = secret.to_serialized_binary_form().unwrap();
        assert_eq!(Secret::from_serialized_binary_form(binary.as_bytes()).unwrap(), secret);
    }

    #[test]
    fn test_from_json_errors() {
        assert!(matches!(Secret::from_json("{}"), Err(Error::JsonParsing(_))));
        assert!(matches!(
            Secret::from_json(r#"{"secretBytes":"zz"}"#),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn test_debug_is_redacted() {
        let secret = Secret::new(SecureBuffer::from_slice(b"hunter2"), "{}");
        assert!(!format!("{:?}", secret).contains("hunter2"));
    }
}
