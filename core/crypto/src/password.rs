//! Human-typable passwords drawn from a word list.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::derivation::derive_primary_secret_for;
use crate::format;
use crate::recipe::{Recipe, RecipeType};
use seeded_common::{Result, SecureBuffer};

/// A password derived from a seed and a Password recipe.
///
/// The secret bytes are mapped onto words from the recipe's word list,
/// eleven bits per word for BIP-39, most significant bit first.
#[derive(Clone, PartialEq, Eq)]
pub struct Password {
    secret_bytes: SecureBuffer,
    recipe_json: String,
}

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
struct PasswordJson {
    secret_bytes: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    recipe_json: String,
}

impl Password {
    pub fn new(secret_bytes: SecureBuffer, recipe_json: impl Into<String>) -> Self {
        Self {
            secret_bytes,
            recipe_json: recipe_json.into(),
        }
    }

    /// # Errors
    /// - Any recipe parsing error, including a recipe for another type
    pub fn derive_from_seed(seed: impl AsRef<[u8]>, recipe_json: &str) -> Result<Self> {
        let (recipe, secret_bytes) =
            derive_primary_secret_for(seed.as_ref(), recipe_json, RecipeType::Password, None)?;
        debug!(words = recipe.length_in_words().unwrap_or_default(), "derived password");
        Ok(Self::new(secret_bytes, recipe.canonical_json()))
    }

    pub fn secret_bytes(&self) -> &SecureBuffer {
        &self.secret_bytes
    }

    pub fn recipe_json(&self) -> &str {
        &self.recipe_json
    }

    /// The password's words, lowercase, in order.
    ///
    /// # Errors
    /// - Recipe errors if the stored recipe JSON is not a Password recipe
    /// - `KeyLength` if the secret is too short for the word count
    pub fn words(&self) -> Result<Vec<String>> {
        let recipe = Recipe::parse_for(&self.recipe_json, RecipeType::Password)?;
        let word_count = recipe.length_in_words().unwrap_or_default();
        let words = recipe
            .word_list()
            .words_from_bytes(self.secret_bytes.as_bytes(), word_count)?;
        Ok(words.into_iter().map(str::to_owned).collect())
    }

    /// `"<count>-Word-Word-..."` with each word capitalized.
    pub fn password(&self) -> Result<Zeroizing<String>> {
        let words = self.words()?;
        let mut password = Zeroizing::new(words.len().to_string());
        for word in &words {
            let mut chars = word.chars();
            password.push('-');
            if let Some(first) = chars.next() {
                password.extend(first.to_uppercase());
                password.push_str(chars.as_str());
            }
        }
        Ok(password)
    }

    pub fn to_json(&self) -> Result<String> {
        format::to_json(
            &PasswordJson {
                secret_bytes: self.secret_bytes.to_hex_string(),
                recipe_json: self.recipe_json.clone(),
            },
            "password",
        )
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let parsed: PasswordJson = format::from_json(json, "password")?;
        Ok(Self::new(
            SecureBuffer::from_hex_string(&parsed.secret_bytes)?,
            parsed.recipe_json.clone(),
        ))
    }

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

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Password([REDACTED], {})", self.recipe_json)
    }
}
