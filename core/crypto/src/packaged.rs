//! Sealed messages packaged with the context needed to unseal them.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::format;
use seeded_common::{Error, Result, SecureBuffer};

/// Ciphertext plus the recipe and instructions it was bound to.
///
/// JSON form: `{"ciphertext":"<base64>","recipeJson":"...","unsealingInstructions":"..."}`
/// with the two strings omitted when empty. Binary form: the three fields
/// in that order, each as `be32(len) || bytes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PackagedSealedMessageJson", into = "PackagedSealedMessageJson")]
pub struct PackagedSealedMessage {
    pub ciphertext: Vec<u8>,
    pub recipe_json: String,
    /// Empty when the message was sealed without instructions.
    pub unsealing_instructions: String,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum CiphertextField {
    Base64(String),
    Bytes(Vec<u8>),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackagedSealedMessageJson {
    ciphertext: CiphertextField,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    recipe_json: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    unsealing_instructions: String,
}

impl From<PackagedSealedMessage> for PackagedSealedMessageJson {
    fn from(message: PackagedSealedMessage) -> Self {
        Self {
            ciphertext: CiphertextField::Base64(STANDARD.encode(&message.ciphertext)),
            recipe_json: message.recipe_json,
            unsealing_instructions: message.unsealing_instructions,
        }
    }
}

impl TryFrom<PackagedSealedMessageJson> for PackagedSealedMessage {
    type Error = Error;

    fn try_from(json: PackagedSealedMessageJson) -> Result<Self> {
        let ciphertext = match json.ciphertext {
            CiphertextField::Base64(encoded) => STANDARD
                .decode(encoded.as_bytes())
                .map_err(|e| Error::Serialization(format!("Invalid base64 ciphertext: {}", e)))?,
            CiphertextField::Bytes(bytes) => bytes,
        };
        Ok(Self {
            ciphertext,
            recipe_json: json.recipe_json,
            unsealing_instructions: json.unsealing_instructions,
        })
    }
}

impl PackagedSealedMessage {
    pub fn new(
        ciphertext: Vec<u8>,
        recipe_json: impl Into<String>,
        unsealing_instructions: Option<&str>,
    ) -> Self {
        Self {
            ciphertext,
            recipe_json: recipe_json.into(),
            unsealing_instructions: unsealing_instructions.unwrap_or_default().to_string(),
        }
    }

    /// Instructions as an option, `None` when empty.
    pub fn unsealing_instructions(&self) -> Option<&str> {
        Some(self.unsealing_instructions.as_str()).filter(|s| !s.is_empty())
    }

    pub fn to_json(&self) -> Result<String> {
        format::to_json(self, "sealed message")
    }

    /// # Errors
    /// - `JsonParsing` if the text is not a sealed-message object or
    ///   `ciphertext` is missing or malformed
    pub fn from_json(json: &str) -> Result<Self> {
        format::from_json(json, "sealed message")
    }

    pub fn to_serialized_binary_form(&self) -> Result<SecureBuffer> {
        SecureBuffer::combine_length_prefixed_list(&[
            self.ciphertext.as_slice(),
            self.recipe_json.as_bytes(),
            self.unsealing_instructions.as_bytes(),
        ])
    }

    /// # Errors
    /// - `Serialization` on truncation, trailing bytes, or a string field
    ///   that is not UTF-8
    pub fn from_serialized_binary_form(serialized: &[u8]) -> Result<Self> {
        let fields = format::split_fields(serialized, 3)?;
        Ok(Self {
            ciphertext: fields[0].to_byte_vector(),
            recipe_json: fields[1].to_utf8_string()?,
            unsealing_instructions: fields[2].to_utf8_string()?,
        })
    }
}
