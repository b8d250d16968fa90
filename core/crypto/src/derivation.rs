//! Primary-secret derivation.
//!
//! The primary secret is `H(seed || canonical_json)` stretched to the
//! recipe's length, where `H` is the recipe's hash function. Mixing the
//! canonical JSON into the preimage means any change to the recipe yields
//! unrelated key material from the same seed.

use std::fmt;

use tracing::debug;

use crate::recipe::{Recipe, RecipeType};
use seeded_common::{Error, Result, SecureBuffer};

/// Caller-supplied seed material, wiped on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct Seed(SecureBuffer);

impl Seed {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(SecureBuffer::from_slice(bytes))
    }

    pub fn from_string(seed: &str) -> Self {
        Self(SecureBuffer::from_utf8_string(seed))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl AsRef<[u8]> for Seed {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl From<&str> for Seed {
    fn from(seed: &str) -> Self {
        Self::from_string(seed)
    }
}

impl From<&[u8]> for Seed {
    fn from(bytes: &[u8]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<SecureBuffer> for Seed {
    fn from(buffer: SecureBuffer) -> Self {
        Self(buffer)
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Seed([REDACTED])")
    }
}

/// Derive the primary secret for `recipe` from `seed`.
///
/// # Postconditions
/// - Output has exactly `recipe.length_in_bytes()` bytes
/// - Output is deterministic for identical seed and canonical recipe
///
/// # Errors
/// - `InvalidRecipeValue` if the hash function rejects the length
///
/// # Security
/// - The preimage lives in a `SecureBuffer` and is wiped on every path
pub fn derive_primary_secret(seed: &[u8], recipe: &Recipe) -> Result<SecureBuffer> {
    let canonical = recipe.canonical_json().as_bytes();
    let mut preimage = SecureBuffer::new(seed.len() + canonical.len());
    preimage.as_mut_bytes()[..seed.len()].copy_from_slice(seed);
    preimage.as_mut_bytes()[seed.len()..].copy_from_slice(canonical);

    let hash_function = recipe.hash_function();
    debug!(
        recipe_type = recipe.recipe_type().map_or("untyped", RecipeType::name),
        hash_function = hash_function.algorithm().name(),
        length_in_bytes = recipe.length_in_bytes(),
        "deriving primary secret"
    );
    hash_function.hash(preimage.as_bytes(), recipe.length_in_bytes())
}

/// Parse `recipe_json` for `required_type` and derive its primary secret.
///
/// # Errors
/// - Any recipe parsing error
/// - `InvalidRecipeValue` if `required_len` is given and the recipe
///   resolves to a different length
pub fn derive_primary_secret_for(
    seed: &[u8],
    recipe_json: &str,
    required_type: RecipeType,
    required_len: Option<usize>,
) -> Result<(Recipe, SecureBuffer)> {
    let recipe = Recipe::parse_for(recipe_json, required_type)?;
    if let Some(required_len) = required_len {
        if recipe.length_in_bytes() != required_len {
            return Err(Error::InvalidRecipeValue(format!(
                "{} requires {} bytes, recipe asks for {}",
                required_type,
                required_len,
                recipe.length_in_bytes()
            )));
        }
    }
    let secret = derive_primary_secret(seed, &recipe)?;
    Ok((recipe, secret))
}
