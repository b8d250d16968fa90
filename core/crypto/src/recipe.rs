//! Recipes: JSON documents describing how a key is derived from a seed.
//!
//! A [`Recipe`] is parsed once, validated, and then frozen together with
//! its canonical JSON. The canonical JSON is mixed into every derivation
//! and bound into every seal, so its byte layout is a compatibility
//! contract:
//!
//! - compact JSON, object keys in lexicographic byte order at every level
//! - the resolved `type`, every unknown field, and every recognized field
//!   whose value differs from its default
//! - `hashFunction` as an object holding `algorithm`, any non-default
//!   tunables and any unknown fields, omitted entirely for a plain BLAKE2b
//! - `algorithm` never appears, since the type implies it
//! - Secret lengths as `lengthInBytes`, Password lengths as
//!   `lengthInWords`, fixed-size key lengths omitted

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};

use crate::hash::{HashAlgorithm, HashFunction, MAX_OUTPUT_LEN};
use crate::word_list::WordListName;
use seeded_common::{Error, Result};

/// Recipe field names.
pub mod field {
    pub const TYPE: &str = "type";
    pub const ALGORITHM: &str = "algorithm";
    pub const HASH_FUNCTION: &str = "hashFunction";
    pub const MEMORY_LIMIT_IN_BYTES: &str = "memoryLimitInBytes";
    pub const PASSES: &str = "passes";
    pub const ITERATIONS: &str = "iterations";
    pub const LEGACY_MEMORY_LIMIT_IN_BYTES: &str = "hashFunctionMemoryLimitInBytes";
    pub const LEGACY_MEMORY_PASSES: &str = "hashFunctionMemoryPasses";
    pub const LENGTH_IN_BYTES: &str = "lengthInBytes";
    pub const LENGTH_IN_BITS: &str = "lengthInBits";
    pub const LENGTH_IN_WORDS: &str = "lengthInWords";
    pub const WORD_LIST: &str = "wordList";
    pub const EXCLUDE_ORIENTATION_OF_FACES: &str = "excludeOrientationOfFaces";
    pub const REQUIRE_AUTHENTICATION_HANDSHAKE: &str = "requireAuthenticationHandshake";
    pub const CLIENT_MAY_RETRIEVE_KEY: &str = "clientMayRetrieveKey";
    pub const ANDROID_PACKAGE_PREFIXES_ALLOWED: &str = "androidPackagePrefixesAllowed";
    pub const ALLOW: &str = "allow";
    pub const RESTRICTIONS: &str = "restrictions";
}

/// Length of every fixed-size key and the default Secret length.
pub const KEY_LENGTH_IN_BYTES: usize = 32;

/// Entropy of a Password when the recipe names no length.
pub const DEFAULT_PASSWORD_LENGTH_IN_BITS: usize = 128;

/// Which key constructor a recipe is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecipeType {
    Password,
    Secret,
    SymmetricKey,
    UnsealingKey,
    SigningKey,
}

impl RecipeType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Password => "Password",
            Self::Secret => "Secret",
            Self::SymmetricKey => "SymmetricKey",
            Self::UnsealingKey => "UnsealingKey",
            Self::SigningKey => "SigningKey",
        }
    }

    /// # Errors
    /// - `InvalidRecipeValue` for an unrecognized name
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "Password" => Ok(Self::Password),
            "Secret" => Ok(Self::Secret),
            "SymmetricKey" => Ok(Self::SymmetricKey),
            "UnsealingKey" => Ok(Self::UnsealingKey),
            "SigningKey" => Ok(Self::SigningKey),
            other => Err(Error::InvalidRecipeValue(format!("Unknown recipe type: {}", other))),
        }
    }

    /// The only algorithm this type supports, if it has one.
    pub fn algorithm(self) -> Option<Algorithm> {
        match self {
            Self::SymmetricKey => Some(Algorithm::XChaCha20Poly1305),
            Self::UnsealingKey => Some(Algorithm::X25519),
            Self::SigningKey => Some(Algorithm::Ed25519),
            Self::Password | Self::Secret => None,
        }
    }

    /// Whether keys of this type always have [`KEY_LENGTH_IN_BYTES`] bytes.
    pub fn is_fixed_size(self) -> bool {
        self.algorithm().is_some()
    }
}

impl fmt::Display for RecipeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Key algorithm named by a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    XChaCha20Poly1305,
    X25519,
    Ed25519,
}

impl Algorithm {
    pub fn name(self) -> &'static str {
        match self {
            Self::XChaCha20Poly1305 => "XChaCha20Poly1305",
            Self::X25519 => "X25519",
            Self::Ed25519 => "Ed25519",
        }
    }

    /// # Errors
    /// - `InvalidRecipeValue` for an unrecognized name, including
    ///   `XSalsa20Poly1305`, which symmetric keys do not implement
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "XChaCha20Poly1305" => Ok(Self::XChaCha20Poly1305),
            "XSalsa20Poly1305" => Err(Error::InvalidRecipeValue(format!(
                "{} is not supported; symmetric keys use {}",
                name,
                Self::XChaCha20Poly1305.name()
            ))),
            "X25519" => Ok(Self::X25519),
            "Ed25519" => Ok(Self::Ed25519),
            other => Err(Error::InvalidRecipeValue(format!("Unknown algorithm: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestedLength {
    Bytes(usize),
    Bits(usize),
    Words(usize),
}

/// A parsed, validated and canonicalized recipe.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    recipe_type: Option<RecipeType>,
    hash_function: HashFunction,
    hash_function_unknown: BTreeMap<String, Value>,
    length: Option<RequestedLength>,
    word_list: Option<WordListName>,
    exclude_orientation_of_faces: Option<bool>,
    require_authentication_handshake: Option<bool>,
    client_may_retrieve_key: Option<bool>,
    android_package_prefixes_allowed: Option<Vec<Value>>,
    allow: Option<Vec<Value>>,
    restrictions: Option<Map<String, Value>>,
    unknown: BTreeMap<String, Value>,
    original_json: String,
    canonical_json: String,
    expanded_json: String,
}

impl Recipe {
    /// Parse recipe text. Empty text is the empty recipe `{}`.
    ///
    /// # Errors
    /// - `JsonParsing` if the text is not JSON
    /// - `InvalidRecipeJson` if the document is not an object, a field has
    ///   the wrong JSON type, or mutually exclusive fields are combined
    /// - `InvalidRecipeValue` if a field value is illegal in context
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_with(text, None)
    }

    /// Parse recipe text for a specific key type. An absent `type` resolves
    /// to `required`.
    ///
    /// # Errors
    /// As [`Recipe::parse`], plus `InvalidRecipeValue` if the recipe names a
    /// different type.
    pub fn parse_for(text: &str, required: RecipeType) -> Result<Self> {
        Self::parse_with(text, Some(required))
    }

    fn parse_with(text: &str, required: Option<RecipeType>) -> Result<Self> {
        let document = if text.trim().is_empty() {
            Value::Object(Map::new())
        } else {
            serde_json::from_str::<Value>(text)
                .map_err(|e| Error::JsonParsing(format!("Recipe is not valid JSON: {}", e)))?
        };
        let Value::Object(mut fields) = document else {
            return Err(Error::InvalidRecipeJson("Recipe must be a JSON object".to_string()));
        };

        let recipe_type = parse_type(take(&mut fields, field::TYPE), required)?;
        if let Some(value) = take(&mut fields, field::ALGORITHM) {
            check_algorithm(&value, recipe_type)?;
        }
        let length = parse_length(&mut fields, recipe_type)?;
        let word_list = parse_word_list(take(&mut fields, field::WORD_LIST), recipe_type)?;
        let (hash_function, hash_function_unknown) = parse_hash_function(&mut fields)?;

        let mut recipe = Self {
            recipe_type,
            hash_function,
            hash_function_unknown,
            length,
            word_list,
            exclude_orientation_of_faces: take_bool(
                &mut fields,
                field::EXCLUDE_ORIENTATION_OF_FACES,
            )?,
            require_authentication_handshake: take_bool(
                &mut fields,
                field::REQUIRE_AUTHENTICATION_HANDSHAKE,
            )?,
            client_may_retrieve_key: take_bool(&mut fields, field::CLIENT_MAY_RETRIEVE_KEY)?,
            android_package_prefixes_allowed: take_array(
                &mut fields,
                field::ANDROID_PACKAGE_PREFIXES_ALLOWED,
            )?,
            allow: take_array(&mut fields, field::ALLOW)?,
            restrictions: take_object(&mut fields, field::RESTRICTIONS)?,
            unknown: fields.into_iter().collect(),
            original_json: text.to_string(),
            canonical_json: String::new(),
            expanded_json: String::new(),
        };
        recipe.canonical_json = to_canonical_string(recipe.fields(false))?;
        recipe.expanded_json = to_canonical_string(recipe.fields(true))?;
        Ok(recipe)
    }

    /// The deterministic serialization bound into derivation and sealing.
    pub fn canonical_json(&self) -> &str {
        &self.canonical_json
    }

    /// Canonical form with every default written out. Parsing it yields a
    /// recipe with the same [`Recipe::canonical_json`].
    pub fn with_all_optional_parameters_specified(&self) -> &str {
        &self.expanded_json
    }

    /// The text this recipe was parsed from.
    pub fn original_json(&self) -> &str {
        &self.original_json
    }

    pub fn recipe_type(&self) -> Option<RecipeType> {
        self.recipe_type
    }

    pub fn algorithm(&self) -> Option<Algorithm> {
        self.recipe_type.and_then(RecipeType::algorithm)
    }

    pub fn hash_function(&self) -> HashFunction {
        self.hash_function
    }

    pub fn word_list(&self) -> WordListName {
        self.word_list.unwrap_or_default()
    }

    /// Number of words for a Password recipe, `None` for any other type.
    pub fn length_in_words(&self) -> Option<usize> {
        if self.recipe_type != Some(RecipeType::Password) {
            return None;
        }
        let word_list = self.word_list();
        Some(match self.length {
            Some(RequestedLength::Words(words)) => words,
            Some(RequestedLength::Bits(bits)) => word_list.words_for_bits(bits),
            _ => word_list.words_for_bits(DEFAULT_PASSWORD_LENGTH_IN_BITS),
        })
    }

    /// Number of bytes the derivation must produce.
    pub fn length_in_bytes(&self) -> usize {
        if let Some(words) = self.length_in_words() {
            return self.word_list().bytes_for_words(words);
        }
        match (self.recipe_type, self.length) {
            (Some(recipe_type), _) if recipe_type.is_fixed_size() => KEY_LENGTH_IN_BYTES,
            (_, Some(RequestedLength::Bytes(bytes))) => bytes,
            (_, Some(RequestedLength::Bits(bits))) => bits.div_ceil(8),
            _ => KEY_LENGTH_IN_BYTES,
        }
    }

    /// Bits of entropy requested. Falls back to the byte or word length.
    pub fn length_in_bits(&self) -> usize {
        match (self.length, self.length_in_words()) {
            (Some(RequestedLength::Bits(bits)), _) => bits,
            (_, Some(words)) => words * self.word_list().bits_per_word(),
            _ => self.length_in_bytes() * 8,
        }
    }

    pub fn exclude_orientation_of_faces(&self) -> bool {
        self.exclude_orientation_of_faces.unwrap_or(false)
    }

    pub fn require_authentication_handshake(&self) -> bool {
        self.require_authentication_handshake.unwrap_or(false)
    }

    pub fn client_may_retrieve_key(&self) -> bool {
        self.client_may_retrieve_key.unwrap_or(false)
    }

    pub fn android_package_prefixes_allowed(&self) -> Option<&[Value]> {
        self.android_package_prefixes_allowed.as_deref()
    }

    pub fn allow(&self) -> Option<&[Value]> {
        self.allow.as_deref()
    }

    pub fn restrictions(&self) -> Option<&Map<String, Value>> {
        self.restrictions.as_ref()
    }

    /// Fields not recognized by this version, preserved verbatim.
    pub fn unknown_fields(&self) -> &BTreeMap<String, Value> {
        &self.unknown
    }

    /// Unrecognized fields of the `hashFunction` object, preserved verbatim.
    pub fn unknown_hash_function_fields(&self) -> &BTreeMap<String, Value> {
        &self.hash_function_unknown
    }

    fn fields(&self, expanded: bool) -> BTreeMap<String, Value> {
        let mut out = self.unknown.clone();

        if let Some(recipe_type) = self.recipe_type {
            out.insert(field::TYPE.into(), recipe_type.name().into());
        }
        if let (true, Some(algorithm)) = (expanded, self.algorithm()) {
            out.insert(field::ALGORITHM.into(), algorithm.name().into());
        }
        if expanded
            || self.hash_function != HashFunction::Blake2b
            || !self.hash_function_unknown.is_empty()
        {
            out.insert(
                field::HASH_FUNCTION.into(),
                hash_function_json(&self.hash_function, &self.hash_function_unknown, expanded),
            );
        }

        match self.recipe_type {
            Some(RecipeType::Password) => {
                let words = self.length_in_words().unwrap_or_default();
                let default_words =
                    self.word_list().words_for_bits(DEFAULT_PASSWORD_LENGTH_IN_BITS);
                if expanded || words != default_words {
                    out.insert(field::LENGTH_IN_WORDS.into(), words.into());
                }
                if expanded {
                    out.insert(field::WORD_LIST.into(), self.word_list().name().into());
                }
            }
            Some(recipe_type) if recipe_type.is_fixed_size() => {
                if expanded {
                    out.insert(field::LENGTH_IN_BYTES.into(), KEY_LENGTH_IN_BYTES.into());
                }
            }
            _ => {
                let bytes = self.length_in_bytes();
                if expanded || bytes != KEY_LENGTH_IN_BYTES {
                    out.insert(field::LENGTH_IN_BYTES.into(), bytes.into());
                }
            }
        }

        for (name, value) in [
            (field::EXCLUDE_ORIENTATION_OF_FACES, self.exclude_orientation_of_faces),
            (field::REQUIRE_AUTHENTICATION_HANDSHAKE, self.require_authentication_handshake),
            (field::CLIENT_MAY_RETRIEVE_KEY, self.client_may_retrieve_key),
        ] {
            let value = value.unwrap_or(false);
            if expanded || value {
                out.insert(name.into(), value.into());
            }
        }
        if let Some(prefixes) = &self.android_package_prefixes_allowed {
            out.insert(
                field::ANDROID_PACKAGE_PREFIXES_ALLOWED.into(),
                Value::Array(prefixes.clone()),
            );
        }
        if let Some(allow) = &self.allow {
            out.insert(field::ALLOW.into(), Value::Array(allow.clone()));
        }
        if let Some(restrictions) = &self.restrictions {
            out.insert(field::RESTRICTIONS.into(), Value::Object(restrictions.clone()));
        }
        out
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_json)
    }
}

/// Remove a field, treating JSON `null` as absent.
fn take(fields: &mut Map<String, Value>, name: &str) -> Option<Value> {
    fields.remove(name).filter(|value| !value.is_null())
}

fn take_bool(fields: &mut Map<String, Value>, name: &str) -> Result<Option<bool>> {
    match take(fields, name) {
        None => Ok(None),
        Some(Value::Bool(value)) => Ok(Some(value)),
        Some(_) => Err(Error::InvalidRecipeJson(format!("{} must be a boolean", name))),
    }
}

fn take_array(fields: &mut Map<String, Value>, name: &str) -> Result<Option<Vec<Value>>> {
    match take(fields, name) {
        None => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items)),
        Some(_) => Err(Error::InvalidRecipeJson(format!("{} must be an array", name))),
    }
}

fn take_object(fields: &mut Map<String, Value>, name: &str) -> Result<Option<Map<String, Value>>> {
    match take(fields, name) {
        None => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(Error::InvalidRecipeJson(format!("{} must be an object", name))),
    }
}

fn take_string(fields: &mut Map<String, Value>, name: &str) -> Result<Option<String>> {
    match take(fields, name) {
        None => Ok(None),
        Some(Value::String(value)) => Ok(Some(value)),
        Some(_) => Err(Error::InvalidRecipeJson(format!("{} must be a string", name))),
    }
}

/// A JSON number that is an integer in `1..=max`.
fn positive_integer(name: &str, value: &Value, max: u64) -> Result<u64> {
    if !value.is_number() {
        return Err(Error::InvalidRecipeJson(format!("{} must be a number", name)));
    }
    match value.as_u64() {
        Some(n) if n > 0 && n <= max => Ok(n),
        _ => Err(Error::InvalidRecipeValue(format!(
            "{} must be an integer between 1 and {}, got {}",
            name, max, value
        ))),
    }
}

fn parse_type(value: Option<Value>, required: Option<RecipeType>) -> Result<Option<RecipeType>> {
    let named = match value {
        None => None,
        Some(Value::String(name)) => Some(RecipeType::from_name(&name)?),
        Some(_) => {
            return Err(Error::InvalidRecipeJson(format!("{} must be a string", field::TYPE)))
        }
    };
    match (named, required) {
        (Some(named), Some(required)) if named != required => Err(Error::InvalidRecipeValue(format!(
            "Recipe is for {} but a {} was requested",
            named, required
        ))),
        (named, required) => Ok(named.or(required)),
    }
}

fn check_algorithm(value: &Value, recipe_type: Option<RecipeType>) -> Result<()> {
    let Value::String(name) = value else {
        return Err(Error::InvalidRecipeJson(format!("{} must be a string", field::ALGORITHM)));
    };
    let Some(recipe_type) = recipe_type else {
        return Err(Error::InvalidRecipeJson(format!(
            "{} requires {}",
            field::ALGORITHM,
            field::TYPE
        )));
    };
    let algorithm = Algorithm::from_name(name)?;
    if recipe_type.algorithm() != Some(algorithm) {
        return Err(Error::InvalidRecipeValue(format!(
            "{} does not support algorithm {}",
            recipe_type, name
        )));
    }
    Ok(())
}

fn parse_length(
    fields: &mut Map<String, Value>,
    recipe_type: Option<RecipeType>,
) -> Result<Option<RequestedLength>> {
    let names = [field::LENGTH_IN_BYTES, field::LENGTH_IN_BITS, field::LENGTH_IN_WORDS];
    let present: Vec<(&str, Value)> = names
        .into_iter()
        .filter_map(|name| take(fields, name).map(|value| (name, value)))
        .collect();
    if present.len() > 1 {
        return Err(Error::InvalidRecipeJson(format!(
            "{}, {} and {} are mutually exclusive",
            field::LENGTH_IN_BYTES,
            field::LENGTH_IN_BITS,
            field::LENGTH_IN_WORDS
        )));
    }
    let Some((name, value)) = present.into_iter().next() else {
        return Ok(None);
    };

    let max_output = MAX_OUTPUT_LEN as u64;
    let length = match name {
        field::LENGTH_IN_BYTES => {
            RequestedLength::Bytes(positive_integer(name, &value, max_output)? as usize)
        }
        field::LENGTH_IN_BITS => {
            RequestedLength::Bits(positive_integer(name, &value, max_output)? as usize)
        }
        _ => RequestedLength::Words(positive_integer(name, &value, max_output / 11)? as usize),
    };

    match (length, recipe_type) {
        (RequestedLength::Words(_), None) => Err(Error::InvalidRecipeJson(format!(
            "{} requires {} Password",
            name,
            field::TYPE
        ))),
        (RequestedLength::Words(_), Some(recipe_type)) if recipe_type != RecipeType::Password => {
            Err(Error::InvalidRecipeValue(format!("{} does not accept {}", recipe_type, name)))
        }
        (RequestedLength::Bytes(_), Some(RecipeType::Password)) => {
            Err(Error::InvalidRecipeValue(format!("Password does not accept {}", name)))
        }
        (RequestedLength::Bytes(bytes), Some(recipe_type))
            if recipe_type.is_fixed_size() && bytes != KEY_LENGTH_IN_BYTES =>
        {
            Err(Error::InvalidRecipeValue(format!(
                "{} keys are {} bytes long, not {}",
                recipe_type, KEY_LENGTH_IN_BYTES, bytes
            )))
        }
        (RequestedLength::Bits(bits), Some(recipe_type))
            if recipe_type.is_fixed_size() && bits != KEY_LENGTH_IN_BYTES * 8 =>
        {
            Err(Error::InvalidRecipeValue(format!(
                "{} keys are {} bits long, not {}",
                recipe_type,
                KEY_LENGTH_IN_BYTES * 8,
                bits
            )))
        }
        (length, _) => Ok(Some(length)),
    }
}

fn parse_word_list(
    value: Option<Value>,
    recipe_type: Option<RecipeType>,
) -> Result<Option<WordListName>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let Value::String(name) = value else {
        return Err(Error::InvalidRecipeJson(format!("{} must be a string", field::WORD_LIST)));
    };
    match recipe_type {
        None => Err(Error::InvalidRecipeJson(format!(
            "{} requires {} Password",
            field::WORD_LIST,
            field::TYPE
        ))),
        Some(RecipeType::Password) => WordListName::from_name(&name).map(Some),
        Some(other) => Err(Error::InvalidRecipeValue(format!(
            "{} does not accept {}",
            other,
            field::WORD_LIST
        ))),
    }
}

fn parse_hash_function(
    fields: &mut Map<String, Value>,
) -> Result<(HashFunction, BTreeMap<String, Value>)> {
    let legacy_memory = take(fields, field::LEGACY_MEMORY_LIMIT_IN_BYTES);
    let legacy_passes = take(fields, field::LEGACY_MEMORY_PASSES);

    let mut unknown = BTreeMap::new();
    let (algorithm, memory, passes) = match take(fields, field::HASH_FUNCTION) {
        None => (HashAlgorithm::Blake2b, legacy_memory, legacy_passes),
        Some(Value::String(name)) => {
            (HashAlgorithm::from_name(&name)?, legacy_memory, legacy_passes)
        }
        Some(Value::Object(mut spec)) => {
            if legacy_memory.is_some() || legacy_passes.is_some() {
                return Err(Error::InvalidRecipeJson(format!(
                    "{} object cannot be combined with {} or {}",
                    field::HASH_FUNCTION,
                    field::LEGACY_MEMORY_LIMIT_IN_BYTES,
                    field::LEGACY_MEMORY_PASSES
                )));
            }
            let algorithm = match take_string(&mut spec, field::ALGORITHM)? {
                Some(name) => HashAlgorithm::from_name(&name)?,
                None => HashAlgorithm::Blake2b,
            };
            let memory = take(&mut spec, field::MEMORY_LIMIT_IN_BYTES);
            let passes = take(&mut spec, field::PASSES);
            let iterations = take(&mut spec, field::ITERATIONS);
            if passes.is_some() && iterations.is_some() {
                return Err(Error::InvalidRecipeJson(format!(
                    "{} and {} are mutually exclusive",
                    field::PASSES,
                    field::ITERATIONS
                )));
            }
            unknown.extend(spec);
            (algorithm, memory, passes.or(iterations))
        }
        Some(_) => {
            return Err(Error::InvalidRecipeJson(format!(
                "{} must be a string or an object",
                field::HASH_FUNCTION
            )))
        }
    };

    let Some(defaults) = algorithm.default_params() else {
        if memory.is_some() || passes.is_some() {
            return Err(Error::InvalidRecipeValue(format!(
                "{} does not accept a memory limit or passes",
                algorithm.name()
            )));
        }
        return Ok((HashFunction::with_defaults(algorithm), unknown));
    };

    let memory_limit_in_bytes = match memory {
        Some(value) => positive_integer(field::MEMORY_LIMIT_IN_BYTES, &value, u64::MAX)?,
        None => defaults.memory_limit_in_bytes,
    };
    let passes = match passes {
        Some(value) => positive_integer(field::PASSES, &value, u64::from(u32::MAX))? as u32,
        None => defaults.passes,
    };
    let function = HashFunction::memory_hard(algorithm, memory_limit_in_bytes, passes)?;
    Ok((function, unknown))
}

fn hash_function_json(
    function: &HashFunction,
    unknown: &BTreeMap<String, Value>,
    expanded: bool,
) -> Value {
    let mut out: Map<String, Value> = unknown.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    out.extend(function.to_recipe_object());
    if let (false, Some(params), Some(defaults)) =
        (expanded, function.params(), function.algorithm().default_params())
    {
        if params.memory_limit_in_bytes == defaults.memory_limit_in_bytes {
            out.remove(field::MEMORY_LIMIT_IN_BYTES);
        }
        if params.passes == defaults.passes {
            out.remove(field::PASSES);
        }
    }
    Value::Object(out)
}

/// Rebuild `value` with every object's keys inserted in sorted order, so
/// the output does not depend on how `serde_json::Map` is backed.
fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let entries: BTreeMap<&String, &Value> = map.iter().collect();
            Value::Object(entries.into_iter().map(|(k, v)| (k.clone(), sorted(v))).collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

fn to_canonical_string(fields: BTreeMap<String, Value>) -> Result<String> {
    let object: Map<String, Value> = fields.iter().map(|(k, v)| (k.clone(), sorted(v))).collect();
    serde_json::to_string(&Value::Object(object))
        .map_err(|e| Error::Serialization(format!("Failed to serialize recipe: {}", e)))
}
