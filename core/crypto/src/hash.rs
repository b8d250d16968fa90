//! Hash functions used to stretch a seed into a primary secret.
//!
//! Two families are supported. Fixed-output functions (BLAKE2b, SHA-256)
//! are single-pass and have no cost parameters. Memory-hard functions
//! (Argon2id, Scrypt) take a memory limit and a pass count and exist to
//! slow brute-force search over low-entropy seeds.

use argon2::{Algorithm, Argon2, Params, Version};
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::Sha256;
use tracing::trace;
use zeroize::Zeroize;

use crate::recipe::field;
use seeded_common::{Error, Result, SecureBuffer};

/// Default tunables for the memory-hard functions.
pub mod defaults {
    /// Argon2id memory limit (64 MiB).
    pub const ARGON2ID_MEMORY_LIMIT_IN_BYTES: u64 = 67_108_864;
    pub const ARGON2ID_PASSES: u32 = 2;
    /// Argon2id salt length. The salt is all zeros; the recipe provides
    /// the domain separation.
    pub const ARGON2ID_SALT_LENGTH: usize = 16;

    /// Scrypt memory limit (16 MiB).
    pub const SCRYPT_MEMORY_LIMIT_IN_BYTES: u64 = 16_777_216;
    pub const SCRYPT_PASSES: u32 = 1;
    pub const SCRYPT_SALT_LENGTH: usize = 32;
    /// Scrypt block size `r`.
    pub const SCRYPT_BLOCK_SIZE: u32 = 8;

    /// Largest memory limit either memory-hard function accepts (4 GiB).
    /// The whole limit is allocated at once, so recipes asking for more
    /// are rejected rather than left to fail inside the allocator.
    pub const MAX_MEMORY_LIMIT_IN_BYTES: u64 = 4_294_967_296;
    /// Largest Scrypt `p`. Scrypt allocates `p * 128 * r` bytes up front.
    pub const SCRYPT_MAX_PASSES: u32 = 64;
}

/// Largest output any hash function will produce.
pub const MAX_OUTPUT_LEN: usize = u32::MAX as usize;

/// Digest size of the fixed-output functions.
pub const BLOCK_SIZE: usize = 32;

/// Argon2 refuses outputs shorter than this.
const ARGON2_MIN_OUTPUT_LEN: usize = 4;

/// Name of a supported hash algorithm, as it appears in recipes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Blake2b,
    Sha256,
    Argon2id,
    Scrypt,
}

impl HashAlgorithm {
    /// Recipe wire name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Blake2b => "BLAKE2b",
            Self::Sha256 => "SHA256",
            Self::Argon2id => "Argon2id",
            Self::Scrypt => "Scrypt",
        }
    }

    /// Parse a recipe wire name.
    ///
    /// # Errors
    /// - `InvalidRecipeValue` for an unrecognized name
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "BLAKE2b" => Ok(Self::Blake2b),
            "SHA256" => Ok(Self::Sha256),
            "Argon2id" => Ok(Self::Argon2id),
            "Scrypt" => Ok(Self::Scrypt),
            other => Err(Error::InvalidRecipeValue(format!(
                "Unsupported hash function: {}",
                other
            ))),
        }
    }

    pub fn is_memory_hard(self) -> bool {
        matches!(self, Self::Argon2id | Self::Scrypt)
    }

    /// Default tunables, or `None` for fixed-output algorithms.
    pub fn default_params(self) -> Option<MemoryHardParams> {
        match self {
            Self::Argon2id => Some(MemoryHardParams {
                memory_limit_in_bytes: defaults::ARGON2ID_MEMORY_LIMIT_IN_BYTES,
                passes: defaults::ARGON2ID_PASSES,
            }),
            Self::Scrypt => Some(MemoryHardParams {
                memory_limit_in_bytes: defaults::SCRYPT_MEMORY_LIMIT_IN_BYTES,
                passes: defaults::SCRYPT_PASSES,
            }),
            Self::Blake2b | Self::Sha256 => None,
        }
    }
}

/// Capability class of a hash function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashFunctionKind {
    FixedOutputLength { block_size: usize },
    MemoryHard,
}

/// Tunables for a memory-hard hash function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryHardParams {
    /// Memory cost in bytes (e.g., 67108864 = 64 MiB).
    pub memory_limit_in_bytes: u64,
    /// Number of passes (Argon2id `t`, Scrypt `p`).
    pub passes: u32,
}

impl MemoryHardParams {
    /// Parameters suitable for interactive use.
    pub fn interactive() -> Self {
        Self {
            memory_limit_in_bytes: 67_108_864, // 64 MiB
            passes: 2,
        }
    }

    /// Parameters for seeds worth several seconds of stretching.
    pub fn moderate() -> Self {
        Self {
            memory_limit_in_bytes: 268_435_456, // 256 MiB
            passes: 3,
        }
    }

    /// Parameters for sensitive data on machines with memory to spare.
    pub fn sensitive() -> Self {
        Self {
            memory_limit_in_bytes: 1_073_741_824, // 1 GiB
            passes: 4,
        }
    }
}

impl MemoryHardParams {
    /// Pair these tunables with a memory-hard algorithm.
    ///
    /// # Errors
    /// - `InvalidRecipeValue` as for [`HashFunction::memory_hard`]
    pub fn with_algorithm(self, algorithm: HashAlgorithm) -> Result<HashFunction> {
        HashFunction::memory_hard(algorithm, self.memory_limit_in_bytes, self.passes)
    }
}

impl Default for MemoryHardParams {
    fn default() -> Self {
        Self::interactive()
    }
}

/// A hash function together with its tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashFunction {
    Blake2b,
    Sha256,
    Argon2id(MemoryHardParams),
    Scrypt(MemoryHardParams),
}

impl Default for HashFunction {
    fn default() -> Self {
        Self::Blake2b
    }
}

impl HashFunction {
    /// The algorithm with its default tunables.
    pub fn with_defaults(algorithm: HashAlgorithm) -> Self {
        match (algorithm, algorithm.default_params()) {
            (HashAlgorithm::Argon2id, Some(params)) => Self::Argon2id(params),
            (HashAlgorithm::Scrypt, Some(params)) => Self::Scrypt(params),
            (HashAlgorithm::Sha256, _) => Self::Sha256,
            _ => Self::Blake2b,
        }
    }

    /// Build a memory-hard function, validating the tunables against the
    /// underlying primitive.
    ///
    /// # Errors
    /// - `InvalidRecipeValue` if `algorithm` is fixed-output or a tunable
    ///   is outside the primitive's supported range
    pub fn memory_hard(
        algorithm: HashAlgorithm,
        memory_limit_in_bytes: u64,
        passes: u32,
    ) -> Result<Self> {
        let params = MemoryHardParams {
            memory_limit_in_bytes,
            passes,
        };
        let function = match algorithm {
            HashAlgorithm::Argon2id => Self::Argon2id(params),
            HashAlgorithm::Scrypt => Self::Scrypt(params),
            HashAlgorithm::Blake2b | HashAlgorithm::Sha256 => {
                return Err(Error::InvalidRecipeValue(format!(
                    "{} does not accept a memory limit or passes",
                    algorithm.name()
                )))
            }
        };
        function.validate()?;
        Ok(function)
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        match self {
            Self::Blake2b => HashAlgorithm::Blake2b,
            Self::Sha256 => HashAlgorithm::Sha256,
            Self::Argon2id(_) => HashAlgorithm::Argon2id,
            Self::Scrypt(_) => HashAlgorithm::Scrypt,
        }
    }

    pub fn kind(&self) -> HashFunctionKind {
        match self {
            Self::Blake2b | Self::Sha256 => HashFunctionKind::FixedOutputLength {
                block_size: BLOCK_SIZE,
            },
            Self::Argon2id(_) | Self::Scrypt(_) => HashFunctionKind::MemoryHard,
        }
    }

    /// Tunables, or `None` for fixed-output functions.
    pub fn params(&self) -> Option<MemoryHardParams> {
        match self {
            Self::Argon2id(params) | Self::Scrypt(params) => Some(*params),
            Self::Blake2b | Self::Sha256 => None,
        }
    }

    /// The `hashFunction` recipe object for this function, with every
    /// tunable written out.
    pub fn to_recipe_object(&self) -> Map<String, Value> {
        let mut out = Map::new();
        out.insert(field::ALGORITHM.into(), self.algorithm().name().into());
        if let Some(params) = self.params() {
            out.insert(field::MEMORY_LIMIT_IN_BYTES.into(), params.memory_limit_in_bytes.into());
            out.insert(field::PASSES.into(), params.passes.into());
        }
        out
    }

    /// Hash `input` to exactly `output_len` bytes.
    ///
    /// # Preconditions
    /// - `output_len` is in `1..=MAX_OUTPUT_LEN`
    ///
    /// # Postconditions
    /// - Output is deterministic for identical input and tunables
    ///
    /// # Errors
    /// - `InvalidRecipeValue` if `output_len` is out of range or a tunable
    ///   is rejected by the primitive
    ///
    /// # Security
    /// - Input and output are never logged
    pub fn hash(&self, input: &[u8], output_len: usize) -> Result<SecureBuffer> {
        if output_len == 0 || output_len > MAX_OUTPUT_LEN {
            return Err(Error::InvalidRecipeValue(format!(
                "Hash output length must be between 1 and {}, got {}",
                MAX_OUTPUT_LEN, output_len
            )));
        }
        self.validate()?;
        trace!(algorithm = self.algorithm().name(), output_len, "hashing");

        match self {
            Self::Blake2b => Ok(expand_fixed(input, output_len, blake2b_256)),
            Self::Sha256 => Ok(expand_fixed(input, output_len, sha256)),
            Self::Argon2id(params) => argon2id(input, output_len, params),
            Self::Scrypt(params) => scrypt(input, output_len, params),
        }
    }

    fn validate(&self) -> Result<()> {
        let Some(params) = self.params() else {
            return Ok(());
        };
        let name = self.algorithm().name();
        if params.passes == 0 {
            return Err(Error::InvalidRecipeValue(format!("{} needs at least one pass", name)));
        }
        if params.memory_limit_in_bytes > defaults::MAX_MEMORY_LIMIT_IN_BYTES {
            return Err(Error::InvalidRecipeValue(format!(
                "{} memory limit {} exceeds the maximum of {} bytes",
                name,
                params.memory_limit_in_bytes,
                defaults::MAX_MEMORY_LIMIT_IN_BYTES
            )));
        }
        match self {
            Self::Argon2id(params) => argon2_params(params).map(|_| ()),
            Self::Scrypt(params) if params.passes > defaults::SCRYPT_MAX_PASSES => {
                Err(Error::InvalidRecipeValue(format!(
                    "Scrypt accepts at most {} passes, got {}",
                    defaults::SCRYPT_MAX_PASSES,
                    params.passes
                )))
            }
            Self::Scrypt(params) => scrypt_params(params).map(|_| ()),
            Self::Blake2b | Self::Sha256 => Ok(()),
        }
    }
}

fn blake2b_256(parts: &[&[u8]]) -> [u8; BLOCK_SIZE] {
    let mut hasher = Blake2b::<U32>::new();
    for part in parts {
        hasher.update(part);
    }
    let mut digest = [0u8; BLOCK_SIZE];
    digest.copy_from_slice(&hasher.finalize());
    digest
}

fn sha256(parts: &[&[u8]]) -> [u8; BLOCK_SIZE] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut digest = [0u8; BLOCK_SIZE];
    digest.copy_from_slice(&hasher.finalize());
    digest
}

/// Stretch a fixed-size digest to `output_len` bytes.
///
/// Short outputs are a prefix of `H(input)`. Longer ones are
/// `H(h1 || be32(0)) || H(h1 || be32(1)) || ...` with `h1 = H(input)`.
fn expand_fixed(
    input: &[u8],
    output_len: usize,
    digest: fn(&[&[u8]]) -> [u8; BLOCK_SIZE],
) -> SecureBuffer {
    let mut output = SecureBuffer::new(output_len);
    let mut first = digest(&[input]);

    if output_len <= BLOCK_SIZE {
        output.as_mut_bytes().copy_from_slice(&first[..output_len]);
    } else {
        for (counter, chunk) in output.as_mut_bytes().chunks_mut(BLOCK_SIZE).enumerate() {
            // output_len <= u32::MAX, so the counter always fits
            let counter = (counter as u32).to_be_bytes();
            let mut block = digest(&[first.as_slice(), counter.as_slice()]);
            chunk.copy_from_slice(&block[..chunk.len()]);
            block.zeroize();
        }
    }

    first.zeroize();
    output
}

fn argon2_params(params: &MemoryHardParams) -> Result<Params> {
    let memory_kib = u32::try_from(params.memory_limit_in_bytes / 1024).map_err(|_| {
        Error::InvalidRecipeValue(format!(
            "Argon2id memory limit too large: {} bytes",
            params.memory_limit_in_bytes
        ))
    })?;
    Params::new(memory_kib, params.passes, 1, None)
        .map_err(|e| Error::InvalidRecipeValue(format!("Invalid Argon2id parameters: {}", e)))
}

fn argon2id(input: &[u8], output_len: usize, params: &MemoryHardParams) -> Result<SecureBuffer> {
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params(params)?);
    let salt = [0u8; defaults::ARGON2ID_SALT_LENGTH];

    let mut output = SecureBuffer::new(output_len.max(ARGON2_MIN_OUTPUT_LEN));
    argon2
        .hash_password_into(input, &salt, output.as_mut_bytes())
        .map_err(|e| Error::InvalidRecipeValue(format!("Argon2id hashing failed: {}", e)))?;

    if output.len() == output_len {
        Ok(output)
    } else {
        Ok(SecureBuffer::from_slice(&output.as_bytes()[..output_len]))
    }
}

fn scrypt_params(params: &MemoryHardParams) -> Result<scrypt::Params> {
    let block_bytes = 128 * u64::from(defaults::SCRYPT_BLOCK_SIZE);
    let blocks = params.memory_limit_in_bytes / block_bytes;
    if blocks < 2 {
        return Err(Error::InvalidRecipeValue(format!(
            "Scrypt memory limit too small: {} bytes",
            params.memory_limit_in_bytes
        )));
    }
    // floor(log2(blocks)), at least 1 here
    let log_n = (63 - blocks.leading_zeros()) as u8;
    scrypt::Params::new(log_n, defaults::SCRYPT_BLOCK_SIZE, params.passes, BLOCK_SIZE)
        .map_err(|e| Error::InvalidRecipeValue(format!("Invalid Scrypt parameters: {}", e)))
}

fn scrypt(input: &[u8], output_len: usize, params: &MemoryHardParams) -> Result<SecureBuffer> {
    let scrypt_params = scrypt_params(params)?;
    let salt = [0u8; defaults::SCRYPT_SALT_LENGTH];

    let mut output = SecureBuffer::new(output_len);
    scrypt::scrypt(input, &salt, &scrypt_params, output.as_mut_bytes())
        .map_err(|e| Error::InvalidRecipeValue(format!("Scrypt hashing failed: {}", e)))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_argon2id() -> HashFunction {
        HashFunction::memory_hard(HashAlgorithm::Argon2id, 64 * 1024, 1).unwrap()
    }

    fn small_scrypt() -> HashFunction {
        HashFunction::memory_hard(HashAlgorithm::Scrypt, 16 * 1024, 1).unwrap()
    }

    #[test]
    fn test_algorithm_names_round_trip() {
        for alg in [
            HashAlgorithm::Blake2b,
            HashAlgorithm::Sha256,
            HashAlgorithm::Argon2id,
            HashAlgorithm::Scrypt,
        ] {
            assert_eq!(HashAlgorithm::from_name(alg.name()).unwrap(), alg);
        }
    }

    #[test]
    fn test_unknown_algorithm_rejected() {
        assert!(matches!(
            HashAlgorithm::from_name("MD5"),
            Err(Error::InvalidRecipeValue(_))
        ));
    }

    #[test]
    fn test_blake2b_short_output_is_prefix() {
        let short = HashFunction::Blake2b.hash(b"seed", 16).unwrap();
        let full = HashFunction::Blake2b.hash(b"seed", 32).unwrap();
        assert_eq!(short.as_bytes(), &full.as_bytes()[..16]);
    }

    #[test]
    fn test_long_output_is_expanded() {
        for function in [HashFunction::Blake2b, HashFunction::Sha256] {
            let out = function.hash(b"seed", 100).unwrap();
            assert_eq!(out.len(), 100);
            // Expansion blocks are keyed by counter, so they differ from H(input)
            let first = function.hash(b"seed", 32).unwrap();
            assert_ne!(&out.as_bytes()[..32], first.as_bytes());
            assert_ne!(&out.as_bytes()[..32], &out.as_bytes()[32..64]);
        }
    }

    #[test]
    fn test_sha256_known_answer() {
        let out = HashFunction::Sha256.hash(b"abc", 32).unwrap();
        assert_eq!(
            out.to_hex_string(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_hash_deterministic() {
        for function in [
            HashFunction::Blake2b,
            HashFunction::Sha256,
            small_argon2id(),
            small_scrypt(),
        ] {
            let a = function.hash(b"correct horse battery staple", 32).unwrap();
            let b = function.hash(b"correct horse battery staple", 32).unwrap();
            assert_eq!(a, b);
            let c = function.hash(b"correct horse battery stapler", 32).unwrap();
            assert_ne!(a, c);
        }
    }

    #[test]
    fn test_zero_length_rejected() {
        assert!(matches!(
            HashFunction::Blake2b.hash(b"x", 0),
            Err(Error::InvalidRecipeValue(_))
        ));
    }

    #[test]
    fn test_argon2id_short_output_is_prefix() {
        let function = small_argon2id();
        let short = function.hash(b"seed", 2).unwrap();
        let four = function.hash(b"seed", 4).unwrap();
        assert_eq!(short.len(), 2);
        assert_eq!(short.as_bytes(), &four.as_bytes()[..2]);
    }

    #[test]
    fn test_tunables_change_output() {
        let a = HashFunction::memory_hard(HashAlgorithm::Argon2id, 64 * 1024, 1).unwrap();
        let b = HashFunction::memory_hard(HashAlgorithm::Argon2id, 64 * 1024, 2).unwrap();
        assert_ne!(a.hash(b"seed", 32).unwrap(), b.hash(b"seed", 32).unwrap());
    }

    #[test]
    fn test_memory_hard_rejects_fixed_algorithm() {
        assert!(matches!(
            HashFunction::memory_hard(HashAlgorithm::Sha256, 1024, 1),
            Err(Error::InvalidRecipeValue(_))
        ));
    }

    #[test]
    fn test_out_of_range_tunables_rejected() {
        assert!(HashFunction::memory_hard(HashAlgorithm::Argon2id, 1024, 1).is_err());
        assert!(HashFunction::memory_hard(HashAlgorithm::Argon2id, 64 * 1024, 0).is_err());
        assert!(HashFunction::memory_hard(HashAlgorithm::Scrypt, 1024, 1).is_err());
        assert!(HashFunction::memory_hard(HashAlgorithm::Scrypt, 16 * 1024, 0).is_err());
    }

    #[test]
    fn test_memory_limit_capped() {
        for alg in [HashAlgorithm::Argon2id, HashAlgorithm::Scrypt] {
            assert!(HashFunction::memory_hard(alg, defaults::MAX_MEMORY_LIMIT_IN_BYTES, 1).is_ok());
            assert!(matches!(
                HashFunction::memory_hard(alg, defaults::MAX_MEMORY_LIMIT_IN_BYTES + 1024, 1),
                Err(Error::InvalidRecipeValue(_))
            ));
            assert!(matches!(
                HashFunction::memory_hard(alg, u64::MAX, 1),
                Err(Error::InvalidRecipeValue(_))
            ));
        }
        assert!(matches!(
            HashFunction::memory_hard(HashAlgorithm::Argon2id, 4_398_046_510_080, 1),
            Err(Error::InvalidRecipeValue(_))
        ));
    }

    #[test]
    fn test_scrypt_passes_capped() {
        let max = defaults::SCRYPT_MAX_PASSES;
        assert!(HashFunction::memory_hard(HashAlgorithm::Scrypt, 16 * 1024, max).is_ok());
        assert!(matches!(
            HashFunction::memory_hard(HashAlgorithm::Scrypt, 16 * 1024, max + 1),
            Err(Error::InvalidRecipeValue(_))
        ));
    }

    #[test]
    fn test_hash_validates_directly_built_variants() {
        let zero_passes = HashFunction::Scrypt(MemoryHardParams {
            memory_limit_in_bytes: 16 * 1024,
            passes: 0,
        });
        assert!(matches!(zero_passes.hash(b"seed", 32), Err(Error::InvalidRecipeValue(_))));

        let huge = HashFunction::Argon2id(MemoryHardParams {
            memory_limit_in_bytes: u64::MAX,
            passes: 1,
        });
        assert!(matches!(huge.hash(b"seed", 32), Err(Error::InvalidRecipeValue(_))));
    }

    #[test]
    fn test_presets_build_recipe_objects() {
        let function =
            MemoryHardParams::sensitive().with_algorithm(HashAlgorithm::Argon2id).unwrap();
        let object = function.to_recipe_object();
        assert_eq!(
            Value::Object(object).to_string(),
            r#"{"algorithm":"Argon2id","memoryLimitInBytes":1073741824,"passes":4}"#
        );
        assert!(MemoryHardParams::moderate().with_algorithm(HashAlgorithm::Scrypt).is_ok());
        assert!(MemoryHardParams::moderate().with_algorithm(HashAlgorithm::Blake2b).is_err());
        assert_eq!(HashFunction::Sha256.to_recipe_object().len(), 1);
    }

    #[test]
    fn test_defaults_are_valid() {
        for alg in [HashAlgorithm::Argon2id, HashAlgorithm::Scrypt] {
            let params = alg.default_params().unwrap();
            assert!(
                HashFunction::memory_hard(alg, params.memory_limit_in_bytes, params.passes).is_ok()
            );
            assert_eq!(HashFunction::with_defaults(alg).params(), Some(params));
        }
        assert_eq!(HashFunction::default(), HashFunction::Blake2b);
        assert_eq!(
            HashFunction::Blake2b.kind(),
            HashFunctionKind::FixedOutputLength { block_size: 32 }
        );
    }

    #[test]
    fn test_presets_serialize_camel_case() {
        let json = serde_json::to_string(&MemoryHardParams::interactive()).unwrap();
        assert_eq!(json, r#"{"memoryLimitInBytes":67108864,"passes":2}"#);
        let parsed: MemoryHardParams = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, MemoryHardParams::default());
        assert!(
            MemoryHardParams::sensitive().memory_limit_in_bytes
                > MemoryHardParams::moderate().memory_limit_in_bytes
        );
    }
}
