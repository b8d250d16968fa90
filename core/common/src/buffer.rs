//! Fixed-length storage for secret bytes.
//!
//! A [`SecureBuffer`] owns its bytes exclusively, never reallocates after
//! construction and overwrites every byte with zero when dropped, on the
//! success path and on every error path alike.

use std::fmt;

use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};

/// Size of the big-endian length prefix used by the list framing.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Secret byte container that zeroizes on drop.
///
/// `Clone` produces an independent deep copy, so each owner wipes its own
/// bytes. `PartialEq` is a plain length+content comparison and must not be
/// used for authentication decisions; use [`SecureBuffer::ct_eq`] there.
pub struct SecureBuffer {
    data: Box<[u8]>,
}

impl SecureBuffer {
    /// Allocate a zero-filled buffer of `length` bytes.
    pub fn new(length: usize) -> Self {
        Self {
            data: vec![0u8; length].into_boxed_slice(),
        }
    }

    /// Copy `bytes` into a new buffer.
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self {
            data: bytes.to_vec().into_boxed_slice(),
        }
    }

    /// Move the contents of `bytes` into a new buffer and wipe the vector,
    /// including any spare capacity.
    pub fn from_vec(mut bytes: Vec<u8>) -> Self {
        let buffer = Self::from_slice(&bytes);
        bytes.zeroize();
        buffer
    }

    /// Parse a hex string, with or without a `0x` prefix.
    ///
    /// # Errors
    /// - `Serialization` if the string is not valid hex
    pub fn from_hex_string(hex_str: &str) -> Result<Self> {
        let digits = hex_str
            .strip_prefix("0x")
            .or_else(|| hex_str.strip_prefix("0X"))
            .unwrap_or(hex_str);
        let bytes = hex::decode(digits)
            .map_err(|e| Error::Serialization(format!("Invalid hex string: {}", e)))?;
        Ok(Self::from_vec(bytes))
    }

    /// Copy the UTF-8 bytes of `s` into a new buffer.
    pub fn from_utf8_string(s: &str) -> Self {
        Self::from_slice(s.as_bytes())
    }

    /// Number of bytes held.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer holds zero bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read access to the bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Write access to the bytes. The length cannot change.
    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Lowercase hex encoding of the contents.
    pub fn to_hex_string(&self) -> String {
        hex::encode(&self.data)
    }

    /// Interpret the contents as UTF-8.
    ///
    /// # Errors
    /// - `Serialization` if the bytes are not valid UTF-8
    pub fn to_utf8_string(&self) -> Result<String> {
        std::str::from_utf8(&self.data)
            .map(str::to_owned)
            .map_err(|e| Error::Serialization(format!("Buffer is not valid UTF-8: {}", e)))
    }

    /// Copy the contents into an ordinary vector. The copy is not wiped.
    pub fn to_byte_vector(&self) -> Vec<u8> {
        self.data.to_vec()
    }

    /// Constant-time content comparison.
    pub fn ct_eq(&self, other: &[u8]) -> bool {
        self.data.len() == other.len() && bool::from(self.data.as_ref().ct_eq(other))
    }

    /// Split into `count` buffers of `each_length` bytes.
    ///
    /// # Errors
    /// - `KeyLength` unless `count * each_length` equals this buffer's length
    pub fn split_fixed_length_list(
        &self,
        count: usize,
        each_length: usize,
    ) -> Result<Vec<SecureBuffer>> {
        let expected = count
            .checked_mul(each_length)
            .ok_or_else(|| Error::key_length(usize::MAX, self.len()))?;
        if expected != self.len() {
            return Err(Error::key_length(expected, self.len()));
        }
        if each_length == 0 {
            return Ok((0..count).map(|_| SecureBuffer::new(0)).collect());
        }
        Ok(self.data.chunks_exact(each_length).map(SecureBuffer::from_slice).collect())
    }

    /// Concatenate fields as `be32(len) || bytes` for each field in order.
    ///
    /// # Errors
    /// - `Serialization` if a field is longer than `u32::MAX` bytes
    pub fn combine_length_prefixed_list(fields: &[&[u8]]) -> Result<SecureBuffer> {
        let total: usize = fields.iter().map(|f| LENGTH_PREFIX_SIZE + f.len()).sum();
        let mut combined = SecureBuffer::new(total);
        let mut offset = 0;
        for field in fields {
            let len = u32::try_from(field.len()).map_err(|_| {
                Error::Serialization(format!("Field of {} bytes is too long to frame", field.len()))
            })?;
            combined.data[offset..offset + LENGTH_PREFIX_SIZE].copy_from_slice(&len.to_be_bytes());
            offset += LENGTH_PREFIX_SIZE;
            combined.data[offset..offset + field.len()].copy_from_slice(field);
            offset += field.len();
        }
        Ok(combined)
    }

    /// Inverse of [`SecureBuffer::combine_length_prefixed_list`].
    ///
    /// # Errors
    /// - `Serialization` on truncation, a length running past the end,
    ///   or bytes left over after `count` fields
    pub fn split_length_prefixed_list(&self, count: usize) -> Result<Vec<SecureBuffer>> {
        let mut fields = Vec::with_capacity(count);
        let mut rest: &[u8] = &self.data;
        for index in 0..count {
            if rest.len() < LENGTH_PREFIX_SIZE {
                return Err(Error::Serialization(format!(
                    "Truncated length prefix for field {}",
                    index
                )));
            }
            let (prefix, tail) = rest.split_at(LENGTH_PREFIX_SIZE);
            let mut len_bytes = [0u8; LENGTH_PREFIX_SIZE];
            len_bytes.copy_from_slice(prefix);
            let len = u32::from_be_bytes(len_bytes) as usize;
            if tail.len() < len {
                return Err(Error::Serialization(format!(
                    "Field {} claims {} bytes but only {} remain",
                    index,
                    len,
                    tail.len()
                )));
            }
            let (field, tail) = tail.split_at(len);
            fields.push(SecureBuffer::from_slice(field));
            rest = tail;
        }
        if !rest.is_empty() {
            return Err(Error::Serialization(format!(
                "{} trailing bytes after {} fields",
                rest.len(),
                count
            )));
        }
        Ok(fields)
    }
}

impl Clone for SecureBuffer {
    fn clone(&self) -> Self {
        Self::from_slice(&self.data)
    }
}

impl PartialEq for SecureBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for SecureBuffer {}

impl Drop for SecureBuffer {
    fn drop(&mut self) {
        self.data.zeroize();
    }
}

impl ZeroizeOnDrop for SecureBuffer {}

impl From<&[u8]> for SecureBuffer {
    fn from(bytes: &[u8]) -> Self {
        Self::from_slice(bytes)
    }
}

impl fmt::Debug for SecureBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecureBuffer([REDACTED; {} bytes])", self.data.len())
    }
}
