//! Common types shared across the seeded crates.
//!
//! This crate provides the error taxonomy used by every layer and the
//! zeroizing buffer that owns all secret material.

pub mod buffer;
pub mod error;

pub use buffer::SecureBuffer;
pub use error::{Error, Result};
