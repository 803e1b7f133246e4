//! # Cryptographic Primitives
//!
//! Thin wrappers around BLAKE3. Nothing here is clever, and it should stay
//! that way.

pub mod hash;

pub use hash::{blake3_hash, domain_separated_hash, domain_separated_hash_multi};
