//! # Hashing Utilities
//!
//! BLAKE3 is the only hash function Shard uses. It derives account and
//! contract addresses and fingerprints persisted world state.
//!
//! Domain separation goes through BLAKE3's `derive_key` mode rather than a
//! hand-prepended tag, so two contexts can never produce the same digest for
//! the same input.

/// Compute the BLAKE3 hash of the input data.
///
/// # Example
///
/// ```
/// use shard_protocol::crypto::blake3_hash;
///
/// let hash = blake3_hash(b"shard");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Domain-separated BLAKE3 hash using `derive_key` mode.
///
/// `domain_separated_hash("a", data)` and `domain_separated_hash("b", data)`
/// never collide even when `data` is identical.
pub fn domain_separated_hash(context: &str, data: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    hasher.update(data);
    *hasher.finalize().as_bytes()
}

/// Domain-separated hash over several byte slices fed in order, without
/// concatenating them into a temporary buffer first.
pub fn domain_separated_hash_multi(context: &str, parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blake3_deterministic() {
        assert_eq!(blake3_hash(b"vault"), blake3_hash(b"vault"));
        assert_ne!(blake3_hash(b"vault"), blake3_hash(b"vaults"));
    }

    #[test]
    fn test_domain_separation_changes_digest() {
        let a = domain_separated_hash("context-a", b"payload");
        let b = domain_separated_hash("context-b", b"payload");
        assert_ne!(a, b);
        assert_ne!(a, blake3_hash(b"payload"));
    }

    #[test]
    fn test_multi_matches_concatenation() {
        let joined = domain_separated_hash("ctx", b"helloworld");
        let parts = domain_separated_hash_multi("ctx", &[b"hello", b"world"]);
        assert_eq!(joined, parts);
    }
}
