//! # Addresses
//!
//! Every participant in Shard, whether a person, an asset registry, or a
//! vault, is identified by a 20-byte [`Address`]. Addresses are rendered as
//! `0x` followed by 40 lowercase hex characters.
//!
//! ```text
//! account  = BLAKE3-derive-key(ACCOUNT_DERIVATION_CONTEXT, label)[..20]
//! contract = BLAKE3-derive-key(CONTRACT_DERIVATION_CONTEXT, deployer || nonce_be)[..20]
//! ```
//!
//! Contract addresses depend only on the deployer and how many contracts it
//! has deployed before, so replaying the same sequence of deployments on a
//! fresh devnet yields the same addresses.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::{ACCOUNT_DERIVATION_CONTEXT, ADDRESS_LENGTH, CONTRACT_DERIVATION_CONTEXT};
use crate::crypto::hash::{domain_separated_hash, domain_separated_hash_multi};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while parsing an address string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// The string does not start with `0x`.
    #[error("address must start with 0x: {0}")]
    MissingPrefix(String),

    /// The hex body has the wrong number of characters.
    #[error("invalid address length: expected {expected} hex chars, got {got}")]
    InvalidLength {
        /// Expected number of hex characters.
        expected: usize,
        /// Actual number of hex characters.
        got: usize,
    },

    /// The hex body contains a non-hex character.
    #[error("invalid hex in address: {0}")]
    InvalidHex(String),
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 20-byte participant identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// The null address. Shares are minted from it and burned to it; assets
    /// can never be transferred to it.
    pub const ZERO: Address = Address([0u8; ADDRESS_LENGTH]);

    /// Wrap raw bytes.
    pub const fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Raw bytes of this address.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Deterministic account address for a human-readable label.
    ///
    /// ```
    /// use shard_protocol::identity::Address;
    ///
    /// let alice = Address::from_label("alice");
    /// assert_eq!(alice, Address::from_label("alice"));
    /// assert_ne!(alice, Address::from_label("bob"));
    /// ```
    pub fn from_label(label: &str) -> Self {
        let digest = domain_separated_hash(ACCOUNT_DERIVATION_CONTEXT, label.as_bytes());
        Self::truncate(&digest)
    }

    /// Address of the contract that `deployer` creates with deployment `nonce`.
    pub fn for_contract(deployer: &Address, nonce: u64) -> Self {
        let digest = domain_separated_hash_multi(
            CONTRACT_DERIVATION_CONTEXT,
            &[deployer.as_bytes(), &nonce.to_be_bytes()],
        );
        Self::truncate(&digest)
    }

    /// Returns `true` for [`Address::ZERO`].
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// `0x`-prefixed lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    fn truncate(digest: &[u8; 32]) -> Self {
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(&digest[..ADDRESS_LENGTH]);
        Self(bytes)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| AddressError::MissingPrefix(s.to_string()))?;

        if body.len() != ADDRESS_LENGTH * 2 {
            return Err(AddressError::InvalidLength {
                expected: ADDRESS_LENGTH * 2,
                got: body.len(),
            });
        }

        let mut bytes = [0u8; ADDRESS_LENGTH];
        hex::decode_to_slice(body, &mut bytes)
            .map_err(|_| AddressError::InvalidHex(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(serde::de::Error::custom)
        } else {
            let bytes = <Vec<u8>>::deserialize(deserializer)?;
            if bytes.len() != ADDRESS_LENGTH {
                return Err(serde::de::Error::custom(format!(
                    "expected {}-byte address, got {}",
                    ADDRESS_LENGTH,
                    bytes.len()
                )));
            }
            let mut out = [0u8; ADDRESS_LENGTH];
            out.copy_from_slice(&bytes);
            Ok(Address(out))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_address_renders_as_zeros() {
        assert_eq!(
            Address::ZERO.to_string(),
            "0x0000000000000000000000000000000000000000"
        );
        assert!(Address::ZERO.is_zero());
        assert!(!Address::from_label("x").is_zero());
    }

    #[test]
    fn parse_display_roundtrip() {
        let addr = Address::from_label("collector");
        let parsed: Address = addr.to_string().parse().unwrap();
        assert_eq!(addr, parsed);
    }

    #[test]
    fn parse_accepts_uppercase_hex() {
        let addr = Address::from_label("collector");
        let upper = format!("0x{}", hex::encode_upper(addr.as_bytes()));
        assert_eq!(upper.parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn parse_rejects_missing_prefix() {
        let err = "00".repeat(20).parse::<Address>().unwrap_err();
        assert!(matches!(err, AddressError::MissingPrefix(_)));
    }

    #[test]
    fn parse_rejects_wrong_length() {
        let err = "0x1234".parse::<Address>().unwrap_err();
        assert_eq!(
            err,
            AddressError::InvalidLength {
                expected: 40,
                got: 4
            }
        );
    }

    #[test]
    fn parse_rejects_non_hex() {
        let bad = format!("0x{}", "zz".repeat(20));
        assert!(matches!(
            bad.parse::<Address>().unwrap_err(),
            AddressError::InvalidHex(_)
        ));
    }

    #[test]
    fn contract_addresses_depend_on_nonce_and_deployer() {
        let deployer = Address::from_label("deployer");
        let other = Address::from_label("other");
        assert_ne!(
            Address::for_contract(&deployer, 0),
            Address::for_contract(&deployer, 1)
        );
        assert_ne!(
            Address::for_contract(&deployer, 0),
            Address::for_contract(&other, 0)
        );
        assert_eq!(
            Address::for_contract(&deployer, 7),
            Address::for_contract(&deployer, 7)
        );
    }

    #[test]
    fn serde_json_uses_hex() {
        let addr = Address::from_label("holder");
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", addr.to_hex()));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn bincode_uses_raw_bytes() {
        let addr = Address::from_label("holder");
        let bytes = bincode::serialize(&addr).unwrap();
        let back: Address = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, addr);
    }
}
