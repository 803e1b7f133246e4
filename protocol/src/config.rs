//! # Protocol Configuration & Constants
//!
//! Every magic number in Shard lives here. If you're hardcoding a constant
//! somewhere else, move it here and give it a name.
//!
//! Most of these only matter for the devnet: how many accounts the genesis
//! funds, how much each one starts with, and what a freshly deployed vault
//! calls its share token when nobody says otherwise.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Crate-independent protocol version. Bump the minor on additive changes to
/// the vault surface, the major when persisted state stops being readable.
pub const PROTOCOL_VERSION: &str = "0.1.0";

/// Version tag written next to every persisted world-state snapshot.
/// Loading a snapshot with a different tag is refused rather than guessed at.
pub const SNAPSHOT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// Decimal places of the native currency. 18, the same as ether, so that
/// "1 unit" in the CLI means 10^18 base units.
pub const NATIVE_DECIMALS: u8 = 18;

/// Decimal places of every vault share token.
pub const SHARE_DECIMALS: u8 = 18;

/// Ticker used when printing native amounts.
pub const NATIVE_SYMBOL: &str = "ETH";

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Address length in bytes.
pub const ADDRESS_LENGTH: usize = 20;

/// BLAKE3 derive-key context for devnet account addresses.
pub const ACCOUNT_DERIVATION_CONTEXT: &str = "shard 2026 devnet account address";

/// BLAKE3 derive-key context for contract addresses. Kept distinct from the
/// account context so a label can never collide with a deployment.
pub const CONTRACT_DERIVATION_CONTEXT: &str = "shard 2026 contract address";

// ---------------------------------------------------------------------------
// Devnet
// ---------------------------------------------------------------------------

/// Number of accounts funded at genesis.
pub const DEVNET_ACCOUNT_COUNT: usize = 20;

/// Balance of every genesis account: 10,000 whole native units.
pub const DEVNET_INITIAL_BALANCE: u128 = 10_000 * 10u128.pow(NATIVE_DECIMALS as u32);

/// Label prefix for deterministic devnet accounts (`devnet-account-0`, ...).
pub const DEVNET_ACCOUNT_LABEL: &str = "devnet-account";

// ---------------------------------------------------------------------------
// Vault Defaults
// ---------------------------------------------------------------------------

/// Share token symbol used when a vault is deployed without one.
pub const DEFAULT_VAULT_SYMBOL: &str = "FRACTIONALIZE";

/// Share token name used when a vault is deployed without one.
pub const DEFAULT_VAULT_NAME: &str = "Fractionalize an ERC721";

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// sled tree holding world-state snapshots.
pub const TREE_SNAPSHOTS: &str = "snapshots";

/// sled tree holding call receipts keyed by big-endian index.
pub const TREE_RECEIPTS: &str = "receipts";

/// sled tree holding small metadata values.
pub const TREE_METADATA: &str = "metadata";

/// Key under which the latest world state is stored in [`TREE_SNAPSHOTS`].
pub const SNAPSHOT_KEY_LATEST: &[u8] = b"latest";

/// Key under which the BLAKE3 digest of the latest snapshot is stored.
pub const SNAPSHOT_KEY_DIGEST: &[u8] = b"latest.blake3";

/// Directory name of the sled database inside the node data directory.
pub const DB_DIR_NAME: &str = "db";

// ---------------------------------------------------------------------------
// DevnetConfig
// ---------------------------------------------------------------------------

/// Genesis parameters for a local devnet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevnetConfig {
    /// Number of deterministic accounts to fund.
    pub account_count: usize,
    /// Native balance credited to each account, in base units.
    pub initial_balance: u128,
}

impl Default for DevnetConfig {
    fn default() -> Self {
        Self {
            account_count: DEVNET_ACCOUNT_COUNT,
            initial_balance: DEVNET_INITIAL_BALANCE,
        }
    }
}

/// Label of the `index`-th devnet account.
pub fn devnet_account_label(index: usize) -> String {
    format!("{}-{}", DEVNET_ACCOUNT_LABEL, index)
}
