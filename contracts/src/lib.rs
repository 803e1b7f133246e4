// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Shard Contracts
//!
//! Fractional ownership of non-fungible assets:
//!
//! - **Share Ledger**: the fungible share token every vault carries, with
//!   balances, allowances, and supply.
//! - **Access**: the single admin a vault is deployed with.
//! - **Vault**: locks one asset, mints its shares, sells it once, and pays
//!   shareholders pro rata out of the proceeds.
//! - **Chain**: the runtime that executes calls one at a time against a
//!   world state and rolls back any call that fails.
//!
//! ## Design Principles
//!
//! 1. All monetary operations check for overflow. Payouts are computed in
//!    256 bits and only narrowed once the result is known to fit.
//! 2. State transitions are explicit: a `VaultPhase` enum, not a pile of
//!    boolean flags.
//! 3. Only the admin can fractionalize and list. Buying and withdrawing are
//!    open to anyone who meets the conditions.
//! 4. Every public type is serializable (serde) for persistent storage.

pub mod access;
pub mod chain;
pub mod share_ledger;
pub mod vault;

pub use chain::{Chain, ChainError, Receipt, SharedChain, WorldState};
pub use vault::{LockedAsset, Vault, VaultError, VaultPhase};
