// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Shard Protocol — Core Library
//!
//! The ledger that vaults run on. Nothing in here knows what a vault is;
//! this crate provides the pieces a vault needs from its environment:
//!
//! - **identity** — 20-byte addresses for accounts and contracts.
//! - **crypto** — BLAKE3 hashing with domain separation.
//! - **ledger** — native currency balances. Sale proceeds live here.
//! - **registry** — non-fungible asset registries and the trait vaults use
//!   to take and release custody.
//! - **event** — the event journal every state change writes to.
//! - **units** — decimal string ↔ base unit conversion.
//! - **storage** — sled-backed snapshots and receipts.
//! - **config** — protocol constants and devnet parameters.
//!
//! ## Design Philosophy
//!
//! 1. Money is `u128` base units and every addition is checked.
//! 2. Components validate first and mutate second; the runtime above
//!    snapshots state so a failed call leaves nothing behind.
//! 3. If it touches money, it has tests. Plural.

pub mod config;
pub mod crypto;
pub mod event;
pub mod identity;
pub mod ledger;
pub mod registry;
pub mod storage;
pub mod units;

pub use event::{Event, EventLog};
pub use identity::Address;
pub use ledger::{NativeError, NativeLedger};
pub use registry::{AssetId, AssetRegistry, NonFungibleRegistry, RegistryError, RegistrySet};
