//! # Storage Module
//!
//! Persistence for a devnet. The chain keeps its whole world state in
//! memory; after every accepted call the node writes a fresh snapshot and
//! the call's receipt here, so a restart picks up exactly where it stopped.
//!
//! Bincode for on-disk serialization: compact, fast, deterministic. JSON is
//! for the CLI and debugging.

pub mod db;

pub use db::{DbError, DbResult, ShardDB};
