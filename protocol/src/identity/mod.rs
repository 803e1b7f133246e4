//! # Identity
//!
//! Participant addresses. Shard has no signatures of its own: the caller of
//! an operation is whatever address the runtime says it is, the same way an
//! execution environment hands a contract its `msg.sender`.

pub mod address;

pub use address::{Address, AddressError};
