//! # Native Currency Ledger
//!
//! Balances of the chain's native currency, in base units. Vaults hold their
//! escrowed sale proceeds here like any other address; there is no separate
//! escrow account.
//!
//! ## Invariants
//!
//! - Balances never go negative: `transfer` checks before it debits.
//! - Credits are overflow-checked. `total_issued` only grows through
//!   [`NativeLedger::credit`], transfers move value without creating it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::event::{Event, EventLog};
use crate::identity::Address;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur when moving native currency.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NativeError {
    /// The sender does not hold enough to cover the transfer.
    #[error("insufficient funds in {account}: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Account being debited.
        account: Address,
        /// Its current balance.
        available: u128,
        /// Amount requested.
        requested: u128,
    },

    /// A credit would overflow `u128`.
    #[error("native balance overflow for {0}")]
    Overflow(Address),
}

// ---------------------------------------------------------------------------
// NativeLedger
// ---------------------------------------------------------------------------

/// Native balances keyed by address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeLedger {
    balances: HashMap<Address, u128>,
    total_issued: u128,
}

impl NativeLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance of `account`, zero if it has never been touched.
    pub fn balance_of(&self, account: &Address) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Total currency ever created through [`credit`](Self::credit).
    pub fn total_issued(&self) -> u128 {
        self.total_issued
    }

    /// Creates `amount` out of thin air for `account`. Genesis and faucet only.
    pub fn credit(&mut self, account: Address, amount: u128) -> Result<(), NativeError> {
        let issued = self
            .total_issued
            .checked_add(amount)
            .ok_or(NativeError::Overflow(account))?;
        let balance = self.balance_of(&account);
        let new_balance = balance
            .checked_add(amount)
            .ok_or(NativeError::Overflow(account))?;

        self.balances.insert(account, new_balance);
        self.total_issued = issued;
        Ok(())
    }

    /// Moves `amount` from `from` to `to` and records a transfer event.
    ///
    /// Zero-amount transfers succeed without emitting anything.
    ///
    /// # Errors
    ///
    /// Returns [`NativeError::InsufficientFunds`] if `from` holds less than
    /// `amount`. Nothing is changed in that case.
    pub fn transfer(
        &mut self,
        from: Address,
        to: Address,
        amount: u128,
        events: &mut EventLog,
    ) -> Result<(), NativeError> {
        if amount == 0 {
            return Ok(());
        }

        let available = self.balance_of(&from);
        if available < amount {
            return Err(NativeError::InsufficientFunds {
                account: from,
                available,
                requested: amount,
            });
        }

        if from != to {
            let credited = self
                .balance_of(&to)
                .checked_add(amount)
                .ok_or(NativeError::Overflow(to))?;
            self.balances.insert(from, available - amount);
            self.balances.insert(to, credited);
        }

        events.emit(Event::NativeTransfer { from, to, amount });
        tracing::debug!(%from, %to, amount, "native transfer");
        Ok(())
    }

    /// Sum of all balances. Equal to `total_issued` as long as nothing burns
    /// native currency, which nothing does.
    pub fn circulating(&self) -> u128 {
        self.balances.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(label: &str) -> Address {
        Address::from_label(label)
    }

    #[test]
    fn credit_increases_balance_and_issuance() {
        let mut ledger = NativeLedger::new();
        ledger.credit(addr("a"), 500).unwrap();
        ledger.credit(addr("a"), 250).unwrap();
        assert_eq!(ledger.balance_of(&addr("a")), 750);
        assert_eq!(ledger.total_issued(), 750);
    }

    #[test]
    fn credit_overflow_rejected() {
        let mut ledger = NativeLedger::new();
        ledger.credit(addr("a"), u128::MAX).unwrap();
        let err = ledger.credit(addr("b"), 1).unwrap_err();
        assert_eq!(err, NativeError::Overflow(addr("b")));
        assert_eq!(ledger.balance_of(&addr("b")), 0);
    }

    #[test]
    fn transfer_moves_value_and_emits() {
        let mut ledger = NativeLedger::new();
        let mut events = EventLog::new();
        ledger.credit(addr("a"), 1_000).unwrap();
        ledger
            .transfer(addr("a"), addr("b"), 400, &mut events)
            .unwrap();
        assert_eq!(ledger.balance_of(&addr("a")), 600);
        assert_eq!(ledger.balance_of(&addr("b")), 400);
        assert_eq!(ledger.circulating(), ledger.total_issued());
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn transfer_insufficient_funds_changes_nothing() {
        let mut ledger = NativeLedger::new();
        let mut events = EventLog::new();
        ledger.credit(addr("a"), 10).unwrap();
        let err = ledger
            .transfer(addr("a"), addr("b"), 11, &mut events)
            .unwrap_err();
        assert_eq!(
            err,
            NativeError::InsufficientFunds {
                account: addr("a"),
                available: 10,
                requested: 11,
            }
        );
        assert_eq!(ledger.balance_of(&addr("a")), 10);
        assert_eq!(ledger.balance_of(&addr("b")), 0);
        assert!(events.is_empty());
    }

    #[test]
    fn zero_transfer_is_noop() {
        let mut ledger = NativeLedger::new();
        let mut events = EventLog::new();
        ledger.transfer(addr("a"), addr("b"), 0, &mut events).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn self_transfer_keeps_balance() {
        let mut ledger = NativeLedger::new();
        let mut events = EventLog::new();
        ledger.credit(addr("a"), 10).unwrap();
        ledger.transfer(addr("a"), addr("a"), 5, &mut events).unwrap();
        assert_eq!(ledger.balance_of(&addr("a")), 10);
    }
}
