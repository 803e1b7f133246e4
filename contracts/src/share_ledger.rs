//! # Share Ledger
//!
//! Fungible bookkeeping for one vault's shares: holder balances, spender
//! allowances, and the total supply. The vault embeds one of these and *is*
//! the share token, the same way a vault contract inherits a fungible token
//! base.
//!
//! ## Rules
//!
//! - Minting and burning are crate-internal; only the vault decides when
//!   supply changes.
//! - Transfers to the zero address are rejected. Burning is the only way
//!   shares leave circulation.
//! - `total_supply` always equals the sum of all balances. Every arithmetic
//!   step is checked.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use shard_protocol::config::SHARE_DECIMALS;
use shard_protocol::{Address, Event, EventLog};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during share ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShareError {
    /// The holder does not own enough shares.
    #[error("insufficient share balance: account has {balance}, needs {amount}")]
    InsufficientBalance {
        /// Current balance of the holder.
        balance: u128,
        /// Amount required.
        amount: u128,
    },

    /// The spender's allowance does not cover the transfer.
    #[error("insufficient allowance: approved {allowance}, needs {amount}")]
    InsufficientAllowance {
        /// Remaining allowance.
        allowance: u128,
        /// Amount required.
        amount: u128,
    },

    /// Shares cannot be sent to, minted to, or approved for the zero address.
    #[error("share operation involving the zero address")]
    ZeroAddress,

    /// A supply or balance would overflow `u128`.
    #[error("share supply overflow: minting {amount} would exceed u128::MAX")]
    SupplyOverflow {
        /// The amount that was attempted.
        amount: u128,
    },
}

// ---------------------------------------------------------------------------
// ShareLedger
// ---------------------------------------------------------------------------

/// Balances, allowances, and supply for one share token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareLedger {
    /// Human-readable token name.
    pub name: String,
    /// Ticker symbol.
    pub symbol: String,
    /// Decimal places. Always [`SHARE_DECIMALS`].
    pub decimals: u8,
    total_supply: u128,
    balances: HashMap<Address, u128>,
    allowances: HashMap<Address, HashMap<Address, u128>>,
}

impl ShareLedger {
    /// Creates a ledger with zero supply.
    pub fn new(name: String, symbol: String) -> Self {
        Self {
            name,
            symbol,
            decimals: SHARE_DECIMALS,
            total_supply: 0,
            balances: HashMap::new(),
            allowances: HashMap::new(),
        }
    }

    /// Shares currently in circulation.
    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    /// Shares held by `holder`.
    pub fn balance_of(&self, holder: &Address) -> u128 {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    /// Remaining amount `spender` may move on behalf of `owner`.
    pub fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.allowances
            .get(owner)
            .and_then(|s| s.get(spender))
            .copied()
            .unwrap_or(0)
    }

    /// Number of addresses with a non-zero balance.
    pub fn holder_count(&self) -> usize {
        self.balances.values().filter(|b| **b > 0).count()
    }

    /// Moves `amount` shares from `from` to `to`.
    pub fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: u128,
        events: &mut EventLog,
    ) -> Result<(), ShareError> {
        if from.is_zero() || to.is_zero() {
            return Err(ShareError::ZeroAddress);
        }

        let from_balance = self.balance_of(&from);
        if from_balance < amount {
            return Err(ShareError::InsufficientBalance {
                balance: from_balance,
                amount,
            });
        }

        if from != to {
            let to_balance = self
                .balance_of(&to)
                .checked_add(amount)
                .ok_or(ShareError::SupplyOverflow { amount })?;
            self.balances.insert(from, from_balance - amount);
            self.balances.insert(to, to_balance);
        }

        events.emit(Event::ShareTransfer {
            vault: token,
            from,
            to,
            amount,
        });
        Ok(())
    }

    /// Sets `spender`'s allowance over `owner`'s shares to `amount`.
    pub fn approve(
        &mut self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: u128,
        events: &mut EventLog,
    ) -> Result<(), ShareError> {
        if owner.is_zero() || spender.is_zero() {
            return Err(ShareError::ZeroAddress);
        }

        self.allowances
            .entry(owner)
            .or_default()
            .insert(spender, amount);

        events.emit(Event::ShareApproval {
            vault: token,
            owner,
            spender,
            amount,
        });
        Ok(())
    }

    /// Moves `amount` of `from`'s shares to `to`, spending `spender`'s allowance.
    ///
    /// An allowance of `u128::MAX` is treated as unlimited and never decreases.
    pub fn transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: u128,
        events: &mut EventLog,
    ) -> Result<(), ShareError> {
        let allowance = self.allowance(&from, &spender);
        if allowance < amount {
            return Err(ShareError::InsufficientAllowance { allowance, amount });
        }

        self.transfer(token, from, to, amount, events)?;

        if allowance != u128::MAX {
            self.allowances
                .entry(from)
                .or_default()
                .insert(spender, allowance - amount);
        }
        Ok(())
    }

    /// Creates `amount` new shares for `to`.
    pub(crate) fn mint(
        &mut self,
        token: Address,
        to: Address,
        amount: u128,
        events: &mut EventLog,
    ) -> Result<(), ShareError> {
        if to.is_zero() {
            return Err(ShareError::ZeroAddress);
        }

        let new_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(ShareError::SupplyOverflow { amount })?;
        let new_balance = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or(ShareError::SupplyOverflow { amount })?;

        self.total_supply = new_supply;
        self.balances.insert(to, new_balance);

        events.emit(Event::ShareTransfer {
            vault: token,
            from: Address::ZERO,
            to,
            amount,
        });
        Ok(())
    }

    /// Destroys `amount` of `from`'s shares.
    pub(crate) fn burn(
        &mut self,
        token: Address,
        from: Address,
        amount: u128,
        events: &mut EventLog,
    ) -> Result<(), ShareError> {
        let balance = self.balance_of(&from);
        if balance < amount {
            return Err(ShareError::InsufficientBalance { balance, amount });
        }

        self.balances.insert(from, balance - amount);
        // Supply is the sum of balances, so it can't be below `amount` here.
        self.total_supply -= amount;

        events.emit(Event::ShareTransfer {
            vault: token,
            from,
            to: Address::ZERO,
            amount,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(label: &str) -> Address {
        Address::from_label(label)
    }

    fn token() -> Address {
        addr("vault")
    }

    fn ledger_with(holder: &str, amount: u128) -> ShareLedger {
        let mut ledger = ShareLedger::new("Bond of fractionalized NFT".into(), "BOND".into());
        ledger
            .mint(token(), addr(holder), amount, &mut EventLog::new())
            .unwrap();
        ledger
    }

    #[test]
    fn mint_increases_supply_and_balance() {
        let ledger = ledger_with("alice", 1_000_000);
        assert_eq!(ledger.total_supply(), 1_000_000);
        assert_eq!(ledger.balance_of(&addr("alice")), 1_000_000);
        assert_eq!(ledger.decimals, SHARE_DECIMALS);
    }

    #[test]
    fn mint_emits_transfer_from_zero() {
        let mut ledger = ShareLedger::new("T".into(), "T".into());
        let mut events = EventLog::new();
        ledger.mint(token(), addr("alice"), 5, &mut events).unwrap();
        assert_eq!(
            events.all(),
            &[Event::ShareTransfer {
                vault: token(),
                from: Address::ZERO,
                to: addr("alice"),
                amount: 5,
            }]
        );
    }

    #[test]
    fn mint_overflow_rejected() {
        let mut ledger = ledger_with("alice", u128::MAX);
        let result = ledger.mint(token(), addr("bob"), 1, &mut EventLog::new());
        assert_eq!(result, Err(ShareError::SupplyOverflow { amount: 1 }));
        assert_eq!(ledger.balance_of(&addr("bob")), 0);
    }

    #[test]
    fn transfer_moves_balance() {
        let mut ledger = ledger_with("alice", 1_000);
        ledger
            .transfer(token(), addr("alice"), addr("bob"), 300, &mut EventLog::new())
            .unwrap();
        assert_eq!(ledger.balance_of(&addr("alice")), 700);
        assert_eq!(ledger.balance_of(&addr("bob")), 300);
        assert_eq!(ledger.total_supply(), 1_000);
        assert_eq!(ledger.holder_count(), 2);
    }

    #[test]
    fn transfer_more_than_balance_rejected() {
        let mut ledger = ledger_with("alice", 100);
        let result = ledger.transfer(token(), addr("alice"), addr("bob"), 200, &mut EventLog::new());
        assert_eq!(
            result,
            Err(ShareError::InsufficientBalance {
                balance: 100,
                amount: 200
            })
        );
    }

    #[test]
    fn transfer_to_zero_rejected() {
        let mut ledger = ledger_with("alice", 100);
        let result = ledger.transfer(token(), addr("alice"), Address::ZERO, 1, &mut EventLog::new());
        assert_eq!(result, Err(ShareError::ZeroAddress));
    }

    #[test]
    fn transfer_from_spends_allowance() {
        let mut ledger = ledger_with("alice", 1_000);
        let mut events = EventLog::new();
        ledger
            .approve(token(), addr("alice"), addr("spender"), 400, &mut events)
            .unwrap();
        ledger
            .transfer_from(
                token(),
                addr("spender"),
                addr("alice"),
                addr("bob"),
                150,
                &mut events,
            )
            .unwrap();
        assert_eq!(ledger.allowance(&addr("alice"), &addr("spender")), 250);
        assert_eq!(ledger.balance_of(&addr("bob")), 150);
    }

    #[test]
    fn transfer_from_beyond_allowance_rejected() {
        let mut ledger = ledger_with("alice", 1_000);
        let mut events = EventLog::new();
        ledger
            .approve(token(), addr("alice"), addr("spender"), 10, &mut events)
            .unwrap();
        let result = ledger.transfer_from(
            token(),
            addr("spender"),
            addr("alice"),
            addr("bob"),
            11,
            &mut events,
        );
        assert_eq!(
            result,
            Err(ShareError::InsufficientAllowance {
                allowance: 10,
                amount: 11
            })
        );
    }

    #[test]
    fn unlimited_allowance_is_not_spent() {
        let mut ledger = ledger_with("alice", 1_000);
        let mut events = EventLog::new();
        ledger
            .approve(token(), addr("alice"), addr("spender"), u128::MAX, &mut events)
            .unwrap();
        ledger
            .transfer_from(
                token(),
                addr("spender"),
                addr("alice"),
                addr("bob"),
                500,
                &mut events,
            )
            .unwrap();
        assert_eq!(ledger.allowance(&addr("alice"), &addr("spender")), u128::MAX);
    }

    #[test]
    fn burn_decreases_supply_and_balance() {
        let mut ledger = ledger_with("alice", 1_000_000);
        ledger
            .burn(token(), addr("alice"), 400_000, &mut EventLog::new())
            .unwrap();
        assert_eq!(ledger.total_supply(), 600_000);
        assert_eq!(ledger.balance_of(&addr("alice")), 600_000);
    }

    #[test]
    fn burn_more_than_balance_rejected() {
        let mut ledger = ledger_with("alice", 100);
        let result = ledger.burn(token(), addr("alice"), 200, &mut EventLog::new());
        assert!(result.is_err());
        assert_eq!(ledger.total_supply(), 100);
    }
}
