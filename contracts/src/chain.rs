//! # Chain Runtime
//!
//! Executes calls against a single world state: native balances, asset
//! registries, vaults, deployment nonces, and the event log.
//!
//! Calls are totally ordered. Each mutating call runs inside
//! [`Chain::transact`], which snapshots the world state first and restores
//! it if the call fails, so a failed call leaves no balance, custody change,
//! or event behind. Successful calls append a [`Receipt`].
//!
//! For access from several threads, wrap the chain in a [`SharedChain`];
//! the mutex serializes calls the same way a block serializes transactions.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use shard_protocol::config::{devnet_account_label, DevnetConfig};
use shard_protocol::{
    Address, AssetId, AssetRegistry, Event, EventLog, NativeError, NativeLedger,
    NonFungibleRegistry, RegistryError, RegistrySet,
};

use crate::vault::{Vault, VaultError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by chain calls. Any of these means the call was rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// No vault is deployed at this address.
    #[error("no vault at {0}")]
    UnknownVault(Address),

    /// A vault operation failed.
    #[error(transparent)]
    Vault(#[from] VaultError),

    /// A registry operation failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A native transfer failed.
    #[error(transparent)]
    Native(#[from] NativeError),

    /// A deployment nonce would overflow.
    #[error("deployment nonce overflow for {0}")]
    NonceOverflow(Address),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Everything the chain knows. Cloned before each call for rollback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldState {
    /// Native currency balances.
    pub native: NativeLedger,
    /// Deployed asset registries.
    pub registries: RegistrySet,
    /// Deployed vaults keyed by address.
    pub vaults: HashMap<Address, Vault>,
    /// Number of contracts each account has deployed.
    pub nonces: HashMap<Address, u64>,
    /// Every event emitted by a successful call.
    pub events: EventLog,
    /// Number of successful calls so far.
    pub height: u64,
}

impl WorldState {
    fn next_contract_address(&mut self, deployer: Address) -> Result<Address, ChainError> {
        let nonce = self.nonces.entry(deployer).or_insert(0);
        let address = Address::for_contract(&deployer, *nonce);
        *nonce = nonce
            .checked_add(1)
            .ok_or(ChainError::NonceOverflow(deployer))?;
        Ok(address)
    }
}

/// Record of one successful call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Unique receipt identifier.
    pub id: Uuid,
    /// Position of the call in the chain's history, starting at zero.
    pub index: u64,
    /// Account that made the call.
    pub caller: Address,
    /// Events the call emitted, in order.
    pub events: Vec<Event>,
    /// When the call executed.
    pub timestamp: DateTime<Utc>,
}

/// A chain behind a mutex, shareable across threads.
pub type SharedChain = Arc<Mutex<Chain>>;

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// The runtime. Owns the world state and the receipts of this session.
#[derive(Debug, Clone, Default)]
pub struct Chain {
    state: WorldState,
    receipts: Vec<Receipt>,
}

impl Chain {
    /// Creates an empty chain with no accounts funded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a chain whose genesis funds the deterministic devnet accounts.
    pub fn devnet(config: &DevnetConfig) -> Result<Self, ChainError> {
        let mut chain = Self::new();
        for account in Self::devnet_accounts(config) {
            chain.state.native.credit(account, config.initial_balance)?;
        }
        tracing::info!(
            accounts = config.account_count,
            initial_balance = config.initial_balance,
            "devnet genesis created"
        );
        Ok(chain)
    }

    /// The deterministic devnet account addresses, in index order.
    pub fn devnet_accounts(config: &DevnetConfig) -> Vec<Address> {
        (0..config.account_count)
            .map(|i| Address::from_label(&devnet_account_label(i)))
            .collect()
    }

    /// Resumes from a persisted world state.
    pub fn from_state(state: WorldState) -> Self {
        Self {
            state,
            receipts: Vec::new(),
        }
    }

    /// Wraps this chain for shared, serialized access.
    pub fn into_shared(self) -> SharedChain {
        Arc::new(Mutex::new(self))
    }

    /// The current world state.
    pub fn state(&self) -> &WorldState {
        &self.state
    }

    /// Receipts produced since this chain value was created or loaded.
    pub fn receipts(&self) -> &[Receipt] {
        &self.receipts
    }

    /// The most recent receipt, if any call has succeeded.
    pub fn last_receipt(&self) -> Option<&Receipt> {
        self.receipts.last()
    }

    /// Runs `call` atomically on behalf of `caller`.
    ///
    /// On success a receipt carrying the call's events is appended. On
    /// failure the world state is restored to exactly what it was before.
    pub fn transact<T, F>(&mut self, caller: Address, call: F) -> Result<T, ChainError>
    where
        F: FnOnce(&mut WorldState) -> Result<T, ChainError>,
    {
        let snapshot = self.state.clone();
        let first_event = self.state.events.len();

        match call(&mut self.state) {
            Ok(value) => {
                let receipt = Receipt {
                    id: Uuid::new_v4(),
                    index: self.state.height,
                    caller,
                    events: self.state.events.since(first_event).to_vec(),
                    timestamp: Utc::now(),
                };
                self.state.height += 1;
                tracing::debug!(index = receipt.index, %caller, events = receipt.events.len(), "call committed");
                self.receipts.push(receipt);
                Ok(value)
            }
            Err(err) => {
                self.state = snapshot;
                tracing::warn!(%caller, error = %err, "call reverted");
                Err(err)
            }
        }
    }

    // -- Native currency -----------------------------------------------------

    /// Credits `amount` to `account` out of thin air. Devnet faucet.
    pub fn fund(&mut self, account: Address, amount: u128) -> Result<(), ChainError> {
        self.transact(account, |state| {
            state.native.credit(account, amount)?;
            Ok(())
        })
    }

    /// Sends native currency from `caller` to `to`.
    pub fn send(&mut self, caller: Address, to: Address, amount: u128) -> Result<(), ChainError> {
        self.transact(caller, |state| {
            state.native.transfer(caller, to, amount, &mut state.events)?;
            Ok(())
        })
    }

    /// Native balance of `account`.
    pub fn native_balance(&self, account: &Address) -> u128 {
        self.state.native.balance_of(account)
    }

    // -- Asset registries ----------------------------------------------------

    /// Deploys a new asset registry with `caller` as its minter.
    pub fn deploy_registry(
        &mut self,
        caller: Address,
        name: &str,
        symbol: &str,
    ) -> Result<Address, ChainError> {
        self.transact(caller, |state| {
            let address = state.next_contract_address(caller)?;
            state.registries.insert(AssetRegistry::new(
                address,
                name.to_string(),
                symbol.to_string(),
                caller,
            ));
            state.events.emit(Event::Deployed {
                contract: address,
                deployer: caller,
            });
            tracing::info!(%address, deployer = %caller, name, symbol, "asset registry deployed");
            Ok(address)
        })
    }

    /// Mints asset `id` of `registry` to `to`.
    pub fn mint_asset(
        &mut self,
        caller: Address,
        registry: Address,
        to: Address,
        id: AssetId,
    ) -> Result<(), ChainError> {
        self.transact(caller, |state| {
            state
                .registries
                .get_mut(&registry)?
                .mint(caller, to, id, &mut state.events)?;
            Ok(())
        })
    }

    /// Approves `to` to move asset `id` of `registry`.
    pub fn approve_asset(
        &mut self,
        caller: Address,
        registry: Address,
        to: Address,
        id: AssetId,
    ) -> Result<(), ChainError> {
        self.transact(caller, |state| {
            state
                .registries
                .get_mut(&registry)?
                .approve(caller, to, id, &mut state.events)?;
            Ok(())
        })
    }

    /// Grants or revokes `operator` over all of `caller`'s assets in `registry`.
    pub fn set_approval_for_all(
        &mut self,
        caller: Address,
        registry: Address,
        operator: Address,
        approved: bool,
    ) -> Result<(), ChainError> {
        self.transact(caller, |state| {
            state
                .registries
                .get_mut(&registry)?
                .set_approval_for_all(caller, operator, approved, &mut state.events)?;
            Ok(())
        })
    }

    /// Moves asset `id` of `registry` from `from` to `to`.
    pub fn transfer_asset(
        &mut self,
        caller: Address,
        registry: Address,
        from: Address,
        to: Address,
        id: AssetId,
    ) -> Result<(), ChainError> {
        self.transact(caller, |state| {
            state
                .registries
                .transfer_from(&registry, caller, from, to, id, &mut state.events)?;
            Ok(())
        })
    }

    /// Current owner of asset `id` in `registry`.
    pub fn owner_of(&self, registry: &Address, id: AssetId) -> Result<Address, ChainError> {
        Ok(self.state.registries.owner_of(registry, id)?)
    }

    // -- Vaults --------------------------------------------------------------

    /// Deploys a vault with `caller` as its admin.
    pub fn deploy_vault(
        &mut self,
        caller: Address,
        name: &str,
        symbol: &str,
    ) -> Result<Address, ChainError> {
        self.transact(caller, |state| {
            let address = state.next_contract_address(caller)?;
            state.vaults.insert(
                address,
                Vault::new(address, caller, name.to_string(), symbol.to_string()),
            );
            state.events.emit(Event::Deployed {
                contract: address,
                deployer: caller,
            });
            tracing::info!(%address, admin = %caller, name, symbol, "vault deployed");
            Ok(address)
        })
    }

    /// Locks asset `id` of `registry` in `vault` and mints `total_shares` to the admin.
    pub fn fractionalize(
        &mut self,
        caller: Address,
        vault: Address,
        registry: Address,
        id: AssetId,
        total_shares: u128,
    ) -> Result<(), ChainError> {
        self.transact(caller, |state| {
            let WorldState {
                vaults,
                registries,
                events,
                ..
            } = state;
            vaults
                .get_mut(&vault)
                .ok_or(ChainError::UnknownVault(vault))?
                .fractionalize(caller, registry, id, total_shares, registries, events)?;
            Ok(())
        })
    }

    /// Lists `vault`'s asset at `price`.
    pub fn list_for_sale(
        &mut self,
        caller: Address,
        vault: Address,
        price: u128,
    ) -> Result<(), ChainError> {
        self.transact(caller, |state| {
            let WorldState { vaults, events, .. } = state;
            vaults
                .get_mut(&vault)
                .ok_or(ChainError::UnknownVault(vault))?
                .list_for_sale(caller, price, events)?;
            Ok(())
        })
    }

    /// Buys `vault`'s asset, attaching `value` native units as payment.
    ///
    /// The payment moves into the vault before the vault runs; if the vault
    /// rejects the purchase the payment is returned with everything else.
    pub fn buy(&mut self, caller: Address, vault: Address, value: u128) -> Result<(), ChainError> {
        self.transact(caller, |state| {
            if !state.vaults.contains_key(&vault) {
                return Err(ChainError::UnknownVault(vault));
            }
            let WorldState {
                native,
                vaults,
                registries,
                events,
                ..
            } = state;
            native.transfer(caller, vault, value, events)?;
            vaults
                .get_mut(&vault)
                .ok_or(ChainError::UnknownVault(vault))?
                .buy(caller, value, registries, events)?;
            Ok(())
        })
    }

    /// Burns `amount` of `caller`'s shares in `vault` for their slice of the
    /// proceeds. Returns the native amount paid out.
    pub fn withdraw_proceeds(
        &mut self,
        caller: Address,
        vault: Address,
        amount: u128,
    ) -> Result<u128, ChainError> {
        self.transact(caller, |state| {
            let WorldState {
                native,
                vaults,
                events,
                ..
            } = state;
            let payout = vaults
                .get_mut(&vault)
                .ok_or(ChainError::UnknownVault(vault))?
                .withdraw_proceeds(caller, amount, native, events)?;
            Ok(payout)
        })
    }

    /// Transfers `amount` of `caller`'s shares in `vault` to `to`.
    pub fn transfer_shares(
        &mut self,
        caller: Address,
        vault: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), ChainError> {
        self.transact(caller, |state| {
            let WorldState { vaults, events, .. } = state;
            vaults
                .get_mut(&vault)
                .ok_or(ChainError::UnknownVault(vault))?
                .transfer(caller, to, amount, events)?;
            Ok(())
        })
    }

    /// Sets `spender`'s allowance over `caller`'s shares in `vault`.
    pub fn approve_shares(
        &mut self,
        caller: Address,
        vault: Address,
        spender: Address,
        amount: u128,
    ) -> Result<(), ChainError> {
        self.transact(caller, |state| {
            let WorldState { vaults, events, .. } = state;
            vaults
                .get_mut(&vault)
                .ok_or(ChainError::UnknownVault(vault))?
                .approve(caller, spender, amount, events)?;
            Ok(())
        })
    }

    /// Moves `amount` of `from`'s shares in `vault` to `to`, spending `caller`'s allowance.
    pub fn transfer_shares_from(
        &mut self,
        caller: Address,
        vault: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), ChainError> {
        self.transact(caller, |state| {
            let WorldState { vaults, events, .. } = state;
            vaults
                .get_mut(&vault)
                .ok_or(ChainError::UnknownVault(vault))?
                .transfer_from(caller, from, to, amount, events)?;
            Ok(())
        })
    }

    /// The vault at `address`.
    pub fn vault(&self, address: &Address) -> Result<&Vault, ChainError> {
        self.state
            .vaults
            .get(address)
            .ok_or(ChainError::UnknownVault(*address))
    }

    /// Shares of `vault` held by `holder`.
    pub fn share_balance(&self, vault: &Address, holder: &Address) -> Result<u128, ChainError> {
        Ok(self.vault(vault)?.balance_of(holder))
    }

    /// Every event emitted by a successful call, in order.
    pub fn events(&self) -> &[Event] {
        self.state.events.all()
    }
}
