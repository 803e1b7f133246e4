//! # Non-Fungible Asset Registry
//!
//! A standard non-fungible registry: every asset id has exactly one owner,
//! owners can approve a single address per asset or an operator for all of
//! their assets, and `transfer_from` moves an asset when the caller is
//! allowed to.
//!
//! Vaults never reach into a registry's fields. They go through the
//! [`NonFungibleRegistry`] trait, which [`RegistrySet`] implements for every
//! registry deployed on the chain.
//!
//! ## Authorization rules for `transfer_from(operator, from, to, id)`
//!
//! 1. `operator` must be the owner, the asset's approved address, or an
//!    approved operator of the owner. Otherwise [`RegistryError::AssetNotApproved`].
//! 2. `from` must be the current owner. Otherwise [`RegistryError::NotOwner`].
//! 3. `to` must not be the zero address.
//!
//! A successful transfer clears the asset's single-address approval.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::event::{Event, EventLog};
use crate::identity::Address;

/// Identifier of an asset within one registry.
pub type AssetId = u128;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by a non-fungible registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No registry is deployed at this address.
    #[error("no asset registry at {0}")]
    UnknownRegistry(Address),

    /// The asset id has never been minted.
    #[error("asset {0} does not exist")]
    NonexistentAsset(AssetId),

    /// The asset id is already taken.
    #[error("asset {0} already minted")]
    AlreadyMinted(AssetId),

    /// Only the registry's minter can create assets.
    #[error("{caller} is not the minter of this registry")]
    NotMinter {
        /// Address that tried to mint.
        caller: Address,
    },

    /// The caller is neither owner nor approved for the asset.
    #[error("caller {operator} is not asset owner or approved for asset {id}")]
    AssetNotApproved {
        /// Address attempting the operation.
        operator: Address,
        /// Asset it tried to touch.
        id: AssetId,
    },

    /// `from` is not the current owner of the asset.
    #[error("transfer of asset {id} from incorrect owner {from}")]
    NotOwner {
        /// Claimed owner.
        from: Address,
        /// Asset being moved.
        id: AssetId,
    },

    /// Assets cannot be sent to or minted for the zero address.
    #[error("asset transfer to the zero address")]
    TransferToZero,

    /// An owner cannot approve the asset to themselves.
    #[error("approval to current owner {0}")]
    ApprovalToCurrentOwner(Address),

    /// An owner cannot make themselves their own operator.
    #[error("{0} cannot approve itself as operator")]
    ApproveToCaller(Address),
}

// ---------------------------------------------------------------------------
// AssetRegistry
// ---------------------------------------------------------------------------

/// One deployed collection of non-fungible assets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRegistry {
    /// Address this registry lives at.
    pub address: Address,
    /// Collection name.
    pub name: String,
    /// Collection symbol.
    pub symbol: String,
    /// Account allowed to mint. The deployer.
    pub minter: Address,
    /// Deployment time.
    pub created_at: DateTime<Utc>,
    owners: HashMap<AssetId, Address>,
    balances: HashMap<Address, u64>,
    token_approvals: HashMap<AssetId, Address>,
    operator_approvals: HashMap<Address, HashSet<Address>>,
}

impl AssetRegistry {
    /// Creates an empty registry at `address`, mintable by `minter`.
    pub fn new(address: Address, name: String, symbol: String, minter: Address) -> Self {
        Self {
            address,
            name,
            symbol,
            minter,
            created_at: Utc::now(),
            owners: HashMap::new(),
            balances: HashMap::new(),
            token_approvals: HashMap::new(),
            operator_approvals: HashMap::new(),
        }
    }

    /// Mints asset `id` to `to`.
    pub fn mint(
        &mut self,
        caller: Address,
        to: Address,
        id: AssetId,
        events: &mut EventLog,
    ) -> Result<(), RegistryError> {
        if caller != self.minter {
            return Err(RegistryError::NotMinter { caller });
        }
        if to.is_zero() {
            return Err(RegistryError::TransferToZero);
        }
        if self.owners.contains_key(&id) {
            return Err(RegistryError::AlreadyMinted(id));
        }

        self.owners.insert(id, to);
        *self.balances.entry(to).or_insert(0) += 1;

        events.emit(Event::AssetTransfer {
            registry: self.address,
            from: Address::ZERO,
            to,
            id,
        });
        tracing::debug!(registry = %self.address, %to, id, "asset minted");
        Ok(())
    }

    /// Current owner of `id`.
    pub fn owner_of(&self, id: AssetId) -> Result<Address, RegistryError> {
        self.owners
            .get(&id)
            .copied()
            .ok_or(RegistryError::NonexistentAsset(id))
    }

    /// Number of assets held by `owner`.
    pub fn balance_of(&self, owner: &Address) -> u64 {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    /// Address approved for `id`, if any.
    pub fn get_approved(&self, id: AssetId) -> Result<Option<Address>, RegistryError> {
        self.owner_of(id)?;
        Ok(self.token_approvals.get(&id).copied())
    }

    /// Whether `operator` may move every asset of `owner`.
    pub fn is_approved_for_all(&self, owner: &Address, operator: &Address) -> bool {
        self.operator_approvals
            .get(owner)
            .map(|ops| ops.contains(operator))
            .unwrap_or(false)
    }

    /// Approves `to` to transfer asset `id`. Passing the zero address clears
    /// the approval.
    pub fn approve(
        &mut self,
        caller: Address,
        to: Address,
        id: AssetId,
        events: &mut EventLog,
    ) -> Result<(), RegistryError> {
        let owner = self.owner_of(id)?;
        if to == owner {
            return Err(RegistryError::ApprovalToCurrentOwner(owner));
        }
        if caller != owner && !self.is_approved_for_all(&owner, &caller) {
            return Err(RegistryError::AssetNotApproved { operator: caller, id });
        }

        if to.is_zero() {
            self.token_approvals.remove(&id);
        } else {
            self.token_approvals.insert(id, to);
        }

        events.emit(Event::AssetApproval {
            registry: self.address,
            owner,
            approved: to,
            id,
        });
        Ok(())
    }

    /// Grants or revokes `operator` over all of `caller`'s assets.
    pub fn set_approval_for_all(
        &mut self,
        caller: Address,
        operator: Address,
        approved: bool,
        events: &mut EventLog,
    ) -> Result<(), RegistryError> {
        if caller == operator {
            return Err(RegistryError::ApproveToCaller(caller));
        }

        let operators = self.operator_approvals.entry(caller).or_default();
        if approved {
            operators.insert(operator);
        } else {
            operators.remove(&operator);
        }

        events.emit(Event::ApprovalForAll {
            registry: self.address,
            owner: caller,
            operator,
            approved,
        });
        tracing::debug!(registry = %self.address, owner = %caller, %operator, approved, "operator approval");
        Ok(())
    }

    /// Moves asset `id` from `from` to `to` on behalf of `operator`.
    ///
    /// See the module docs for the authorization rules.
    pub fn transfer_from(
        &mut self,
        operator: Address,
        from: Address,
        to: Address,
        id: AssetId,
        events: &mut EventLog,
    ) -> Result<(), RegistryError> {
        let owner = self.owner_of(id)?;

        let approved = operator == owner
            || self.token_approvals.get(&id) == Some(&operator)
            || self.is_approved_for_all(&owner, &operator);
        if !approved {
            return Err(RegistryError::AssetNotApproved { operator, id });
        }
        if from != owner {
            return Err(RegistryError::NotOwner { from, id });
        }
        if to.is_zero() {
            return Err(RegistryError::TransferToZero);
        }

        self.token_approvals.remove(&id);
        if let Some(count) = self.balances.get_mut(&from) {
            *count = count.saturating_sub(1);
        }
        *self.balances.entry(to).or_insert(0) += 1;
        self.owners.insert(id, to);

        events.emit(Event::AssetTransfer {
            registry: self.address,
            from,
            to,
            id,
        });
        tracing::debug!(registry = %self.address, %from, %to, id, "asset transferred");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// NonFungibleRegistry
// ---------------------------------------------------------------------------

/// What a vault needs from the outside world to hold and release an asset.
///
/// Calls are addressed by registry address, so a single implementation can
/// serve every collection on the chain.
pub trait NonFungibleRegistry {
    /// Current owner of `id` in `registry`.
    fn owner_of(&self, registry: &Address, id: AssetId) -> Result<Address, RegistryError>;

    /// Moves `id` in `registry` from `from` to `to`, with `operator` as the caller.
    fn transfer_from(
        &mut self,
        registry: &Address,
        operator: Address,
        from: Address,
        to: Address,
        id: AssetId,
        events: &mut EventLog,
    ) -> Result<(), RegistryError>;
}

/// Every asset registry deployed on the chain, keyed by address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySet {
    registries: HashMap<Address, AssetRegistry>,
}

impl RegistrySet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a freshly deployed registry.
    pub fn insert(&mut self, registry: AssetRegistry) {
        self.registries.insert(registry.address, registry);
    }

    /// Registry at `address`.
    pub fn get(&self, address: &Address) -> Result<&AssetRegistry, RegistryError> {
        self.registries
            .get(address)
            .ok_or(RegistryError::UnknownRegistry(*address))
    }

    /// Mutable registry at `address`.
    pub fn get_mut(&mut self, address: &Address) -> Result<&mut AssetRegistry, RegistryError> {
        self.registries
            .get_mut(address)
            .ok_or(RegistryError::UnknownRegistry(*address))
    }

    /// Returns `true` if a registry is deployed at `address`.
    pub fn contains(&self, address: &Address) -> bool {
        self.registries.contains_key(address)
    }

    /// Number of deployed registries.
    pub fn len(&self) -> usize {
        self.registries.len()
    }

    /// Returns `true` if no registry has been deployed.
    pub fn is_empty(&self) -> bool {
        self.registries.is_empty()
    }
}

impl NonFungibleRegistry for RegistrySet {
    fn owner_of(&self, registry: &Address, id: AssetId) -> Result<Address, RegistryError> {
        self.get(registry)?.owner_of(id)
    }

    fn transfer_from(
        &mut self,
        registry: &Address,
        operator: Address,
        from: Address,
        to: Address,
        id: AssetId,
        events: &mut EventLog,
    ) -> Result<(), RegistryError> {
        self.get_mut(registry)?
            .transfer_from(operator, from, to, id, events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(label: &str) -> Address {
        Address::from_label(label)
    }

    fn registry_with_asset(owner: Address, id: AssetId) -> AssetRegistry {
        let mut events = EventLog::new();
        let mut registry = AssetRegistry::new(
            addr("registry"),
            "Valuable NFT".into(),
            "NFT".into(),
            addr("minter"),
        );
        registry.mint(addr("minter"), owner, id, &mut events).unwrap();
        registry
    }

    #[test]
    fn mint_assigns_owner() {
        let registry = registry_with_asset(addr("collector"), 1);
        assert_eq!(registry.owner_of(1).unwrap(), addr("collector"));
        assert_eq!(registry.balance_of(&addr("collector")), 1);
    }

    #[test]
    fn only_minter_can_mint() {
        let mut registry = registry_with_asset(addr("collector"), 1);
        let err = registry
            .mint(addr("collector"), addr("collector"), 2, &mut EventLog::new())
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::NotMinter {
                caller: addr("collector")
            }
        );
    }

    #[test]
    fn duplicate_mint_rejected() {
        let mut registry = registry_with_asset(addr("collector"), 1);
        let err = registry
            .mint(addr("minter"), addr("other"), 1, &mut EventLog::new())
            .unwrap_err();
        assert_eq!(err, RegistryError::AlreadyMinted(1));
    }

    #[test]
    fn owner_of_unknown_asset_fails() {
        let registry = registry_with_asset(addr("collector"), 1);
        assert_eq!(
            registry.owner_of(42).unwrap_err(),
            RegistryError::NonexistentAsset(42)
        );
    }

    #[test]
    fn owner_can_transfer() {
        let mut registry = registry_with_asset(addr("collector"), 1);
        registry
            .transfer_from(
                addr("collector"),
                addr("collector"),
                addr("buyer"),
                1,
                &mut EventLog::new(),
            )
            .unwrap();
        assert_eq!(registry.owner_of(1).unwrap(), addr("buyer"));
        assert_eq!(registry.balance_of(&addr("collector")), 0);
        assert_eq!(registry.balance_of(&addr("buyer")), 1);
    }

    #[test]
    fn unapproved_operator_rejected() {
        let mut registry = registry_with_asset(addr("collector"), 1);
        let err = registry
            .transfer_from(
                addr("vault"),
                addr("collector"),
                addr("vault"),
                1,
                &mut EventLog::new(),
            )
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::AssetNotApproved {
                operator: addr("vault"),
                id: 1
            }
        );
    }

    #[test]
    fn operator_approval_allows_transfer() {
        let mut registry = registry_with_asset(addr("collector"), 1);
        let mut events = EventLog::new();
        registry
            .set_approval_for_all(addr("collector"), addr("vault"), true, &mut events)
            .unwrap();
        assert!(registry.is_approved_for_all(&addr("collector"), &addr("vault")));
        registry
            .transfer_from(
                addr("vault"),
                addr("collector"),
                addr("vault"),
                1,
                &mut events,
            )
            .unwrap();
        assert_eq!(registry.owner_of(1).unwrap(), addr("vault"));
    }

    #[test]
    fn revoked_operator_rejected() {
        let mut registry = registry_with_asset(addr("collector"), 1);
        let mut events = EventLog::new();
        registry
            .set_approval_for_all(addr("collector"), addr("vault"), true, &mut events)
            .unwrap();
        registry
            .set_approval_for_all(addr("collector"), addr("vault"), false, &mut events)
            .unwrap();
        assert!(registry
            .transfer_from(addr("vault"), addr("collector"), addr("vault"), 1, &mut events)
            .is_err());
    }

    #[test]
    fn approval_by_non_owner_does_not_cover_owner_assets() {
        // Operator approval granted by someone who doesn't own the asset.
        let mut registry = registry_with_asset(addr("collector"), 1);
        let mut events = EventLog::new();
        registry
            .set_approval_for_all(addr("minter"), addr("vault"), true, &mut events)
            .unwrap();
        let err = registry
            .transfer_from(addr("vault"), addr("collector"), addr("vault"), 1, &mut events)
            .unwrap_err();
        assert!(matches!(err, RegistryError::AssetNotApproved { .. }));
    }

    #[test]
    fn wrong_from_rejected() {
        let mut registry = registry_with_asset(addr("collector"), 1);
        let err = registry
            .transfer_from(
                addr("collector"),
                addr("someone"),
                addr("buyer"),
                1,
                &mut EventLog::new(),
            )
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::NotOwner {
                from: addr("someone"),
                id: 1
            }
        );
    }

    #[test]
    fn single_approval_is_cleared_after_transfer() {
        let mut registry = registry_with_asset(addr("collector"), 1);
        let mut events = EventLog::new();
        registry
            .approve(addr("collector"), addr("spender"), 1, &mut events)
            .unwrap();
        assert_eq!(registry.get_approved(1).unwrap(), Some(addr("spender")));
        registry
            .transfer_from(addr("spender"), addr("collector"), addr("buyer"), 1, &mut events)
            .unwrap();
        assert_eq!(registry.get_approved(1).unwrap(), None);
    }

    #[test]
    fn approve_to_owner_rejected() {
        let mut registry = registry_with_asset(addr("collector"), 1);
        let err = registry
            .approve(addr("collector"), addr("collector"), 1, &mut EventLog::new())
            .unwrap_err();
        assert_eq!(err, RegistryError::ApprovalToCurrentOwner(addr("collector")));
    }

    #[test]
    fn self_operator_rejected() {
        let mut registry = registry_with_asset(addr("collector"), 1);
        let err = registry
            .set_approval_for_all(addr("collector"), addr("collector"), true, &mut EventLog::new())
            .unwrap_err();
        assert_eq!(err, RegistryError::ApproveToCaller(addr("collector")));
    }

    #[test]
    fn registry_set_routes_by_address() {
        let mut set = RegistrySet::new();
        set.insert(registry_with_asset(addr("collector"), 1));
        assert_eq!(
            NonFungibleRegistry::owner_of(&set, &addr("registry"), 1).unwrap(),
            addr("collector")
        );
        assert_eq!(
            NonFungibleRegistry::owner_of(&set, &addr("missing"), 1).unwrap_err(),
            RegistryError::UnknownRegistry(addr("missing"))
        );
    }
}
