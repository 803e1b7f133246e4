//! # Fractional Ownership Vault
//!
//! Locks a single non-fungible asset, splits it into fungible shares, sells
//! it once, and pays shareholders out of the sale proceeds. The lifecycle is:
//!
//! 1. **Deploy** — the deployer becomes the admin; no asset, no shares.
//! 2. **Fractionalize** — the admin moves the asset into the vault and the
//!    full share supply is minted to the admin.
//! 3. **List** — the admin posts an asking price.
//! 4. **Buy** — anyone pays exactly the asking price and receives the asset.
//!    The payment stays in the vault as escrowed proceeds.
//! 5. **Withdraw** — any shareholder burns shares for
//!    `shares * price / minted_supply` of the proceeds, as often as their
//!    balance allows.
//!
//! ## Gating
//!
//! Buying and withdrawing are both gated on "fractionalized and listed".
//! Before a buy the vault holds no proceeds, so any non-zero payout fails on
//! insufficient escrow. A zero payout before a buy is refused outright
//! rather than burning shares for nothing.
//! A second buy is not blocked by a flag. The vault no longer owns
//! the asset, so the registry refuses the transfer.
//!
//! ## Atomicity
//!
//! Each operation checks everything it can before mutating. The registry
//! transfer in `fractionalize` and `buy` happens before local state changes,
//! and the [`Chain`](crate::chain::Chain) runtime rolls back the whole world
//! state if anything after it fails.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uint::construct_uint;

use shard_protocol::{
    Address, AssetId, Event, EventLog, NativeError, NativeLedger, NonFungibleRegistry,
    RegistryError,
};

use crate::access::{AccessError, AdminRole};
use crate::share_ledger::{ShareError, ShareLedger};

construct_uint! {
    /// 256-bit unsigned integer for payout arithmetic.
    struct U256(4);
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during vault operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    /// The caller is not the vault admin.
    #[error("caller {caller} is not an admin")]
    NotAuthorized {
        /// Address that made the call.
        caller: Address,
    },

    /// The vault already holds an asset.
    #[error("asset already fractionalized")]
    AlreadyFractionalized,

    /// A vault cannot be fractionalized into zero shares.
    #[error("share supply must be greater than zero")]
    ZeroShareSupply,

    /// Listing requires a fractionalized, not yet listed vault.
    #[error("unable to list asset: vault is {phase}")]
    ListingNotAllowed {
        /// The vault's phase at the time of the call.
        phase: VaultPhase,
    },

    /// Buying requires a fractionalized, listed vault.
    #[error("unable to buy asset: vault is {phase}")]
    PurchaseNotAllowed {
        /// The vault's phase at the time of the call.
        phase: VaultPhase,
    },

    /// The payment does not match the asking price exactly.
    #[error("payment of {sent} does not match sale price {price}")]
    IncorrectPaymentAmount {
        /// Amount attached to the call.
        sent: u128,
        /// Listed price.
        price: u128,
    },

    /// Withdrawing requires a fractionalized, listed vault.
    #[error("cannot withdraw proceeds: vault is {phase}")]
    WithdrawalNotAllowed {
        /// The vault's phase at the time of the call.
        phase: VaultPhase,
    },

    /// The withdrawal amount is zero or not below the minted supply.
    #[error("amount {amount} must be greater than 0 and less than total supply {supply}")]
    InvalidAmount {
        /// Requested share amount.
        amount: u128,
        /// Share supply minted at fractionalization.
        supply: u128,
    },

    /// The caller holds fewer shares than they want to redeem.
    #[error("insufficient balance: holder has {balance}, requested {amount}")]
    InsufficientBalance {
        /// Caller's share balance.
        balance: u128,
        /// Requested share amount.
        amount: u128,
    },

    /// The payout computation does not fit in `u128`.
    #[error("proceeds arithmetic overflow")]
    ArithmeticOverflow,

    /// The asset registry refused the operation.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Moving native currency failed.
    #[error(transparent)]
    Native(#[from] NativeError),

    /// The share ledger refused the operation.
    #[error(transparent)]
    Share(#[from] ShareError),
}

impl From<AccessError> for VaultError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::NotAuthorized { caller } => VaultError::NotAuthorized { caller },
        }
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Where a vault is in its lifecycle.
///
/// Phases only move forward. `Listed` and `Sold` both report
/// `is_for_sale() == true`; the sale never clears the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VaultPhase {
    /// Deployed, no asset locked.
    Open,
    /// Asset locked, shares minted.
    Fractionalized,
    /// Asking price posted.
    Listed,
    /// Asset bought; proceeds in escrow.
    Sold,
}

impl std::fmt::Display for VaultPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VaultPhase::Open => write!(f, "Open"),
            VaultPhase::Fractionalized => write!(f, "Fractionalized"),
            VaultPhase::Listed => write!(f, "Listed"),
            VaultPhase::Sold => write!(f, "Sold"),
        }
    }
}

/// The asset a vault holds (or held, after a sale).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedAsset {
    /// Registry the asset belongs to.
    pub registry: Address,
    /// Asset identifier within the registry.
    pub id: AssetId,
}

/// A fractional ownership vault for one non-fungible asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    /// Address of this vault. Also the address of its share token.
    pub address: Address,
    role: AdminRole,
    phase: VaultPhase,
    locked_asset: Option<LockedAsset>,
    sale_price: u128,
    minted_supply: u128,
    buyer: Option<Address>,
    shares: ShareLedger,
    /// Deployment time.
    pub created_at: DateTime<Utc>,
    /// Time of the most recent state change.
    pub updated_at: DateTime<Utc>,
}

impl Vault {
    /// Deploys a vault at `address` administered by `admin`.
    ///
    /// `name` and `symbol` describe the share token and carry no behavior.
    pub fn new(address: Address, admin: Address, name: String, symbol: String) -> Self {
        let now = Utc::now();
        Self {
            address,
            role: AdminRole::new(admin),
            phase: VaultPhase::Open,
            locked_asset: None,
            sale_price: 0,
            minted_supply: 0,
            buyer: None,
            shares: ShareLedger::new(name, symbol),
            created_at: now,
            updated_at: now,
        }
    }

    // -- Queries -------------------------------------------------------------

    /// The admin address.
    pub fn admin(&self) -> Address {
        self.role.admin()
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> VaultPhase {
        self.phase
    }

    /// `true` once an asset has been locked and shares minted. Never reset.
    pub fn is_fractionalized(&self) -> bool {
        self.phase >= VaultPhase::Fractionalized
    }

    /// `true` once a price has been posted. Stays `true` after the sale.
    pub fn is_for_sale(&self) -> bool {
        self.phase >= VaultPhase::Listed
    }

    /// `true` once the asset has been bought.
    pub fn is_sold(&self) -> bool {
        self.phase == VaultPhase::Sold
    }

    /// Listed price in native base units; zero until listed.
    pub fn sale_price(&self) -> u128 {
        self.sale_price
    }

    /// The locked asset, `None` before fractionalization.
    pub fn locked_asset(&self) -> Option<LockedAsset> {
        self.locked_asset
    }

    /// Who bought the asset, if anyone has.
    pub fn buyer(&self) -> Option<Address> {
        self.buyer
    }

    /// Share supply minted at fractionalization. Never changes afterwards and
    /// is the denominator of every payout.
    pub fn minted_supply(&self) -> u128 {
        self.minted_supply
    }

    /// Shares still in circulation.
    pub fn total_supply(&self) -> u128 {
        self.shares.total_supply()
    }

    /// Shares held by `holder`.
    pub fn balance_of(&self, holder: &Address) -> u128 {
        self.shares.balance_of(holder)
    }

    /// Remaining share allowance of `spender` over `owner`.
    pub fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.shares.allowance(owner, spender)
    }

    /// The share token ledger.
    pub fn shares(&self) -> &ShareLedger {
        &self.shares
    }

    /// Native amount `amount` shares redeem for: `amount * price / minted_supply`,
    /// rounded down. Zero before fractionalization.
    pub fn quote_proceeds(&self, amount: u128) -> Result<u128, VaultError> {
        if self.minted_supply == 0 {
            return Ok(0);
        }
        let payout = U256::from(amount)
            .checked_mul(U256::from(self.sale_price))
            .ok_or(VaultError::ArithmeticOverflow)?
            / U256::from(self.minted_supply);
        if payout > U256::from(u128::MAX) {
            return Err(VaultError::ArithmeticOverflow);
        }
        Ok(payout.as_u128())
    }

    // -- Operations ----------------------------------------------------------

    /// Locks asset `id` of `registry` in the vault and mints `total_shares`
    /// to the admin.
    ///
    /// The vault calls the registry's `transfer_from(admin → vault)` as the
    /// operator, so the admin must have approved the vault beforehand.
    ///
    /// # Errors
    ///
    /// - [`VaultError::NotAuthorized`] if `caller` is not the admin.
    /// - [`VaultError::AlreadyFractionalized`] on a second call.
    /// - [`VaultError::ZeroShareSupply`] if `total_shares` is zero.
    /// - [`VaultError::Registry`] if the registry refuses the transfer.
    pub fn fractionalize<R: NonFungibleRegistry + ?Sized>(
        &mut self,
        caller: Address,
        registry: Address,
        id: AssetId,
        total_shares: u128,
        registries: &mut R,
        events: &mut EventLog,
    ) -> Result<(), VaultError> {
        self.role.ensure(&caller)?;
        if self.is_fractionalized() {
            return Err(VaultError::AlreadyFractionalized);
        }
        if total_shares == 0 {
            return Err(VaultError::ZeroShareSupply);
        }

        registries.transfer_from(&registry, self.address, caller, self.address, id, events)?;
        self.shares.mint(self.address, caller, total_shares, events)?;

        self.locked_asset = Some(LockedAsset { registry, id });
        self.minted_supply = total_shares;
        self.phase = VaultPhase::Fractionalized;
        self.updated_at = Utc::now();

        tracing::info!(
            vault = %self.address,
            %registry,
            id,
            total_shares,
            "asset fractionalized"
        );
        Ok(())
    }

    /// Posts an asking price for the locked asset.
    ///
    /// # Errors
    ///
    /// - [`VaultError::NotAuthorized`] if `caller` is not the admin.
    /// - [`VaultError::ListingNotAllowed`] before fractionalization or once listed.
    pub fn list_for_sale(
        &mut self,
        caller: Address,
        price: u128,
        events: &mut EventLog,
    ) -> Result<(), VaultError> {
        self.role.ensure(&caller)?;
        if self.phase != VaultPhase::Fractionalized {
            return Err(VaultError::ListingNotAllowed { phase: self.phase });
        }

        self.sale_price = price;
        self.phase = VaultPhase::Listed;
        self.updated_at = Utc::now();

        events.emit(Event::Listed {
            vault: self.address,
            price,
        });
        tracing::info!(vault = %self.address, price, "asset listed for sale");
        Ok(())
    }

    /// Sells the locked asset to `caller`, who attached `payment`.
    ///
    /// The payment must already sit in the vault's native balance; the
    /// runtime moves it there before calling this and takes it back if this
    /// fails.
    ///
    /// # Errors
    ///
    /// - [`VaultError::PurchaseNotAllowed`] unless fractionalized and listed.
    /// - [`VaultError::IncorrectPaymentAmount`] if `payment != sale_price`.
    /// - [`VaultError::Registry`] if the vault no longer holds the asset.
    pub fn buy<R: NonFungibleRegistry + ?Sized>(
        &mut self,
        caller: Address,
        payment: u128,
        registries: &mut R,
        events: &mut EventLog,
    ) -> Result<(), VaultError> {
        if !self.is_fractionalized() || !self.is_for_sale() {
            return Err(VaultError::PurchaseNotAllowed { phase: self.phase });
        }
        if payment != self.sale_price {
            return Err(VaultError::IncorrectPaymentAmount {
                sent: payment,
                price: self.sale_price,
            });
        }
        let asset = self
            .locked_asset
            .ok_or(VaultError::PurchaseNotAllowed { phase: self.phase })?;

        registries.transfer_from(
            &asset.registry,
            self.address,
            self.address,
            caller,
            asset.id,
            events,
        )?;

        self.buyer = Some(caller);
        self.phase = VaultPhase::Sold;
        self.updated_at = Utc::now();

        events.emit(Event::Purchased {
            vault: self.address,
            buyer: caller,
            price: payment,
        });
        tracing::info!(vault = %self.address, buyer = %caller, price = payment, "asset purchased");
        Ok(())
    }

    /// Burns `amount` of `caller`'s shares and pays out their slice of the
    /// proceeds. Returns the native amount paid.
    ///
    /// # Errors
    ///
    /// - [`VaultError::WithdrawalNotAllowed`] unless fractionalized and listed,
    ///   or if the asset is unsold and the payout would be zero.
    /// - [`VaultError::InvalidAmount`] unless `0 < amount < minted_supply`.
    /// - [`VaultError::InsufficientBalance`] if `caller` holds fewer than `amount`.
    /// - [`VaultError::Native`] if the escrow cannot cover the payout.
    pub fn withdraw_proceeds(
        &mut self,
        caller: Address,
        amount: u128,
        native: &mut NativeLedger,
        events: &mut EventLog,
    ) -> Result<u128, VaultError> {
        if !self.is_fractionalized() || !self.is_for_sale() {
            return Err(VaultError::WithdrawalNotAllowed { phase: self.phase });
        }
        // Bounded by the minted supply, not the circulating one: every share
        // redeems for price / minted_supply no matter how many were burned.
        if amount == 0 || amount >= self.minted_supply {
            return Err(VaultError::InvalidAmount {
                amount,
                supply: self.minted_supply,
            });
        }
        let balance = self.shares.balance_of(&caller);
        if balance < amount {
            return Err(VaultError::InsufficientBalance { balance, amount });
        }

        let payout = self.quote_proceeds(amount)?;
        if payout == 0 && !self.is_sold() {
            return Err(VaultError::WithdrawalNotAllowed { phase: self.phase });
        }
        let escrow = native.balance_of(&self.address);
        if escrow < payout {
            return Err(NativeError::InsufficientFunds {
                account: self.address,
                available: escrow,
                requested: payout,
            }
            .into());
        }

        self.shares.burn(self.address, caller, amount, events)?;
        native.transfer(self.address, caller, payout, events)?;
        self.updated_at = Utc::now();

        events.emit(Event::ProceedsWithdrawn {
            vault: self.address,
            holder: caller,
            shares: amount,
            payout,
        });
        tracing::info!(vault = %self.address, holder = %caller, shares = amount, payout, "proceeds withdrawn");
        Ok(payout)
    }

    // -- Share token ---------------------------------------------------------

    /// Transfers `amount` shares from `caller` to `to`.
    pub fn transfer(
        &mut self,
        caller: Address,
        to: Address,
        amount: u128,
        events: &mut EventLog,
    ) -> Result<(), VaultError> {
        self.shares.transfer(self.address, caller, to, amount, events)?;
        Ok(())
    }

    /// Sets `spender`'s allowance over `caller`'s shares.
    pub fn approve(
        &mut self,
        caller: Address,
        spender: Address,
        amount: u128,
        events: &mut EventLog,
    ) -> Result<(), VaultError> {
        self.shares.approve(self.address, caller, spender, amount, events)?;
        Ok(())
    }

    /// Moves `amount` of `from`'s shares to `to`, spending `caller`'s allowance.
    pub fn transfer_from(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        amount: u128,
        events: &mut EventLog,
    ) -> Result<(), VaultError> {
        self.shares
            .transfer_from(self.address, caller, from, to, amount, events)?;
        Ok(())
    }
}
