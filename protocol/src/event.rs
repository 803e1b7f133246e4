//! # Events
//!
//! Every state change on the ledger leaves an [`Event`] behind. Events are
//! journaled in an [`EventLog`] owned by the world state, so when a call is
//! rolled back its events disappear with everything else it did.

use serde::{Deserialize, Serialize};

use crate::identity::Address;
use crate::registry::AssetId;

/// A single ledger event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    /// A contract was deployed.
    Deployed {
        /// Address of the new contract.
        contract: Address,
        /// Account that deployed it.
        deployer: Address,
    },

    /// Native currency moved between two addresses.
    NativeTransfer {
        /// Sender.
        from: Address,
        /// Recipient.
        to: Address,
        /// Amount in base units.
        amount: u128,
    },

    /// A non-fungible asset changed owner. `from` is zero on mint.
    AssetTransfer {
        /// Registry the asset belongs to.
        registry: Address,
        /// Previous owner.
        from: Address,
        /// New owner.
        to: Address,
        /// Asset identifier.
        id: AssetId,
    },

    /// A single-asset approval was set (zero address clears it).
    AssetApproval {
        /// Registry the asset belongs to.
        registry: Address,
        /// Current owner of the asset.
        owner: Address,
        /// Approved address.
        approved: Address,
        /// Asset identifier.
        id: AssetId,
    },

    /// An operator approval over all of an owner's assets changed.
    ApprovalForAll {
        /// Registry the approval applies to.
        registry: Address,
        /// Asset owner.
        owner: Address,
        /// Operator being approved or revoked.
        operator: Address,
        /// New approval state.
        approved: bool,
    },

    /// Shares moved. `from` is zero on mint, `to` is zero on burn.
    ShareTransfer {
        /// Vault whose shares moved.
        vault: Address,
        /// Sender.
        from: Address,
        /// Recipient.
        to: Address,
        /// Share quantity.
        amount: u128,
    },

    /// A share allowance was set.
    ShareApproval {
        /// Vault whose shares are approved.
        vault: Address,
        /// Share owner.
        owner: Address,
        /// Approved spender.
        spender: Address,
        /// New allowance.
        amount: u128,
    },

    /// The locked asset was put up for sale.
    Listed {
        /// Vault holding the asset.
        vault: Address,
        /// Asking price in native base units.
        price: u128,
    },

    /// The locked asset was bought out of the vault.
    Purchased {
        /// Vault that held the asset.
        vault: Address,
        /// Buyer and new owner.
        buyer: Address,
        /// Price paid.
        price: u128,
    },

    /// A holder burned shares for their slice of the proceeds.
    ProceedsWithdrawn {
        /// Vault paying out.
        vault: Address,
        /// Shareholder.
        holder: Address,
        /// Shares burned.
        shares: u128,
        /// Native amount paid.
        payout: u128,
    },
}

/// Append-only list of events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one event.
    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Number of events recorded.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// All events in emission order.
    pub fn all(&self) -> &[Event] {
        &self.events
    }

    /// Events recorded at or after position `start`.
    pub fn since(&self, start: usize) -> &[Event] {
        self.events.get(start..).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn since_returns_tail() {
        let mut log = EventLog::new();
        let a = Address::from_label("a");
        let b = Address::from_label("b");
        log.emit(Event::NativeTransfer {
            from: a,
            to: b,
            amount: 1,
        });
        log.emit(Event::NativeTransfer {
            from: b,
            to: a,
            amount: 2,
        });
        assert_eq!(log.len(), 2);
        assert_eq!(log.since(1).len(), 1);
        assert!(log.since(5).is_empty());
    }

    #[test]
    fn events_serialize_with_snake_case_variant() {
        let event = Event::Listed {
            vault: Address::from_label("vault"),
            price: 100,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["listed"]["price"], 100);
    }
}
