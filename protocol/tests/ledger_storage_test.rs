//! Integration tests across the protocol primitives.
//!
//! Registries, the native ledger, and the event log are composed the way
//! the runtime composes them, then persisted and reloaded through ShardDB.

use serde::{Deserialize, Serialize};

use shard_protocol::config::{devnet_account_label, DevnetConfig, NATIVE_DECIMALS};
use shard_protocol::storage::ShardDB;
use shard_protocol::units::{format_units, parse_units};
use shard_protocol::{
    Address, AssetRegistry, Event, EventLog, NativeLedger, NonFungibleRegistry, RegistryError,
    RegistrySet,
};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

/// A miniature world: what the runtime keeps, minus vaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct World {
    native: NativeLedger,
    registries: RegistrySet,
    events: EventLog,
}

fn account(index: usize) -> Address {
    Address::from_label(&devnet_account_label(index))
}

fn genesis() -> World {
    let config = DevnetConfig::default();
    let mut world = World::default();
    for i in 0..config.account_count {
        world.native.credit(account(i), config.initial_balance).unwrap();
    }
    world
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn escrow_style_custody_through_the_trait() {
    let mut world = genesis();
    let (owner, custodian, buyer) = (account(0), Address::from_label("custodian"), account(1));

    let mut registry =
        AssetRegistry::new(Address::from_label("nft"), "Valuable NFT".into(), "NFT".into(), owner);
    registry.mint(owner, owner, 42, &mut world.events).unwrap();
    registry
        .set_approval_for_all(owner, custodian, true, &mut world.events)
        .unwrap();
    let nft = registry.address;
    world.registries.insert(registry);

    // Custodian pulls the asset in, then releases it to the buyer.
    let set: &mut dyn NonFungibleRegistry = &mut world.registries;
    set.transfer_from(&nft, custodian, owner, custodian, 42, &mut world.events)
        .unwrap();
    set.transfer_from(&nft, custodian, custodian, buyer, 42, &mut world.events)
        .unwrap();
    assert_eq!(set.owner_of(&nft, 42).unwrap(), buyer);

    // The custodian no longer has any claim on the asset.
    let err = set
        .transfer_from(&nft, custodian, buyer, custodian, 42, &mut world.events)
        .unwrap_err();
    assert_eq!(
        err,
        RegistryError::AssetNotApproved {
            operator: custodian,
            id: 42
        }
    );
}

#[test]
fn native_payments_conserve_supply() {
    let mut world = genesis();
    let issued = world.native.total_issued();
    let price = parse_units("100", NATIVE_DECIMALS).unwrap();

    world
        .native
        .transfer(account(2), account(3), price, &mut world.events)
        .unwrap();
    world
        .native
        .transfer(account(3), account(4), price / 3, &mut world.events)
        .unwrap();

    assert_eq!(world.native.circulating(), issued);
    assert_eq!(
        format_units(world.native.balance_of(&account(2)), NATIVE_DECIMALS),
        "9900"
    );
    assert_eq!(world.events.len(), 2);
}

#[test]
fn world_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let mut world = genesis();
    let mut registry =
        AssetRegistry::new(Address::from_label("nft"), "Valuable NFT".into(), "NFT".into(), account(0));
    registry.mint(account(0), account(5), 1, &mut world.events).unwrap();
    world.registries.insert(registry);

    {
        let db = ShardDB::open(dir.path()).unwrap();
        db.put_snapshot(&world).unwrap();
        db.put_receipt(0, &world.events.all().to_vec()).unwrap();
        db.flush().unwrap();
    }

    let db = ShardDB::open(dir.path()).unwrap();
    let restored: World = db.get_snapshot().unwrap().unwrap();
    assert_eq!(restored, world);
    assert_eq!(
        restored
            .registries
            .owner_of(&Address::from_label("nft"), 1)
            .unwrap(),
        account(5)
    );

    let events: Vec<Event> = db.get_receipt(0).unwrap().unwrap();
    assert!(matches!(events[0], Event::AssetTransfer { id: 1, .. }));
    assert_eq!(db.receipt_count(), 1);
}
