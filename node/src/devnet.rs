//! # Devnet Store
//!
//! Ties a [`Chain`] to a [`ShardDB`] in the node data directory. Every
//! command opens the store, runs at most one call, and commits: the world
//! state snapshot is replaced and each new receipt is appended under its
//! index.
//!
//! The devnet's genesis parameters are kept in the metadata tree so the
//! account list can be rebuilt on every invocation.

use anyhow::{anyhow, bail, Context, Result};
use std::path::Path;

use shard_contracts::chain::{Chain, WorldState};
use shard_protocol::config::{DevnetConfig, DB_DIR_NAME};
use shard_protocol::storage::ShardDB;
use shard_protocol::Address;

/// Metadata key holding the JSON-encoded [`DevnetConfig`].
const META_DEVNET_CONFIG: &str = "devnet_config";

/// Metadata key holding the genesis timestamp.
const META_CREATED_AT: &str = "created_at";

/// A chain loaded from disk, plus the database it commits to.
pub struct Devnet {
    db: ShardDB,
    config: DevnetConfig,
    accounts: Vec<Address>,
    /// The chain. Mutate it through its call methods, then [`commit`](Self::commit).
    pub chain: Chain,
}

impl Devnet {
    /// Creates a fresh devnet in `data_dir`.
    ///
    /// Fails if the directory already holds one, unless `force` is set.
    pub fn init(data_dir: &Path, config: DevnetConfig, force: bool) -> Result<Self> {
        let db_path = data_dir.join(DB_DIR_NAME);
        if db_path.exists() && force {
            std::fs::remove_dir_all(&db_path)
                .with_context(|| format!("failed to remove {}", db_path.display()))?;
        }
        std::fs::create_dir_all(&db_path)
            .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;

        let db = ShardDB::open(&db_path)
            .with_context(|| format!("failed to open database at {}", db_path.display()))?;
        if db.has_snapshot()? {
            bail!(
                "a devnet already exists in {} (use --force to replace it)",
                data_dir.display()
            );
        }

        let chain = Chain::devnet(&config)?;
        db.put_metadata(META_DEVNET_CONFIG, &serde_json::to_vec(&config)?)?;
        db.put_metadata(META_CREATED_AT, chrono::Utc::now().to_rfc3339().as_bytes())?;

        let mut devnet = Self {
            accounts: Chain::devnet_accounts(&config),
            db,
            config,
            chain,
        };
        devnet.commit()?;
        tracing::info!(data_dir = %data_dir.display(), "devnet initialized");
        Ok(devnet)
    }

    /// Loads the devnet stored in `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let db_path = data_dir.join(DB_DIR_NAME);
        if !db_path.exists() {
            bail!(
                "no devnet in {} (run `shard-node init` first)",
                data_dir.display()
            );
        }
        let db = ShardDB::open(&db_path)
            .with_context(|| format!("failed to open database at {}", db_path.display()))?;

        let state: WorldState = db
            .get_snapshot()?
            .ok_or_else(|| anyhow!("database at {} has no snapshot", db_path.display()))?;
        let config: DevnetConfig = match db.get_metadata(META_DEVNET_CONFIG)? {
            Some(bytes) => serde_json::from_slice(&bytes).context("corrupt devnet config")?,
            None => DevnetConfig::default(),
        };

        tracing::debug!(height = state.height, "devnet loaded");
        Ok(Self {
            accounts: Chain::devnet_accounts(&config),
            db,
            config,
            chain: Chain::from_state(state),
        })
    }

    /// Persists the world state and every receipt produced since loading.
    pub fn commit(&mut self) -> Result<()> {
        for receipt in self.chain.receipts() {
            self.db.put_receipt(receipt.index, receipt)?;
        }
        self.db.put_snapshot(self.chain.state())?;
        self.db.flush()?;
        Ok(())
    }

    /// Genesis parameters.
    pub fn config(&self) -> &DevnetConfig {
        &self.config
    }

    /// The funded devnet accounts, in index order.
    pub fn accounts(&self) -> &[Address] {
        &self.accounts
    }

    /// Number of receipts on disk.
    pub fn receipt_count(&self) -> usize {
        self.db.receipt_count()
    }

    /// Resolves a devnet account index or a hex address.
    pub fn resolve(&self, input: &str) -> Result<Address> {
        resolve_account(input, &self.accounts)
    }
}

/// Parses `input` as an index into `accounts` or as a `0x` address.
pub fn resolve_account(input: &str, accounts: &[Address]) -> Result<Address> {
    let input = input.trim();
    if let Ok(index) = input.parse::<usize>() {
        return accounts.get(index).copied().ok_or_else(|| {
            anyhow!(
                "account index {} out of range (devnet has {} accounts)",
                index,
                accounts.len()
            )
        });
    }
    input
        .parse::<Address>()
        .with_context(|| format!("invalid account: {}", input))
}
