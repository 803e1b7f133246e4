//! # ShardDB — Persistent Storage Engine
//!
//! The persistence layer for a Shard devnet, built on sled's embedded
//! key-value store. All on-disk data flows through this module.
//!
//! ## Tree Layout
//!
//! | Tree        | Key                  | Value                          |
//! |-------------|----------------------|--------------------------------|
//! | `snapshots` | `latest`             | `bincode(Snapshot<T>)`         |
//! | `snapshots` | `latest.blake3`      | BLAKE3 digest of `latest`      |
//! | `receipts`  | `index` (8B BE)      | `bincode(R)`                   |
//! | `metadata`  | key (UTF-8)          | value (bytes)                  |
//!
//! Receipt indices are big-endian so that sled's lexicographic ordering
//! matches numeric ordering.
//!
//! The store is generic over what it persists: it knows how to frame and
//! version a snapshot, not what a world state looks like.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sled::{Db, Tree};
use std::path::Path;

use crate::config::{
    SNAPSHOT_KEY_DIGEST, SNAPSHOT_KEY_LATEST, SNAPSHOT_VERSION, TREE_METADATA, TREE_RECEIPTS,
    TREE_SNAPSHOTS,
};
use crate::crypto::blake3_hash;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("snapshot version mismatch: stored {stored}, expected {expected}")]
    VersionMismatch { stored: u32, expected: u32 },

    #[error("snapshot digest mismatch: stored {stored}, computed {computed}")]
    DigestMismatch { stored: String, computed: String },
}

pub type DbResult<T> = Result<T, DbError>;

/// Versioned envelope around a persisted value.
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot<T> {
    version: u32,
    state: T,
}

// ---------------------------------------------------------------------------
// ShardDB
// ---------------------------------------------------------------------------

/// Persistent storage for one devnet.
///
/// sled trees are safe for concurrent use, so a `ShardDB` can be cloned and
/// shared across threads without extra locking.
#[derive(Debug, Clone)]
pub struct ShardDB {
    db: Db,
    snapshots: Tree,
    receipts: Tree,
    metadata: Tree,
}

impl ShardDB {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary database that is removed when dropped.
    pub fn open_temporary() -> DbResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> DbResult<Self> {
        let snapshots = db.open_tree(TREE_SNAPSHOTS)?;
        let receipts = db.open_tree(TREE_RECEIPTS)?;
        let metadata = db.open_tree(TREE_METADATA)?;
        Ok(Self {
            db,
            snapshots,
            receipts,
            metadata,
        })
    }

    // -- Snapshots -----------------------------------------------------------

    /// Persist `state` as the latest snapshot, replacing any previous one.
    ///
    /// The snapshot and its digest are written in one sled batch.
    pub fn put_snapshot<T: Serialize>(&self, state: &T) -> DbResult<()> {
        let envelope = Snapshot {
            version: SNAPSHOT_VERSION,
            state,
        };
        let bytes =
            bincode::serialize(&envelope).map_err(|e| DbError::Serialization(e.to_string()))?;
        let digest = blake3_hash(&bytes);

        let mut batch = sled::Batch::default();
        batch.insert(SNAPSHOT_KEY_LATEST, bytes);
        batch.insert(SNAPSHOT_KEY_DIGEST, &digest[..]);
        self.snapshots.apply_batch(batch)?;
        Ok(())
    }

    /// BLAKE3 digest of the stored snapshot bytes, if one has been written.
    pub fn snapshot_digest(&self) -> DbResult<Option<[u8; 32]>> {
        Ok(self.snapshots.get(SNAPSHOT_KEY_DIGEST)?.and_then(|v| {
            let mut out = [0u8; 32];
            (v.len() == 32).then(|| {
                out.copy_from_slice(&v);
                out
            })
        }))
    }

    /// Load the latest snapshot, or `None` on a fresh database.
    pub fn get_snapshot<T: DeserializeOwned>(&self) -> DbResult<Option<T>> {
        match self.snapshots.get(SNAPSHOT_KEY_LATEST)? {
            Some(bytes) => {
                if let Some(stored) = self.snapshots.get(SNAPSHOT_KEY_DIGEST)? {
                    let computed = blake3_hash(&bytes);
                    if stored.as_ref() != &computed[..] {
                        return Err(DbError::DigestMismatch {
                            stored: hex::encode(stored),
                            computed: hex::encode(computed),
                        });
                    }
                }
                let envelope: Snapshot<T> = bincode::deserialize(&bytes)
                    .map_err(|e| DbError::Serialization(e.to_string()))?;
                if envelope.version != SNAPSHOT_VERSION {
                    return Err(DbError::VersionMismatch {
                        stored: envelope.version,
                        expected: SNAPSHOT_VERSION,
                    });
                }
                Ok(Some(envelope.state))
            }
            None => Ok(None),
        }
    }

    /// Returns `true` if a snapshot has been written.
    pub fn has_snapshot(&self) -> DbResult<bool> {
        Ok(self.snapshots.contains_key(SNAPSHOT_KEY_LATEST)?)
    }

    // -- Receipts ------------------------------------------------------------

    /// Persist a receipt at `index`.
    pub fn put_receipt<R: Serialize>(&self, index: u64, receipt: &R) -> DbResult<()> {
        let bytes =
            bincode::serialize(receipt).map_err(|e| DbError::Serialization(e.to_string()))?;
        self.receipts.insert(index.to_be_bytes(), bytes)?;
        Ok(())
    }

    /// Retrieve the receipt at `index`.
    pub fn get_receipt<R: DeserializeOwned>(&self, index: u64) -> DbResult<Option<R>> {
        match self.receipts.get(index.to_be_bytes())? {
            Some(bytes) => {
                let receipt = bincode::deserialize(&bytes)
                    .map_err(|e| DbError::Serialization(e.to_string()))?;
                Ok(Some(receipt))
            }
            None => Ok(None),
        }
    }

    /// Number of receipts stored.
    pub fn receipt_count(&self) -> usize {
        self.receipts.len()
    }

    // -- Metadata ------------------------------------------------------------

    /// Store an arbitrary metadata value.
    pub fn put_metadata(&self, key: &str, value: &[u8]) -> DbResult<()> {
        self.metadata.insert(key.as_bytes(), value)?;
        Ok(())
    }

    /// Retrieve a metadata value.
    pub fn get_metadata(&self, key: &str) -> DbResult<Option<Vec<u8>>> {
        Ok(self.metadata.get(key.as_bytes())?.map(|v| v.to_vec()))
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> DbResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Dummy {
        name: String,
        amount: u128,
    }

    #[test]
    fn fresh_db_has_no_snapshot() {
        let db = ShardDB::open_temporary().unwrap();
        assert!(!db.has_snapshot().unwrap());
        assert_eq!(db.get_snapshot::<Dummy>().unwrap(), None);
    }

    #[test]
    fn snapshot_roundtrip_and_overwrite() {
        let db = ShardDB::open_temporary().unwrap();
        let first = Dummy {
            name: "first".into(),
            amount: 1,
        };
        let second = Dummy {
            name: "second".into(),
            amount: u128::MAX,
        };
        db.put_snapshot(&first).unwrap();
        db.put_snapshot(&second).unwrap();
        assert_eq!(db.get_snapshot::<Dummy>().unwrap(), Some(second));
    }

    #[test]
    fn snapshot_digest_matches_stored_bytes() {
        let db = ShardDB::open_temporary().unwrap();
        assert_eq!(db.snapshot_digest().unwrap(), None);
        db.put_snapshot(&Dummy {
            name: "vault".into(),
            amount: 5,
        })
        .unwrap();
        let bytes = db.snapshots.get(SNAPSHOT_KEY_LATEST).unwrap().unwrap();
        assert_eq!(db.snapshot_digest().unwrap(), Some(blake3_hash(&bytes)));
    }

    #[test]
    fn tampered_snapshot_rejected() {
        let db = ShardDB::open_temporary().unwrap();
        db.put_snapshot(&Dummy {
            name: "vault".into(),
            amount: 5,
        })
        .unwrap();
        let forged = bincode::serialize(&Snapshot {
            version: SNAPSHOT_VERSION,
            state: Dummy {
                name: "vault".into(),
                amount: 5_000,
            },
        })
        .unwrap();
        db.snapshots.insert(SNAPSHOT_KEY_LATEST, forged).unwrap();
        assert!(matches!(
            db.get_snapshot::<Dummy>(),
            Err(DbError::DigestMismatch { .. })
        ));
    }

    #[test]
    fn receipts_are_indexed() {
        let db = ShardDB::open_temporary().unwrap();
        db.put_receipt(0, &"zero".to_string()).unwrap();
        db.put_receipt(1, &"one".to_string()).unwrap();
        assert_eq!(db.receipt_count(), 2);
        assert_eq!(db.get_receipt::<String>(1).unwrap().as_deref(), Some("one"));
        assert_eq!(db.get_receipt::<String>(9).unwrap(), None);
    }

    #[test]
    fn metadata_roundtrip() {
        let db = ShardDB::open_temporary().unwrap();
        db.put_metadata("network", b"devnet").unwrap();
        assert_eq!(db.get_metadata("network").unwrap(), Some(b"devnet".to_vec()));
        assert_eq!(db.get_metadata("missing").unwrap(), None);
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db");
        {
            let db = ShardDB::open(&path).unwrap();
            db.put_snapshot(&Dummy {
                name: "persisted".into(),
                amount: 7,
            })
            .unwrap();
            db.flush().unwrap();
        }
        let db = ShardDB::open(&path).unwrap();
        let loaded: Dummy = db.get_snapshot().unwrap().unwrap();
        assert_eq!(loaded.name, "persisted");
    }
}
