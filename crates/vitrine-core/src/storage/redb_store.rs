//! # redb-backed Key-Value Storage
//!
//! A disk-backed settings store using the redb embedded database.
//!
//! One table, `settings`, maps a storage key (`@capture_policy_v1`,
//! `@capture_meta_v1`) to the record's JSON text. redb gives crash safety
//! through copy-on-write B-trees; every `set` is its own committed
//! transaction, so a record is either the old value or the new one.

use crate::VitrineError;
use crate::storage::KeyValueStore;
use redb::{Database, ReadableDatabase, ReadableTableMetadata, TableDefinition};
use std::path::Path;

/// Table for settings: key string -> JSON text
const SETTINGS: TableDefinition<&str, &str> = TableDefinition::new("settings");

fn storage_err(e: impl std::fmt::Display) -> VitrineError {
    VitrineError::Storage(e.to_string())
}

/// A disk-backed key-value store using redb.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a settings database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, VitrineError> {
        let db = Database::create(path.as_ref()).map_err(storage_err)?;

        // Initialize the table so readers never see TableDoesNotExist
        {
            let write_txn = db.begin_write().map_err(storage_err)?;
            let _ = write_txn.open_table(SETTINGS).map_err(storage_err)?;
            write_txn.commit().map_err(storage_err)?;
        }

        tracing::debug!(path = %path.as_ref().display(), "opened settings database");
        Ok(Self { db })
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> Result<u64, VitrineError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(SETTINGS).map_err(storage_err)?;
        table.len().map_err(storage_err)
    }

    /// True when no key is stored.
    pub fn is_empty(&self) -> Result<bool, VitrineError> {
        Ok(self.len()? == 0)
    }
}

impl KeyValueStore for RedbStore {
    fn get(&self, key: &str) -> Result<Option<String>, VitrineError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(SETTINGS).map_err(storage_err)?;
        let value = table
            .get(key)
            .map_err(storage_err)?
            .map(|guard| guard.value().to_string());
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), VitrineError> {
        let write_txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut table = write_txn.open_table(SETTINGS).map_err(storage_err)?;
            table.insert(key, value).map_err(storage_err)?;
        }
        write_txn.commit().map_err(storage_err)
    }

    fn remove(&mut self, key: &str) -> Result<(), VitrineError> {
        let write_txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut table = write_txn.open_table(SETTINGS).map_err(storage_err)?;
            table.remove(key).map_err(storage_err)?;
        }
        write_txn.commit().map_err(storage_err)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = RedbStore::open(dir.path().join("vitrine.db")).expect("open");

        assert!(store.is_empty().expect("empty"));
        assert_eq!(store.get("k").expect("get"), None);

        store.set("k", "v1").expect("set");
        store.set("k", "v2").expect("overwrite");
        assert_eq!(store.get("k").expect("get").as_deref(), Some("v2"));
        assert_eq!(store.len().expect("len"), 1);

        store.remove("k").expect("remove");
        assert_eq!(store.get("k").expect("get"), None);
        store.remove("k").expect("removing a missing key is fine");
    }

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("vitrine.db");

        {
            let mut store = RedbStore::open(&path).expect("open");
            store.set("@capture_meta_v1", "{}").expect("set");
        }

        let store = RedbStore::open(&path).expect("reopen");
        assert_eq!(
            store.get("@capture_meta_v1").expect("get").as_deref(),
            Some("{}")
        );
    }
}
