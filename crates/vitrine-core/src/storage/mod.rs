//! # Storage Module
//!
//! The key-value seam the policy and meta stores are built on.
//!
//! Two backends are provided:
//! - `MemoryStore`: a `BTreeMap` (tests, dry runs, the `memory` CLI backend)
//! - `RedbStore`: disk-backed ACID storage via redb
//!
//! `StorageBackend` picks one at runtime, the same way the app layer picks a
//! backend from its `--backend` flag.

mod redb_store;

pub use redb_store::RedbStore;

use crate::VitrineError;
use std::collections::BTreeMap;
use std::path::Path;

// =============================================================================
// KEY-VALUE TRAIT
// =============================================================================

/// Minimal string key-value storage.
///
/// Values are opaque strings; the formats module owns their meaning.
pub trait KeyValueStore {
    /// Read a value. `Ok(None)` when the key was never written or was removed.
    fn get(&self, key: &str) -> Result<Option<String>, VitrineError>;

    /// Write a value, replacing any previous one.
    fn set(&mut self, key: &str, value: &str) -> Result<(), VitrineError>;

    /// Delete a key. Deleting a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), VitrineError>;
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

/// Volatile key-value store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with raw values (used to simulate whatever a
    /// previous app version left behind).
    #[must_use]
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Number of keys currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no key is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, VitrineError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), VitrineError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), VitrineError> {
        self.entries.remove(key);
        Ok(())
    }
}

// =============================================================================
// RUNTIME-SELECTED BACKEND
// =============================================================================

/// Storage backend chosen at runtime.
#[derive(Debug)]
pub enum StorageBackend {
    /// Volatile in-memory store.
    InMemory(MemoryStore),
    /// Disk-backed store using redb.
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

impl StorageBackend {
    /// Open a redb database at `path`.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, VitrineError> {
        Ok(Self::Persistent(RedbStore::open(path)?))
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Persistent(_))
    }

    /// Short name for status output.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InMemory(_) => "memory",
            Self::Persistent(_) => "redb",
        }
    }
}

impl KeyValueStore for StorageBackend {
    fn get(&self, key: &str) -> Result<Option<String>, VitrineError> {
        match self {
            Self::InMemory(store) => store.get(key),
            Self::Persistent(store) => store.get(key),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), VitrineError> {
        match self {
            Self::InMemory(store) => store.set(key, value),
            Self::Persistent(store) => store.set(key, value),
        }
    }

    fn remove(&mut self, key: &str) -> Result<(), VitrineError> {
        match self {
            Self::InMemory(store) => store.remove(key),
            Self::Persistent(store) => store.remove(key),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
