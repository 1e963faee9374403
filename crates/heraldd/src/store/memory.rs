//! Process-local store used by tests and by the daemon when no store path is
//! configured.

use std::sync::{Mutex, MutexGuard};

use herald_perms::RealmId;
use serde_json::Value;

use super::document::StoreDocument;
use super::{KeyValueStore, Scope, StoreError, Transaction};

/// Non-durable [`KeyValueStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    document: Mutex<StoreDocument>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreDocument>, StoreError> {
        self.document.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, scope: &Scope, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.lock()?.get(scope, key).cloned())
    }

    fn put(&self, scope: &Scope, key: &str, value: Value) -> Result<(), StoreError> {
        self.lock()?.put(scope, key, value);
        Ok(())
    }

    fn delete(&self, scope: &Scope, key: &str) -> Result<bool, StoreError> {
        Ok(self.lock()?.delete(scope, key))
    }

    fn transact(
        &self,
        scope: &Scope,
        key: &str,
        apply: &mut Transaction<'_>,
    ) -> Result<(), StoreError> {
        self.lock()?.transact(scope, key, apply)
    }

    fn next_sequence(&self, realm: &RealmId) -> Result<u64, StoreError> {
        Ok(self.lock()?.next_sequence(realm))
    }
}
