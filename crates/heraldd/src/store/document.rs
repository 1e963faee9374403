//! In-memory layout shared by the memory and file stores.

use std::collections::BTreeMap;

use herald_perms::RealmId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Scope, StoreError, Transaction};

/// Every stored value, grouped by scope, plus the per-realm counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(super) struct StoreDocument {
    #[serde(default)]
    entries: BTreeMap<String, BTreeMap<String, Value>>,
    #[serde(default)]
    sequences: BTreeMap<String, u64>,
}

impl StoreDocument {
    pub(super) fn get(&self, scope: &Scope, key: &str) -> Option<&Value> {
        self.entries.get(&scope.storage_key())?.get(key)
    }

    pub(super) fn put(&mut self, scope: &Scope, key: &str, value: Value) {
        self.entries
            .entry(scope.storage_key())
            .or_default()
            .insert(key.to_owned(), value);
    }

    pub(super) fn delete(&mut self, scope: &Scope, key: &str) -> bool {
        let scope_key = scope.storage_key();
        let Some(values) = self.entries.get_mut(&scope_key) else {
            return false;
        };
        let removed = values.remove(key).is_some();
        if values.is_empty() {
            self.entries.remove(&scope_key);
        }
        removed
    }

    pub(super) fn transact(
        &mut self,
        scope: &Scope,
        key: &str,
        apply: &mut Transaction<'_>,
    ) -> Result<(), StoreError> {
        let current = self.get(scope, key).cloned();
        match apply(current)? {
            Some(value) => self.put(scope, key, value),
            None => {
                self.delete(scope, key);
            }
        }
        Ok(())
    }

    pub(super) fn next_sequence(&mut self, realm: &RealmId) -> u64 {
        let counter = self.sequences.entry(realm.as_str().to_owned()).or_insert(0);
        *counter += 1;
        *counter
    }
}
