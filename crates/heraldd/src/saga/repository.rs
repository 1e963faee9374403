//! Persisted webhook-embed patches, one document per scope.
//!
//! Each scope stores a single document under [`PATCHES_KEY`] holding the
//! canonical list of patches. Older deployments stored at most one patch in
//! a separate `legacy_patch` field. Reads fall back to that field only while
//! the list is empty; the first write folds it into the list and clears it in
//! the same transaction, so readers never see both.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::store::{KeyValueStore, Scope, StoreError};

use super::SAGA_TARGET;
use super::patch::{MessageId, WebhookEmbedPatch};

/// Store key of the per-scope patch document.
pub const PATCHES_KEY: &str = "webhook_embeds";

#[derive(Debug, Default, Serialize, Deserialize)]
struct PatchDocument {
    #[serde(default)]
    patches: Vec<WebhookEmbedPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    legacy_patch: Option<WebhookEmbedPatch>,
}

impl PatchDocument {
    fn decode(value: Option<Value>) -> Result<Self, StoreError> {
        value.map_or_else(
            || Ok(Self::default()),
            |value| {
                serde_json::from_value(value)
                    .map_err(|source| StoreError::malformed(PATCHES_KEY, source))
            },
        )
    }

    fn encode(&self) -> Result<Option<Value>, StoreError> {
        if self.patches.is_empty() && self.legacy_patch.is_none() {
            return Ok(None);
        }
        serde_json::to_value(self)
            .map(Some)
            .map_err(|source| StoreError::malformed(PATCHES_KEY, source))
    }

    fn visible(&self) -> &[WebhookEmbedPatch] {
        if self.patches.is_empty() {
            self.legacy_patch.as_slice()
        } else {
            &self.patches
        }
    }

    /// Moves the legacy record into the list. A legacy record shadowed by a
    /// non-empty list was never visible and is dropped.
    fn fold_legacy(&mut self) -> bool {
        let Some(legacy) = self.legacy_patch.take() else {
            return false;
        };
        if self.patches.is_empty() {
            self.patches.push(legacy);
        }
        true
    }

    fn position(&self, key: &MessageId) -> Option<usize> {
        self.patches
            .iter()
            .position(|patch| &patch.message_id == key)
    }
}

/// Scoped CRUD over webhook-embed patches.
#[derive(Clone)]
pub struct PatchRepository {
    store: Arc<dyn KeyValueStore>,
}

impl PatchRepository {
    /// Wraps `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn load(&self, scope: &Scope) -> Result<PatchDocument, StoreError> {
        PatchDocument::decode(self.store.get(scope, PATCHES_KEY)?)
    }

    /// Runs `change` against the migrated document inside one store
    /// transaction.
    fn modify<T: Default>(
        &self,
        scope: &Scope,
        mut change: impl FnMut(&mut PatchDocument) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut outcome = None;
        self.store.transact(scope, PATCHES_KEY, &mut |current| {
            let mut document = PatchDocument::decode(current)?;
            if document.fold_legacy() {
                debug!(target: SAGA_TARGET, %scope, "folded legacy patch into list");
            }
            outcome = Some(change(&mut document)?);
            document.encode()
        })?;
        Ok(outcome.unwrap_or_default())
    }

    /// Patches visible in `scope`, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error when the store cannot be read.
    pub fn list(&self, scope: &Scope) -> Result<Vec<WebhookEmbedPatch>, StoreError> {
        Ok(self.load(scope)?.visible().to_vec())
    }

    /// Patch stored under `key` in `scope`.
    ///
    /// # Errors
    ///
    /// Returns an error when the store cannot be read.
    pub fn get(
        &self,
        scope: &Scope,
        key: &MessageId,
    ) -> Result<Option<WebhookEmbedPatch>, StoreError> {
        Ok(self
            .load(scope)?
            .visible()
            .iter()
            .find(|patch| &patch.message_id == key)
            .cloned())
    }

    /// Inserts a new patch.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the key is already taken; nothing
    /// is written in that case.
    pub fn insert(&self, scope: &Scope, patch: &WebhookEmbedPatch) -> Result<(), StoreError> {
        self.modify(scope, |document| {
            if document.position(&patch.message_id).is_some() {
                return Err(StoreError::conflict(scope, patch.message_id.as_str()));
            }
            document.patches.push(patch.clone());
            Ok(())
        })
    }

    /// Replaces the patch stored under `original` with `patch`, which may
    /// carry a different key. Returns the replaced record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Missing`] when `original` does not exist and
    /// [`StoreError::Conflict`] when the new key belongs to another record.
    pub fn replace(
        &self,
        scope: &Scope,
        original: &MessageId,
        patch: &WebhookEmbedPatch,
    ) -> Result<Option<WebhookEmbedPatch>, StoreError> {
        self.modify(scope, |document| {
            let index = document
                .position(original)
                .ok_or_else(|| StoreError::missing(scope, original.as_str()))?;
            if &patch.message_id != original && document.position(&patch.message_id).is_some() {
                return Err(StoreError::conflict(scope, patch.message_id.as_str()));
            }
            let slot = document
                .patches
                .get_mut(index)
                .ok_or_else(|| StoreError::missing(scope, original.as_str()))?;
            Ok(Some(std::mem::replace(slot, patch.clone())))
        })
    }

    /// Removes the patch stored under `key`, returning it.
    ///
    /// # Errors
    ///
    /// Returns an error when the store cannot be written.
    pub fn remove(
        &self,
        scope: &Scope,
        key: &MessageId,
    ) -> Result<Option<WebhookEmbedPatch>, StoreError> {
        self.modify(scope, |document| {
            Ok(document
                .position(key)
                .map(|index| document.patches.remove(index)))
        })
    }

    /// Puts `previous` back in place of the record now stored under
    /// `current`, dropping `current` when the key changed.
    ///
    /// # Errors
    ///
    /// Returns an error when the store cannot be written.
    pub fn restore(
        &self,
        scope: &Scope,
        current: &MessageId,
        previous: &WebhookEmbedPatch,
    ) -> Result<(), StoreError> {
        self.modify(scope, |document| {
            if let Some(slot) = document
                .position(current)
                .and_then(|index| document.patches.get_mut(index))
            {
                *slot = previous.clone();
            } else {
                document.patches.push(previous.clone());
            }
            let key = &previous.message_id;
            let mut seen = false;
            document.patches.retain(|patch| {
                if &patch.message_id != key {
                    return true;
                }
                !std::mem::replace(&mut seen, true)
            });
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};
    use serde_json::json;

    use super::*;
    use crate::saga::patch::{EmbedPayload, WebhookTarget};
    use crate::store::MemoryStore;

    fn patch(id: &str, title: &str) -> WebhookEmbedPatch {
        WebhookEmbedPatch::new(
            MessageId::parse(id).expect("id"),
            WebhookTarget::parse("https://host/api/webhooks/7/token").expect("url"),
            EmbedPayload::from_value(json!({ "title": title })).expect("payload"),
        )
    }

    fn key(id: &str) -> MessageId {
        MessageId::parse(id).expect("id")
    }

    #[fixture]
    fn store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new())
    }

    #[rstest]
    fn duplicate_insert_is_rejected(store: Arc<MemoryStore>) {
        let repository = PatchRepository::new(store);
        repository
            .insert(&Scope::Global, &patch("1", "a"))
            .expect("first insert");

        let error = repository
            .insert(&Scope::Global, &patch("1", "b"))
            .expect_err("duplicate insert");
        assert!(matches!(error, StoreError::Conflict { .. }));
        let stored = repository.get(&Scope::Global, &key("1")).expect("get");
        assert_eq!(stored, Some(patch("1", "a")));
    }

    #[rstest]
    fn replace_into_taken_key_conflicts(store: Arc<MemoryStore>) {
        let repository = PatchRepository::new(store);
        repository.insert(&Scope::Global, &patch("1", "a")).expect("insert");
        repository.insert(&Scope::Global, &patch("2", "b")).expect("insert");

        let error = repository
            .replace(&Scope::Global, &key("1"), &patch("2", "c"))
            .expect_err("conflict");
        assert!(matches!(error, StoreError::Conflict { .. }));
        assert_eq!(
            repository.list(&Scope::Global).expect("list"),
            vec![patch("1", "a"), patch("2", "b")]
        );
    }

    #[rstest]
    fn restore_undoes_a_key_change(store: Arc<MemoryStore>) {
        let repository = PatchRepository::new(store);
        repository.insert(&Scope::Global, &patch("1", "a")).expect("insert");
        repository
            .replace(&Scope::Global, &key("1"), &patch("5", "moved"))
            .expect("replace");

        repository
            .restore(&Scope::Global, &key("5"), &patch("1", "a"))
            .expect("restore");

        assert_eq!(
            repository.list(&Scope::Global).expect("list"),
            vec![patch("1", "a")]
        );
    }

    #[rstest]
    fn legacy_record_is_read_and_folded_on_write(store: Arc<MemoryStore>) {
        let realm = Scope::Realm(herald_perms::RealmId::new("g1"));
        let legacy = serde_json::to_value(patch("9", "legacy")).expect("encode");
        store
            .put(&realm, PATCHES_KEY, json!({ "patches": [], "legacy_patch": legacy }))
            .expect("seed legacy");
        let repository = PatchRepository::new(store.clone());

        assert_eq!(
            repository.get(&realm, &key("9")).expect("get"),
            Some(patch("9", "legacy"))
        );

        repository.insert(&realm, &patch("10", "new")).expect("insert");

        let raw = store.get(&realm, PATCHES_KEY).expect("raw").expect("document");
        assert!(raw.get("legacy_patch").is_none());
        assert_eq!(
            repository.list(&realm).expect("list"),
            vec![patch("9", "legacy"), patch("10", "new")]
        );
    }

    #[rstest]
    fn legacy_record_is_ignored_once_the_list_has_entries(store: Arc<MemoryStore>) {
        let legacy = serde_json::to_value(patch("9", "legacy")).expect("encode");
        let current = serde_json::to_value(patch("1", "a")).expect("encode");
        store
            .put(
                &Scope::Global,
                PATCHES_KEY,
                json!({ "patches": [current], "legacy_patch": legacy }),
            )
            .expect("seed");
        let repository = PatchRepository::new(store);

        assert_eq!(repository.get(&Scope::Global, &key("9")).expect("get"), None);
        assert_eq!(repository.list(&Scope::Global).expect("list").len(), 1);
    }

    #[rstest]
    fn removing_the_last_patch_clears_the_document(store: Arc<MemoryStore>) {
        let repository = PatchRepository::new(store.clone());
        repository.insert(&Scope::Global, &patch("1", "a")).expect("insert");

        let removed = repository.remove(&Scope::Global, &key("1")).expect("remove");

        assert_eq!(removed, Some(patch("1", "a")));
        assert_eq!(store.get(&Scope::Global, PATCHES_KEY).expect("raw"), None);
    }
}
