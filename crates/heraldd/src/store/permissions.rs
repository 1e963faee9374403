//! Permission records persisted in the key-value store.

use std::sync::Arc;

use herald_perms::{PermissionStore, RealmId, RoleSet, TierError, UserId};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{KeyValueStore, Scope, StoreError};

const TIER: &str = "store";
const OWNER_KEY: &str = "owner";

/// [`PermissionStore`] over a [`KeyValueStore`].
///
/// Owners live under `(realm, "owner")`, member roles under
/// `(realm, "member:{actor}")`.
pub struct StorePermissions {
    store: Arc<dyn KeyValueStore>,
}

impl StorePermissions {
    /// Wraps `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn load<T: DeserializeOwned>(&self, realm: &RealmId, key: &str) -> Result<Option<T>, TierError> {
        let scope = Scope::Realm(realm.clone());
        let Some(value) = self.store.get(&scope, key).map_err(unavailable)? else {
            return Ok(None);
        };
        serde_json::from_value(value)
            .map(Some)
            .map_err(|source| unavailable(StoreError::malformed(key, source)))
    }

    fn save<T: Serialize>(&self, realm: &RealmId, key: &str, value: &T) -> Result<(), TierError> {
        let scope = Scope::Realm(realm.clone());
        let value = serde_json::to_value(value)
            .map_err(|source| unavailable(StoreError::malformed(key, source)))?;
        self.store.put(&scope, key, value).map_err(unavailable)
    }
}

fn member_key(actor: &UserId) -> String {
    format!("member:{actor}")
}

fn unavailable(error: StoreError) -> TierError {
    TierError::unavailable(TIER, error.to_string())
}

impl PermissionStore for StorePermissions {
    fn load_owner(&self, realm: &RealmId) -> Result<Option<UserId>, TierError> {
        self.load(realm, OWNER_KEY)
    }

    fn save_owner(&self, realm: &RealmId, owner: &UserId) -> Result<(), TierError> {
        self.save(realm, OWNER_KEY, owner)
    }

    fn load_roles(&self, realm: &RealmId, actor: &UserId) -> Result<Option<RoleSet>, TierError> {
        self.load(realm, &member_key(actor))
    }

    fn save_roles(&self, realm: &RealmId, actor: &UserId, roles: &RoleSet) -> Result<(), TierError> {
        self.save(realm, &member_key(actor), roles)
    }
}
