//! Per-realm configuration read by the router and the mutation commands.

use std::sync::Arc;

use herald_config::ValidationOverride;
use herald_perms::{RealmId, RoleId};
use serde::{Deserialize, Serialize};

use crate::store::{KeyValueStore, Scope, StoreError};

const SETTINGS_KEY: &str = "settings";

/// Configuration a realm's administrators control.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealmSettings {
    /// Roles allowed to run gated commands. Empty means owner only for
    /// permission-gated commands and no extra gate for the rest.
    #[serde(default)]
    pub allowed_roles: Vec<RoleId>,
    /// Endpoint validation override for mutations in this realm.
    #[serde(default)]
    pub validation: ValidationOverride,
}

/// Source of realm settings.
pub trait SettingsSource: Send + Sync {
    /// Loads the settings of `realm`, `None` when never configured.
    ///
    /// # Errors
    ///
    /// Returns an error when the settings cannot be read.
    fn realm_settings(&self, realm: &RealmId) -> Result<Option<RealmSettings>, StoreError>;
}

/// Settings persisted under `(realm, "settings")`.
pub struct StoreSettings {
    store: Arc<dyn KeyValueStore>,
}

impl StoreSettings {
    /// Wraps `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Persists the settings of `realm`.
    ///
    /// # Errors
    ///
    /// Returns an error when the settings cannot be written.
    pub fn save(&self, realm: &RealmId, settings: &RealmSettings) -> Result<(), StoreError> {
        let value = serde_json::to_value(settings)
            .map_err(|source| StoreError::malformed(SETTINGS_KEY, source))?;
        self.store
            .put(&Scope::Realm(realm.clone()), SETTINGS_KEY, value)
    }
}

impl SettingsSource for StoreSettings {
    fn realm_settings(&self, realm: &RealmId) -> Result<Option<RealmSettings>, StoreError> {
        let Some(value) = self.store.get(&Scope::Realm(realm.clone()), SETTINGS_KEY)? else {
            return Ok(None);
        };
        serde_json::from_value(value)
            .map(Some)
            .map_err(|source| StoreError::malformed(SETTINGS_KEY, source))
    }
}
