//! Durable store tier: persisted copies of ownership and membership.

use std::sync::Arc;

use crate::error::TierError;
use crate::ids::{MemberKey, RealmId, RoleSet, UserId};
use crate::tier::Tier;

/// Persisted permission records.
///
/// The daemon implements this on top of its key-value store; values written
/// here survive restarts and warm the fast cache on the next lookup.
pub trait PermissionStore: Send + Sync {
    /// Loads the stored owner of `realm`.
    ///
    /// # Errors
    ///
    /// Returns a [`TierError`] when the store cannot be read.
    fn load_owner(&self, realm: &RealmId) -> Result<Option<UserId>, TierError>;

    /// Persists the owner of `realm`.
    ///
    /// # Errors
    ///
    /// Returns a [`TierError`] when the store cannot be written.
    fn save_owner(&self, realm: &RealmId, owner: &UserId) -> Result<(), TierError>;

    /// Loads the stored roles of `actor` in `realm`.
    ///
    /// # Errors
    ///
    /// Returns a [`TierError`] when the store cannot be read.
    fn load_roles(&self, realm: &RealmId, actor: &UserId) -> Result<Option<RoleSet>, TierError>;

    /// Persists the roles of `actor` in `realm`.
    ///
    /// # Errors
    ///
    /// Returns a [`TierError`] when the store cannot be written.
    fn save_roles(&self, realm: &RealmId, actor: &UserId, roles: &RoleSet)
    -> Result<(), TierError>;
}

/// Adapts a [`PermissionStore`] into a cascade tier accepting write-back.
pub struct StoreTier {
    store: Arc<dyn PermissionStore>,
}

impl StoreTier {
    /// Wraps `store`.
    #[must_use]
    pub fn new(store: Arc<dyn PermissionStore>) -> Self {
        Self { store }
    }
}

impl Tier<RealmId, UserId> for StoreTier {
    fn name(&self) -> &'static str {
        "store"
    }

    fn lookup(&self, key: &RealmId) -> Result<Option<UserId>, TierError> {
        self.store.load_owner(key)
    }

    fn accepts_write_back(&self) -> bool {
        true
    }

    fn write_back(&self, key: &RealmId, value: &UserId) -> Result<(), TierError> {
        self.store.save_owner(key, value)
    }
}

impl Tier<MemberKey, RoleSet> for StoreTier {
    fn name(&self) -> &'static str {
        "store"
    }

    fn lookup(&self, key: &MemberKey) -> Result<Option<RoleSet>, TierError> {
        self.store.load_roles(key.realm(), key.actor())
    }

    fn accepts_write_back(&self) -> bool {
        true
    }

    fn write_back(&self, key: &MemberKey, value: &RoleSet) -> Result<(), TierError> {
        self.store.save_roles(key.realm(), key.actor(), value)
    }
}
