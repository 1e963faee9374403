//! Local mirror of realm ownership and membership.
//!
//! The surrounding system keeps the snapshot current from live platform
//! events. It is eventually consistent and never receives write-back from the
//! cascade: only event handlers mutate it.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::TierError;
use crate::ids::{MemberKey, RealmId, RoleSet, UserId};
use crate::tier::Tier;

#[derive(Debug, Default)]
struct RealmMirror {
    owner: Option<UserId>,
    members: HashMap<UserId, RoleSet>,
}

/// Event-maintained mirror consulted as the second tier.
#[derive(Debug, Default)]
pub struct LocalSnapshot {
    realms: RwLock<HashMap<RealmId, RealmMirror>>,
}

impl LocalSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the owner of `realm`.
    pub fn record_owner(&self, realm: RealmId, owner: UserId) {
        if let Ok(mut realms) = self.realms.write() {
            realms.entry(realm).or_default().owner = Some(owner);
        }
    }

    /// Records the role set held by `actor` in `realm`.
    pub fn record_member(&self, realm: RealmId, actor: UserId, roles: RoleSet) {
        if let Ok(mut realms) = self.realms.write() {
            realms.entry(realm).or_default().members.insert(actor, roles);
        }
    }

    /// Forgets one member, e.g. after they left the realm.
    pub fn forget_member(&self, realm: &RealmId, actor: &UserId) {
        if let Ok(mut realms) = self.realms.write() {
            if let Some(mirror) = realms.get_mut(realm) {
                mirror.members.remove(actor);
            }
        }
    }

    /// Forgets a whole realm, e.g. after the bot was removed from it.
    pub fn forget_realm(&self, realm: &RealmId) {
        if let Ok(mut realms) = self.realms.write() {
            realms.remove(realm);
        }
    }

    fn read<T>(&self, read: impl FnOnce(&HashMap<RealmId, RealmMirror>) -> T) -> Result<T, TierError> {
        self.realms
            .read()
            .map(|realms| read(&realms))
            .map_err(|_| TierError::Poisoned { tier: "snapshot" })
    }
}

impl Tier<RealmId, UserId> for LocalSnapshot {
    fn name(&self) -> &'static str {
        "snapshot"
    }

    fn lookup(&self, key: &RealmId) -> Result<Option<UserId>, TierError> {
        self.read(|realms| realms.get(key).and_then(|mirror| mirror.owner.clone()))
    }
}

impl Tier<MemberKey, RoleSet> for LocalSnapshot {
    fn name(&self) -> &'static str {
        "snapshot"
    }

    fn lookup(&self, key: &MemberKey) -> Result<Option<RoleSet>, TierError> {
        self.read(|realms| {
            realms
                .get(key.realm())
                .and_then(|mirror| mirror.members.get(key.actor()).cloned())
        })
    }
}
