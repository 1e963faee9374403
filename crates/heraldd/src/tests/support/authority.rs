//! Remote authority double with call counters and an offline switch.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use herald_perms::{AuthorityError, RealmId, RemoteAuthority, RoleId, RoleSet, UserId};

/// Authority answering from in-memory tables.
#[derive(Debug, Default)]
pub struct StaticAuthority {
    owners: Mutex<HashMap<RealmId, UserId>>,
    roles: Mutex<HashMap<(RealmId, UserId), RoleSet>>,
    owner_calls: AtomicUsize,
    role_calls: AtomicUsize,
    offline: AtomicBool,
}

impl StaticAuthority {
    /// Records `owner` as the owner of `realm`.
    pub fn set_owner(&self, realm: &str, owner: &str) {
        self.owners
            .lock()
            .expect("owners lock")
            .insert(RealmId::new(realm), UserId::new(owner));
    }

    /// Records the roles `actor` holds in `realm`.
    pub fn set_roles(&self, realm: &str, actor: &str, roles: &[&str]) {
        self.roles.lock().expect("roles lock").insert(
            (RealmId::new(realm), UserId::new(actor)),
            roles.iter().map(|role| RoleId::new(*role)).collect(),
        );
    }

    /// Makes every later call fail as unreachable.
    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    /// Number of owner lookups served or refused.
    pub fn owner_calls(&self) -> usize {
        self.owner_calls.load(Ordering::SeqCst)
    }

    /// Number of membership lookups served or refused.
    pub fn role_calls(&self) -> usize {
        self.role_calls.load(Ordering::SeqCst)
    }

    fn ensure_online(&self) -> Result<(), AuthorityError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AuthorityError::unreachable("authority offline"));
        }
        Ok(())
    }
}

impl RemoteAuthority for StaticAuthority {
    fn owner(&self, realm: &RealmId, _timeout: Duration) -> Result<UserId, AuthorityError> {
        self.owner_calls.fetch_add(1, Ordering::SeqCst);
        self.ensure_online()?;
        self.owners
            .lock()
            .expect("owners lock")
            .get(realm)
            .cloned()
            .ok_or_else(|| AuthorityError::not_found(realm.to_string()))
    }

    fn member_roles(
        &self,
        realm: &RealmId,
        actor: &UserId,
        _timeout: Duration,
    ) -> Result<RoleSet, AuthorityError> {
        self.role_calls.fetch_add(1, Ordering::SeqCst);
        self.ensure_online()?;
        Ok(self
            .roles
            .lock()
            .expect("roles lock")
            .get(&(realm.clone(), actor.clone()))
            .cloned()
            .unwrap_or_default())
    }
}
