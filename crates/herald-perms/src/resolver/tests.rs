//! Resolver behaviour over the standard four-tier layout.

use std::collections::HashMap;
use std::sync::Mutex;

use mockall::mock;
use mockall::predicate::always;
use rstest::{fixture, rstest};

use super::*;
use crate::error::{AuthorityError, TierError};

mock! {
    Authority {}
    impl RemoteAuthority for Authority {
        fn owner(&self, realm: &RealmId, timeout: Duration) -> Result<UserId, AuthorityError>;
        fn member_roles(
            &self,
            realm: &RealmId,
            actor: &UserId,
            timeout: Duration,
        ) -> Result<RoleSet, AuthorityError>;
    }
}

#[derive(Default)]
struct MemoryPermissionStore {
    owners: Mutex<HashMap<RealmId, UserId>>,
    roles: Mutex<HashMap<(RealmId, UserId), RoleSet>>,
}

impl PermissionStore for MemoryPermissionStore {
    fn load_owner(&self, realm: &RealmId) -> Result<Option<UserId>, TierError> {
        Ok(self.owners.lock().expect("owners lock").get(realm).cloned())
    }

    fn save_owner(&self, realm: &RealmId, owner: &UserId) -> Result<(), TierError> {
        self.owners
            .lock()
            .expect("owners lock")
            .insert(realm.clone(), owner.clone());
        Ok(())
    }

    fn load_roles(&self, realm: &RealmId, actor: &UserId) -> Result<Option<RoleSet>, TierError> {
        Ok(self
            .roles
            .lock()
            .expect("roles lock")
            .get(&(realm.clone(), actor.clone()))
            .cloned())
    }

    fn save_roles(&self, realm: &RealmId, actor: &UserId, roles: &RoleSet) -> Result<(), TierError> {
        self.roles
            .lock()
            .expect("roles lock")
            .insert((realm.clone(), actor.clone()), roles.clone());
        Ok(())
    }
}

fn realm() -> RealmId {
    RealmId::new("g1")
}

fn roles(ids: &[&str]) -> RoleSet {
    ids.iter().map(|id| RoleId::new(*id)).collect()
}

#[fixture]
fn store() -> Arc<MemoryPermissionStore> {
    Arc::new(MemoryPermissionStore::default())
}

fn resolver_with(
    authority: MockAuthority,
    store: Arc<MemoryPermissionStore>,
    snapshot: Arc<LocalSnapshot>,
) -> PermissionResolver {
    PermissionResolver::builder(Arc::new(authority))
        .snapshot(snapshot)
        .store(store)
        .cache_capacity(16)
        .build()
}

#[rstest]
fn owner_is_always_permitted(store: Arc<MemoryPermissionStore>) {
    let mut authority = MockAuthority::new();
    authority
        .expect_owner()
        .with(always(), always())
        .times(1)
        .returning(|_, _| Ok(UserId::new("owner-1")));
    authority.expect_member_roles().never();
    let resolver = resolver_with(authority, store, Arc::new(LocalSnapshot::new()));

    assert!(resolver.has_permission(&realm(), &UserId::new("owner-1"), &[]));
}

#[rstest]
fn empty_allow_list_denies_non_owner_without_role_lookup(store: Arc<MemoryPermissionStore>) {
    let mut authority = MockAuthority::new();
    authority
        .expect_owner()
        .returning(|_, _| Ok(UserId::new("owner-1")));
    authority.expect_member_roles().never();
    let resolver = resolver_with(authority, store, Arc::new(LocalSnapshot::new()));

    assert!(!resolver.has_permission(&realm(), &UserId::new("someone"), &[]));
}

#[rstest]
#[case::matching_role(&["mod", "staff"], &["staff"], true)]
#[case::disjoint_roles(&["member"], &["staff", "admin"], false)]
#[case::no_roles(&[], &["staff"], false)]
fn allow_list_requires_intersection(
    store: Arc<MemoryPermissionStore>,
    #[case] held: &[&str],
    #[case] allowed: &[&str],
    #[case] expected: bool,
) {
    let snapshot = Arc::new(LocalSnapshot::new());
    snapshot.record_owner(realm(), UserId::new("owner-1"));
    snapshot.record_member(realm(), UserId::new("u1"), roles(held));
    let mut authority = MockAuthority::new();
    authority.expect_owner().never();
    authority.expect_member_roles().never();
    let resolver = resolver_with(authority, store, snapshot);

    let allow_list: Vec<RoleId> = allowed.iter().map(|id| RoleId::new(*id)).collect();
    assert_eq!(
        resolver.has_permission(&realm(), &UserId::new("u1"), &allow_list),
        expected
    );
}

#[rstest]
fn authority_failure_denies(store: Arc<MemoryPermissionStore>) {
    let mut authority = MockAuthority::new();
    authority
        .expect_owner()
        .returning(|_, _| Err(AuthorityError::unreachable("connection refused")));
    let resolver = resolver_with(authority, store, Arc::new(LocalSnapshot::new()));

    assert!(!resolver.has_permission(&realm(), &UserId::new("u1"), &[RoleId::new("staff")]));
    assert!(resolver.is_owner(&realm(), &UserId::new("u1")).is_err());
}

#[rstest]
fn authority_answers_are_persisted_and_cached(store: Arc<MemoryPermissionStore>) {
    let mut authority = MockAuthority::new();
    authority
        .expect_owner()
        .times(1)
        .returning(|_, _| Ok(UserId::new("owner-1")));
    let resolver = resolver_with(authority, store.clone(), Arc::new(LocalSnapshot::new()));

    assert!(resolver.is_owner(&realm(), &UserId::new("owner-1")).expect("first"));
    assert!(resolver.is_owner(&realm(), &UserId::new("owner-1")).expect("second"));
    assert_eq!(
        store.load_owner(&realm()).expect("load"),
        Some(UserId::new("owner-1"))
    );
}

#[rstest]
fn invalidation_forces_a_store_read(store: Arc<MemoryPermissionStore>) {
    store
        .save_roles(&realm(), &UserId::new("u1"), &roles(&["staff"]))
        .expect("seed roles");
    let mut authority = MockAuthority::new();
    authority.expect_member_roles().never();
    let resolver = resolver_with(authority, store.clone(), Arc::new(LocalSnapshot::new()));

    resolver
        .member_roles(&realm(), &UserId::new("u1"))
        .expect("warm cache");
    store
        .save_roles(&realm(), &UserId::new("u1"), &roles(&["admin"]))
        .expect("replace roles");
    let cached = resolver
        .member_roles(&realm(), &UserId::new("u1"))
        .expect("cached read");
    resolver.invalidate_member(&realm(), &UserId::new("u1"));
    let fresh = resolver
        .member_roles(&realm(), &UserId::new("u1"))
        .expect("fresh read");

    assert_eq!(cached, roles(&["staff"]));
    assert_eq!(fresh, roles(&["admin"]));
}
