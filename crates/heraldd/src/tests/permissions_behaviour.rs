//! Behavioural tests for the permission cascade as wired into the router.

use std::cell::RefCell;

use herald_perms::{PermissionResolver, RealmId, RoleId, UserId};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use super::support::TestRouter;

struct CascadeWorld {
    harness: TestRouter,
}

impl CascadeWorld {
    fn permissions(&self) -> &PermissionResolver {
        self.harness.router.permissions()
    }

    fn resolve_owner(&self, realm: &str) -> UserId {
        self.permissions()
            .owner(&RealmId::new(realm))
            .expect("owner should resolve")
    }
}

#[fixture]
fn world() -> RefCell<CascadeWorld> {
    RefCell::new(CascadeWorld {
        harness: TestRouter::new(),
    })
}

#[given("the authority says {owner} owns realm {realm}")]
fn given_authority_owner(world: &RefCell<CascadeWorld>, owner: String, realm: String) {
    world.borrow().harness.authority.set_owner(&realm, &owner);
}

#[given("the authority gives {actor} the {role} role in realm {realm}")]
fn given_authority_roles(world: &RefCell<CascadeWorld>, actor: String, role: String, realm: String) {
    world
        .borrow()
        .harness
        .authority
        .set_roles(&realm, &actor, &[role.as_str()]);
}

#[given("the snapshot records {owner} as the owner of realm {realm}")]
fn given_snapshot_owner(world: &RefCell<CascadeWorld>, owner: String, realm: String) {
    world
        .borrow()
        .harness
        .snapshot
        .record_owner(RealmId::new(realm), UserId::new(owner));
}

#[given("the owner of {realm} was resolved once")]
fn given_resolved_once(world: &RefCell<CascadeWorld>, realm: String) {
    world.borrow().resolve_owner(&realm);
}

#[when("the owner of {realm} is resolved twice")]
fn when_resolved_twice(world: &RefCell<CascadeWorld>, realm: String) {
    let world = world.borrow();
    let first = world.resolve_owner(&realm);
    let second = world.resolve_owner(&realm);
    assert_eq!(first, second);
}

#[when("the cached owner of {realm} is evicted")]
fn when_evicted(world: &RefCell<CascadeWorld>, realm: String) {
    world
        .borrow()
        .permissions()
        .invalidate_owner(&RealmId::new(realm));
}

#[when("the authority goes offline")]
fn when_offline(world: &RefCell<CascadeWorld>) {
    world.borrow().harness.authority.go_offline();
}

#[then("{actor} is reported as the owner of {realm}")]
fn then_is_owner(world: &RefCell<CascadeWorld>, actor: String, realm: String) {
    let owns = world
        .borrow()
        .permissions()
        .is_owner(&RealmId::new(realm), &UserId::new(actor))
        .expect("ownership should resolve");
    assert!(owns);
}

#[then("the authority was asked for an owner {count} times")]
fn then_owner_calls(world: &RefCell<CascadeWorld>, count: usize) {
    assert_eq!(world.borrow().harness.authority.owner_calls(), count);
}

#[then("{actor} may run gated commands in {realm} when {role} are allowed")]
fn then_permitted(world: &RefCell<CascadeWorld>, actor: String, realm: String, role: String) {
    assert!(world.borrow().permissions().has_permission(
        &RealmId::new(realm),
        &UserId::new(actor),
        &[RoleId::new(role)],
    ));
}

#[then("{actor} may not run gated commands in {realm} when {role} are allowed")]
fn then_refused(world: &RefCell<CascadeWorld>, actor: String, realm: String, role: String) {
    assert!(!world.borrow().permissions().has_permission(
        &RealmId::new(realm),
        &UserId::new(actor),
        &[RoleId::new(role)],
    ));
}

#[scenario(
    path = "tests/features/permission_cascade.feature",
    name = "Authority answers converge into the fast cache"
)]
fn authority_answers_converge(world: RefCell<CascadeWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/permission_cascade.feature",
    name = "Evicted answers are recovered from the durable store"
)]
fn evicted_answers_recovered(world: RefCell<CascadeWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/permission_cascade.feature",
    name = "Snapshot answers never reach the authority"
)]
fn snapshot_answers(world: RefCell<CascadeWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/permission_cascade.feature",
    name = "Members need an allow-listed role"
)]
fn members_need_roles(world: RefCell<CascadeWorld>) {
    drop(world);
}
