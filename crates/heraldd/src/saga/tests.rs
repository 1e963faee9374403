//! Unit tests for the mutation saga.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use herald_perms::RealmId;
use mockall::mock;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use super::*;
use crate::store::{KeyValueStore, MemoryStore, Transaction};

mock! {
    Applier {}
    impl PatchApplier for Applier {
        fn apply(&self, patch: &WebhookEmbedPatch, timeout: Duration) -> Result<(), RemoteError>;
    }
}

mock! {
    Probe {}
    impl TargetProbe for Probe {
        fn probe(
            &self,
            target: &WebhookTarget,
            message: &MessageId,
            timeout: Duration,
        ) -> Result<(), RemoteError>;
    }
}

fn patch(id: &str, title: &str) -> WebhookEmbedPatch {
    WebhookEmbedPatch::new(
        MessageId::parse(id).expect("id"),
        WebhookTarget::parse("https://host/api/webhooks/55/token").expect("url"),
        EmbedPayload::from_value(json!({ "title": title })).expect("payload"),
    )
}

fn key(id: &str) -> MessageId {
    MessageId::parse(id).expect("id")
}

fn options(apply_now: bool, mode: ValidationMode) -> SagaOptions {
    SagaOptions {
        apply_now,
        validation: ValidationPolicy::new(mode, Duration::from_millis(250)),
    }
}

fn quiet() -> SagaOptions {
    options(false, ValidationMode::Off)
}

fn unused_probe() -> MockProbe {
    let mut probe = MockProbe::new();
    probe.expect_probe().never();
    probe
}

fn succeeding_applier() -> MockApplier {
    let mut applier = MockApplier::new();
    applier.expect_apply().returning(|_, _| Ok(()));
    applier
}

fn failing_applier() -> MockApplier {
    let mut applier = MockApplier::new();
    applier
        .expect_apply()
        .returning(|_, _| Err(RemoteError::failed("webhook returned 404")));
    applier
}

fn saga_with(store: Arc<dyn KeyValueStore>, probe: MockProbe, applier: MockApplier) -> ConfigMutationSaga {
    ConfigMutationSaga::new(
        PatchRepository::new(store),
        Arc::new(probe),
        Arc::new(applier),
        Duration::from_secs(1),
    )
}

#[fixture]
fn realm() -> Scope {
    Scope::Realm(RealmId::new("g1"))
}

#[rstest]
fn plans_follow_the_operation_tables() {
    assert_eq!(
        Operation::Create.plan(),
        &[SagaStep::Validate, SagaStep::Persist, SagaStep::Apply]
    );
    assert_eq!(
        Operation::Update.plan(),
        &[SagaStep::Load, SagaStep::Validate, SagaStep::Persist, SagaStep::Apply]
    );
    assert_eq!(
        Operation::Delete.plan(),
        &[SagaStep::Load, SagaStep::Apply, SagaStep::Persist]
    );
}

#[rstest]
fn create_read_update_delete_round_trip(realm: Scope) {
    let saga = saga_with(Arc::new(MemoryStore::new()), unused_probe(), succeeding_applier());

    let created = saga
        .create(realm.clone(), patch("100", "first"), options(true, ValidationMode::Off))
        .expect("create");
    assert!(created.applied);
    assert_eq!(
        saga.repository().get(&realm, &key("100")).expect("read"),
        Some(patch("100", "first"))
    );

    let changes = PatchChanges {
        embed: Some(EmbedPayload::from_value(json!({"title": "second"})).expect("payload")),
        ..PatchChanges::default()
    };
    saga.update(realm.clone(), key("100"), changes, quiet())
        .expect("update");
    assert_eq!(
        saga.repository().get(&realm, &key("100")).expect("read"),
        Some(patch("100", "second"))
    );

    let deleted = saga.delete(realm.clone(), key("100"), quiet()).expect("delete");
    assert_eq!(deleted.patch, patch("100", "second"));
    assert_eq!(saga.repository().get(&realm, &key("100")).expect("read"), None);
}

#[rstest]
fn duplicate_create_conflicts_without_applying(realm: Scope) {
    let mut applier = MockApplier::new();
    applier.expect_apply().times(1).returning(|_, _| Ok(()));
    let saga = saga_with(Arc::new(MemoryStore::new()), unused_probe(), applier);
    saga.create(realm.clone(), patch("1", "a"), options(true, ValidationMode::Off))
        .expect("first create");

    let error = saga
        .create(realm.clone(), patch("1", "b"), options(true, ValidationMode::Off))
        .expect_err("duplicate");

    assert!(matches!(error, SagaError::Conflict { .. }));
    assert_eq!(
        saga.repository().get(&realm, &key("1")).expect("read"),
        Some(patch("1", "a"))
    );
}

#[rstest]
fn failed_apply_rolls_back_a_create(realm: Scope) {
    let saga = saga_with(Arc::new(MemoryStore::new()), unused_probe(), failing_applier());

    let error = saga
        .create(realm.clone(), patch("7", "a"), options(true, ValidationMode::Off))
        .expect_err("apply fails");

    assert!(matches!(
        &error,
        SagaError::ApplyFailed { rollback: Rollback::RolledBack, .. }
    ));
    assert!(error.to_string().contains("rolled back"), "{error}");
    assert_eq!(saga.repository().get(&realm, &key("7")).expect("read"), None);
}

#[rstest]
fn applying_without_a_configured_applier_rolls_back(realm: Scope) {
    let saga = ConfigMutationSaga::new(
        PatchRepository::new(Arc::new(MemoryStore::new())),
        Arc::new(unused_probe()),
        Arc::new(UnconfiguredApplier),
        Duration::from_secs(1),
    );

    let error = saga
        .create(realm.clone(), patch("8", "a"), options(true, ValidationMode::Off))
        .expect_err("nothing can apply the patch");

    assert!(error.to_string().contains(NO_APPLIER_MESSAGE), "{error}");
    assert!(error.to_string().contains("rolled back"), "{error}");
    assert_eq!(saga.repository().get(&realm, &key("8")).expect("read"), None);
}

#[rstest]
fn failed_apply_restores_a_rekeyed_update(realm: Scope) {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    PatchRepository::new(store.clone())
        .insert(&realm, &patch("1", "original"))
        .expect("seed");
    let saga = saga_with(store, unused_probe(), failing_applier());

    let changes = PatchChanges {
        message_id: Some(key("2")),
        embed: Some(EmbedPayload::from_value(json!({"title": "changed"})).expect("payload")),
        ..PatchChanges::default()
    };
    let error = saga
        .update(realm.clone(), key("1"), changes, options(true, ValidationMode::Off))
        .expect_err("apply fails");

    assert!(error.to_string().contains("restored"), "{error}");
    assert_eq!(
        saga.repository().list(&realm).expect("list"),
        vec![patch("1", "original")]
    );
}

#[rstest]
fn update_into_a_taken_key_conflicts(realm: Scope) {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let repository = PatchRepository::new(store.clone());
    repository.insert(&realm, &patch("1", "a")).expect("seed");
    repository.insert(&realm, &patch("2", "b")).expect("seed");
    let saga = saga_with(store, unused_probe(), succeeding_applier());

    let changes = PatchChanges {
        message_id: Some(key("2")),
        ..PatchChanges::default()
    };
    let error = saga
        .update(realm.clone(), key("1"), changes, quiet())
        .expect_err("conflict");

    assert!(matches!(error, SagaError::Conflict { .. }));
    assert_eq!(
        repository.list(&realm).expect("list"),
        vec![patch("1", "a"), patch("2", "b")]
    );
}

#[rstest]
fn missing_records_are_not_found(realm: Scope) {
    let saga = saga_with(Arc::new(MemoryStore::new()), unused_probe(), succeeding_applier());

    let update = saga.update(realm.clone(), key("9"), PatchChanges::default(), quiet());
    let delete = saga.delete(realm, key("9"), quiet());

    assert!(matches!(update, Err(SagaError::NotFound { .. })));
    assert!(matches!(delete, Err(SagaError::NotFound { .. })));
}

#[rstest]
fn failed_apply_keeps_a_deleted_record(realm: Scope) {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    PatchRepository::new(store.clone())
        .insert(&realm, &patch("3", "keep"))
        .expect("seed");
    let saga = saga_with(store, unused_probe(), failing_applier());

    let error = saga
        .delete(realm.clone(), key("3"), options(true, ValidationMode::Off))
        .expect_err("apply fails");

    assert!(matches!(
        error,
        SagaError::ApplyFailed { rollback: Rollback::NotNeeded, .. }
    ));
    assert!(saga.repository().get(&realm, &key("3")).expect("read").is_some());
}

#[rstest]
#[case::strict_aborts(ValidationMode::Strict, false, 0)]
#[case::soft_warns(ValidationMode::Soft, true, 1)]
fn probe_failures_follow_the_validation_mode(
    realm: Scope,
    #[case] mode: ValidationMode,
    #[case] persisted: bool,
    #[case] warnings: usize,
) {
    let mut probe = MockProbe::new();
    probe
        .expect_probe()
        .withf(|_, _, timeout| *timeout == Duration::from_millis(250))
        .times(1)
        .returning(|_, _, _| Err(RemoteError::timeout(Duration::from_millis(250))));
    let saga = saga_with(Arc::new(MemoryStore::new()), probe, succeeding_applier());

    let result = saga.create(realm.clone(), patch("5", "a"), options(false, mode));

    match result {
        Ok(outcome) => assert_eq!(outcome.warnings.len(), warnings),
        Err(error) => {
            assert!(matches!(error, SagaError::ValidationFailed { .. }));
            assert_eq!(warnings, 0);
        }
    }
    assert_eq!(
        saga.repository().get(&realm, &key("5")).expect("read").is_some(),
        persisted
    );
}

#[rstest]
fn apply_is_skipped_unless_requested(realm: Scope) {
    let mut applier = MockApplier::new();
    applier.expect_apply().never();
    let saga = saga_with(Arc::new(MemoryStore::new()), unused_probe(), applier);

    let outcome = saga
        .create(realm, patch("8", "a"), quiet())
        .expect("create");
    assert!(!outcome.applied);
}

/// Store whose transactions start failing once `broken` is set.
struct BreakableStore {
    inner: MemoryStore,
    broken: Arc<AtomicBool>,
}

impl KeyValueStore for BreakableStore {
    fn get(&self, scope: &Scope, key: &str) -> Result<Option<Value>, StoreError> {
        self.inner.get(scope, key)
    }

    fn put(&self, scope: &Scope, key: &str, value: Value) -> Result<(), StoreError> {
        self.inner.put(scope, key, value)
    }

    fn delete(&self, scope: &Scope, key: &str) -> Result<bool, StoreError> {
        self.inner.delete(scope, key)
    }

    fn transact(
        &self,
        scope: &Scope,
        key: &str,
        apply: &mut Transaction<'_>,
    ) -> Result<(), StoreError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(StoreError::Poisoned);
        }
        self.inner.transact(scope, key, apply)
    }

    fn next_sequence(&self, realm: &RealmId) -> Result<u64, StoreError> {
        self.inner.next_sequence(realm)
    }
}

#[rstest]
fn compensation_failure_is_reported(realm: Scope) {
    let broken = Arc::new(AtomicBool::new(false));
    let store = Arc::new(BreakableStore {
        inner: MemoryStore::new(),
        broken: broken.clone(),
    });
    let mut applier = MockApplier::new();
    applier.expect_apply().returning(move |_, _| {
        broken.store(true, Ordering::SeqCst);
        Err(RemoteError::failed("boom"))
    });
    let saga = saga_with(store, unused_probe(), applier);

    let error = saga
        .create(realm, patch("4", "a"), options(true, ValidationMode::Off))
        .expect_err("apply fails");

    assert!(matches!(
        error,
        SagaError::ApplyFailed { rollback: Rollback::Failed { .. }, .. }
    ));
}
