//! Router harness wired to in-memory collaborators.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use herald_config::{ValidationMode, ValidationPolicy};
use herald_perms::{LocalSnapshot, PermissionResolver, RealmId, RoleId};

use crate::commands::WebhookEmbedCommands;
use crate::dispatch::CommandRouter;
use crate::interaction::Interaction;
use crate::saga::{
    ConfigMutationSaga, MessageId, PatchApplier, PatchRepository, RemoteError, TargetProbe,
    WebhookEmbedPatch, WebhookTarget,
};
use crate::settings::{RealmSettings, StoreSettings};
use crate::store::{KeyValueStore, MemoryStore, StorePermissions};

use super::{RecordingResponder, StaticAuthority};

/// Applier that records applied patches and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingApplier {
    applied: Mutex<Vec<WebhookEmbedPatch>>,
    failing: AtomicBool,
}

impl RecordingApplier {
    /// Makes later applications fail.
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    /// Patches applied so far.
    pub fn applied(&self) -> Vec<WebhookEmbedPatch> {
        self.applied.lock().expect("applier lock").clone()
    }
}

impl PatchApplier for RecordingApplier {
    fn apply(&self, patch: &WebhookEmbedPatch, _timeout: Duration) -> Result<(), RemoteError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RemoteError::failed("webhook returned 500"));
        }
        self.applied.lock().expect("applier lock").push(patch.clone());
        Ok(())
    }
}

/// Probe that either accepts every target or rejects every target.
#[derive(Debug, Default)]
pub struct ScriptedProbe {
    unreachable: AtomicBool,
}

impl ScriptedProbe {
    /// Makes later probes fail.
    pub fn reject(&self) {
        self.unreachable.store(true, Ordering::SeqCst);
    }
}

impl TargetProbe for ScriptedProbe {
    fn probe(
        &self,
        _target: &WebhookTarget,
        _message: &MessageId,
        timeout: Duration,
    ) -> Result<(), RemoteError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(RemoteError::timeout(timeout));
        }
        Ok(())
    }
}

/// A router over a memory store, a static authority and a snapshot.
pub struct TestRouter {
    pub router: CommandRouter,
    pub store: Arc<dyn KeyValueStore>,
    pub authority: Arc<StaticAuthority>,
    pub snapshot: Arc<LocalSnapshot>,
    pub settings: Arc<StoreSettings>,
    pub applier: Arc<RecordingApplier>,
    pub probe: Arc<ScriptedProbe>,
}

impl TestRouter {
    #[must_use]
    pub fn new() -> Self {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let authority = Arc::new(StaticAuthority::default());
        let snapshot = Arc::new(LocalSnapshot::new());
        let permissions = PermissionResolver::builder(Arc::clone(&authority) as _)
            .snapshot(Arc::clone(&snapshot))
            .store(Arc::new(StorePermissions::new(Arc::clone(&store))))
            .build();
        let settings = Arc::new(StoreSettings::new(Arc::clone(&store)));
        let router = CommandRouter::new(Arc::new(permissions), Arc::clone(&settings) as _);
        Self {
            router,
            store,
            authority,
            snapshot,
            settings,
            applier: Arc::new(RecordingApplier::default()),
            probe: Arc::new(ScriptedProbe::default()),
        }
    }

    /// Registers the `webhook-embed` group with `mode` as the global policy.
    pub fn install_webhook_embeds(&self, mode: ValidationMode) {
        let saga = ConfigMutationSaga::new(
            PatchRepository::new(Arc::clone(&self.store)),
            Arc::clone(&self.probe) as _,
            Arc::clone(&self.applier) as _,
            Duration::from_millis(100),
        );
        Arc::new(WebhookEmbedCommands::new(
            saga,
            Arc::clone(&self.settings) as _,
            ValidationPolicy::new(mode, Duration::from_millis(100)),
            10,
        ))
        .register(&self.router);
    }

    /// Stores `roles` as the allow-list of `realm`.
    pub fn allow(&self, realm: &str, roles: &[&str]) {
        let settings = RealmSettings {
            allowed_roles: roles.iter().map(|role| RoleId::new(*role)).collect(),
            ..RealmSettings::default()
        };
        self.settings
            .save(&RealmId::new(realm), &settings)
            .expect("save realm settings");
    }

    /// Dispatches `interaction` and returns what was sent for it.
    pub fn dispatch(&self, interaction: &Interaction) -> RecordingResponder {
        let responder = RecordingResponder::default();
        self.router.dispatch(interaction, &responder);
        responder
    }

    /// Patch repository over the harness store.
    pub fn repository(&self) -> PatchRepository {
        PatchRepository::new(Arc::clone(&self.store))
    }
}
