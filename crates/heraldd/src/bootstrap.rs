//! Daemon bootstrap orchestration.

use std::io::{BufRead, Write};
use std::sync::Arc;

use herald_config::Config;
use herald_perms::{LocalSnapshot, PermissionResolver, RemoteAuthority, UnreachableAuthority};
use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use crate::commands::WebhookEmbedCommands;
use crate::dispatch::{CommandRouter, TransportError};
use crate::health::HealthReporter;
use crate::saga::{
    ConfigMutationSaga, PatchApplier, PatchRepository, TargetProbe, TcpReachabilityProbe,
    UnconfiguredApplier,
};
use crate::settings::{SettingsSource, StoreSettings};
use crate::store::{FileStore, KeyValueStore, MemoryStore, StoreError, StorePermissions};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};
use crate::transport::{self, ServeSummary};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    ///
    /// # Errors
    ///
    /// Returns the loader's error when configuration cannot be resolved.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that returns a fixed configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The durable store could not be opened.
    #[error("failed to open store: {source}")]
    Store {
        /// Underlying store error.
        #[source]
        source: StoreError,
    },
}

/// External collaborators wired into the daemon.
pub struct Collaborators {
    /// Source of truth for ownership and membership.
    pub authority: Arc<dyn RemoteAuthority>,
    /// Endpoint probe used by validation.
    pub probe: Arc<dyn TargetProbe>,
    /// Applier used when a mutation asks to apply now.
    pub applier: Arc<dyn PatchApplier>,
    /// Event-maintained permission mirror.
    pub snapshot: Arc<LocalSnapshot>,
    /// Store to use instead of the configured one.
    pub store: Option<Arc<dyn KeyValueStore>>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            authority: Arc::new(UnreachableAuthority),
            probe: Arc::new(TcpReachabilityProbe),
            applier: Arc::new(UnconfiguredApplier),
            snapshot: Arc::new(LocalSnapshot::new()),
            store: None,
        }
    }
}

/// Result of a successful bootstrap invocation.
pub struct Daemon {
    config: Config,
    router: CommandRouter,
    snapshot: Arc<LocalSnapshot>,
    store: Arc<dyn KeyValueStore>,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl Daemon {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Router with every command registered.
    #[must_use]
    pub fn router(&self) -> &CommandRouter {
        &self.router
    }

    /// Permission mirror fed by platform events.
    #[must_use]
    pub fn snapshot(&self) -> &Arc<LocalSnapshot> {
        &self.snapshot
    }

    /// Store shared by settings, permissions and patches.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Serves interactions from `input` until it closes.
    ///
    /// # Errors
    ///
    /// Returns an error when the streams fail.
    pub fn serve<R, W>(&self, input: R, output: W) -> Result<ServeSummary, TransportError>
    where
        R: BufRead,
        W: Write + Send,
    {
        let summary = transport::serve(&self.router, input, output)?;
        self.reporter.serve_finished(&summary);
        Ok(summary)
    }
}

/// Bootstraps the daemon using the supplied collaborators.
///
/// # Errors
///
/// Returns an error when configuration, telemetry or the store fail.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    collaborators: Collaborators,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();
    let fail = |error: BootstrapError| {
        reporter.bootstrap_failed(&error);
        error
    };

    let config = loader
        .load()
        .map_err(|source| fail(BootstrapError::Configuration { source }))?;
    let telemetry = telemetry::initialise(&config)
        .map_err(|source| fail(BootstrapError::Telemetry { source }))?;
    let store = match collaborators.store {
        Some(store) => store,
        None => open_store(&config).map_err(|source| fail(BootstrapError::Store { source }))?,
    };

    let router = build_router(
        &config,
        &collaborators.snapshot,
        &store,
        collaborators.authority,
        collaborators.probe,
        collaborators.applier,
    );
    reporter.bootstrap_succeeded(&config, &router.command_names());

    Ok(Daemon {
        config,
        router,
        snapshot: collaborators.snapshot,
        store,
        telemetry,
        reporter,
    })
}

fn open_store(config: &Config) -> Result<Arc<dyn KeyValueStore>, StoreError> {
    Ok(match config.store_path() {
        Some(path) => Arc::new(FileStore::open(path)?),
        None => Arc::new(MemoryStore::new()),
    })
}

fn build_router(
    config: &Config,
    snapshot: &Arc<LocalSnapshot>,
    store: &Arc<dyn KeyValueStore>,
    authority: Arc<dyn RemoteAuthority>,
    probe: Arc<dyn TargetProbe>,
    applier: Arc<dyn PatchApplier>,
) -> CommandRouter {
    let permissions = PermissionResolver::builder(authority)
        .snapshot(Arc::clone(snapshot))
        .store(Arc::new(StorePermissions::new(Arc::clone(store))))
        .cache_capacity(config.fast_cache_capacity())
        .authority_timeout(config.authority_timeout())
        .build();
    let settings: Arc<dyn SettingsSource> = Arc::new(StoreSettings::new(Arc::clone(store)));
    let router = CommandRouter::new(Arc::new(permissions), Arc::clone(&settings));

    let saga = ConfigMutationSaga::new(
        PatchRepository::new(Arc::clone(store)),
        probe,
        applier,
        config.apply_timeout(),
    );
    Arc::new(WebhookEmbedCommands::new(
        saga,
        settings,
        config.validation_policy(),
        config.list_page_size(),
    ))
    .register(&router);
    router
}
