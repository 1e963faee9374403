//! Webhook-embed configuration mutations with compensation.
//!
//! Each mutation runs a fixed plan of steps:
//!
//! | Operation | Steps                              |
//! |-----------|------------------------------------|
//! | create    | validate, persist, apply           |
//! | update    | load, validate, persist, apply     |
//! | delete    | load, apply, persist               |
//!
//! Validation probes the target endpoint according to the resolved
//! [`ValidationPolicy`]. Apply only runs when requested. When apply fails
//! after persistence, [`ConfigMutationSaga`] compensates the persisted change
//! before reporting the failure: a created record is removed and an updated
//! record is restored under its original key. Delete applies before it
//! persists, so an apply failure leaves the record in place.

mod patch;
mod remote;
mod repository;
mod scope;

use std::sync::Arc;
use std::time::Duration;

use herald_config::{ValidationMode, ValidationPolicy};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::store::{Scope, StoreError};

pub use patch::{EmbedPayload, MessageId, PatchChanges, PatchError, WebhookEmbedPatch, WebhookTarget};
pub use remote::{
    NO_APPLIER_MESSAGE, PatchApplier, RemoteError, TargetProbe, TcpReachabilityProbe,
    UnconfiguredApplier,
};
pub use repository::{PATCHES_KEY, PatchRepository};
pub use scope::{ScopeSelector, resolve_scope};

/// Tracing target for saga operations.
pub(crate) const SAGA_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::saga");

/// Mutation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Add a new patch.
    Create,
    /// Change an existing patch, possibly re-keying it.
    Update,
    /// Remove a patch.
    Delete,
}

impl Operation {
    /// Ordered steps run for this operation.
    #[must_use]
    pub const fn plan(self) -> &'static [SagaStep] {
        match self {
            Self::Create => &[SagaStep::Validate, SagaStep::Persist, SagaStep::Apply],
            Self::Update => &[
                SagaStep::Load,
                SagaStep::Validate,
                SagaStep::Persist,
                SagaStep::Apply,
            ],
            Self::Delete => &[SagaStep::Load, SagaStep::Apply, SagaStep::Persist],
        }
    }

    /// Lower-case name for messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// One step of a mutation plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SagaStep {
    /// Read the existing record.
    Load,
    /// Probe the target endpoint.
    Validate,
    /// Write the change to the store.
    Persist,
    /// Push the change to the webhook message.
    Apply,
}

/// What happened to persisted state after an apply failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rollback {
    /// Nothing had been persisted.
    NotNeeded,
    /// The newly created record was removed.
    RolledBack,
    /// The previous record was restored.
    Restored,
    /// Compensation itself failed; the store may hold the new state.
    Failed {
        /// Why compensation failed.
        message: String,
    },
}

impl Rollback {
    fn notice(&self) -> String {
        match self {
            Self::NotNeeded => "nothing was changed".to_owned(),
            Self::RolledBack => "the new entry was rolled back".to_owned(),
            Self::Restored => "the previous entry was restored".to_owned(),
            Self::Failed { message } => {
                format!("rolling back also failed ({message}); the stored entry may be out of sync")
            }
        }
    }
}

/// Failure of a mutation.
#[derive(Debug, Error)]
pub enum SagaError {
    /// No record under the key.
    #[error("no webhook embed patch for message {key} in {scope}")]
    NotFound {
        /// Scope searched.
        scope: Scope,
        /// Missing key.
        key: MessageId,
    },

    /// Key already used by another record.
    #[error("a webhook embed patch for message {key} already exists in {scope}")]
    Conflict {
        /// Scope written.
        scope: Scope,
        /// Taken key.
        key: String,
    },

    /// Strict validation rejected the target.
    #[error("webhook validation failed: {source}")]
    ValidationFailed {
        /// Probe failure.
        #[source]
        source: RemoteError,
    },

    /// Input field was invalid.
    #[error(transparent)]
    InvalidPatch(#[from] PatchError),

    /// Requested scope cannot be used here.
    #[error("{message}")]
    ScopeUnavailable {
        /// Explanation for the user.
        message: String,
    },

    /// Apply failed after the plan reached the apply step.
    #[error(
        "failed to {} the webhook message for {key}: {source}; {}",
        .operation.as_str(),
        .rollback.notice()
    )]
    ApplyFailed {
        /// Operation that failed.
        operation: Operation,
        /// Record key.
        key: MessageId,
        /// Applier failure.
        #[source]
        source: RemoteError,
        /// Compensation outcome.
        rollback: Rollback,
    },

    /// Store failure.
    #[error(transparent)]
    Store(StoreError),
}

impl SagaError {
    /// Creates a scope error.
    pub fn scope(message: impl Into<String>) -> Self {
        Self::ScopeUnavailable {
            message: message.into(),
        }
    }
}

impl From<StoreError> for SagaError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Conflict { scope, key } => Self::Conflict { scope, key },
            other => Self::Store(other),
        }
    }
}

/// Per-mutation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SagaOptions {
    /// Whether to push the change to the webhook now.
    pub apply_now: bool,
    /// Endpoint validation policy.
    pub validation: ValidationPolicy,
}

/// Result of a successful mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SagaOutcome {
    /// Operation performed.
    pub operation: Operation,
    /// Scope mutated.
    pub scope: Scope,
    /// Created, updated or deleted record.
    pub patch: WebhookEmbedPatch,
    /// Soft-validation warnings.
    pub warnings: Vec<String>,
    /// Whether the change was pushed to the webhook.
    pub applied: bool,
}

/// Undo action for a persisted change.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Compensation {
    None,
    Remove {
        key: MessageId,
    },
    Restore {
        current: MessageId,
        previous: WebhookEmbedPatch,
    },
}

enum Request {
    Create,
    Update(PatchChanges),
    Delete,
}

struct SagaRun {
    operation: Operation,
    scope: Scope,
    key: MessageId,
    request: Request,
    options: SagaOptions,
    candidate: Option<WebhookEmbedPatch>,
    compensation: Compensation,
    warnings: Vec<String>,
    applied: bool,
}

impl SagaRun {
    fn candidate(&self) -> Result<&WebhookEmbedPatch, SagaError> {
        self.candidate.as_ref().ok_or_else(|| SagaError::NotFound {
            scope: self.scope.clone(),
            key: self.key.clone(),
        })
    }
}

/// Runs webhook-embed mutations against a [`PatchRepository`].
pub struct ConfigMutationSaga {
    repository: PatchRepository,
    probe: Arc<dyn TargetProbe>,
    applier: Arc<dyn PatchApplier>,
    apply_timeout: Duration,
}

impl ConfigMutationSaga {
    /// Creates a saga.
    pub fn new(
        repository: PatchRepository,
        probe: Arc<dyn TargetProbe>,
        applier: Arc<dyn PatchApplier>,
        apply_timeout: Duration,
    ) -> Self {
        Self {
            repository,
            probe,
            applier,
            apply_timeout,
        }
    }

    /// Repository the saga writes to.
    #[must_use]
    pub fn repository(&self) -> &PatchRepository {
        &self.repository
    }

    /// Creates `patch` in `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`SagaError::Conflict`] when the key exists, a validation
    /// error under strict validation, or [`SagaError::ApplyFailed`] after
    /// removing the new record.
    pub fn create(
        &self,
        scope: Scope,
        patch: WebhookEmbedPatch,
        options: SagaOptions,
    ) -> Result<SagaOutcome, SagaError> {
        let key = patch.message_id.clone();
        self.run(SagaRun {
            candidate: Some(patch),
            ..Self::start(Operation::Create, scope, key, Request::Create, options)
        })
    }

    /// Applies `changes` to the patch stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`SagaError::NotFound`] when `key` is absent,
    /// [`SagaError::Conflict`] when the new key is taken, a validation error
    /// under strict validation, or [`SagaError::ApplyFailed`] after restoring
    /// the previous record.
    pub fn update(
        &self,
        scope: Scope,
        key: MessageId,
        changes: PatchChanges,
        options: SagaOptions,
    ) -> Result<SagaOutcome, SagaError> {
        self.run(Self::start(
            Operation::Update,
            scope,
            key,
            Request::Update(changes),
            options,
        ))
    }

    /// Deletes the patch stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`SagaError::NotFound`] when `key` is absent or
    /// [`SagaError::ApplyFailed`] with the record left in place.
    pub fn delete(
        &self,
        scope: Scope,
        key: MessageId,
        options: SagaOptions,
    ) -> Result<SagaOutcome, SagaError> {
        self.run(Self::start(Operation::Delete, scope, key, Request::Delete, options))
    }

    fn start(
        operation: Operation,
        scope: Scope,
        key: MessageId,
        request: Request,
        options: SagaOptions,
    ) -> SagaRun {
        SagaRun {
            operation,
            scope,
            key,
            request,
            options,
            candidate: None,
            compensation: Compensation::None,
            warnings: Vec::new(),
            applied: false,
        }
    }

    fn run(&self, mut run: SagaRun) -> Result<SagaOutcome, SagaError> {
        for step in run.operation.plan() {
            debug!(
                target: SAGA_TARGET,
                operation = run.operation.as_str(),
                scope = %run.scope,
                key = %run.key,
                ?step,
                "running saga step"
            );
            match step {
                SagaStep::Load => self.load(&mut run)?,
                SagaStep::Validate => self.validate(&mut run)?,
                SagaStep::Persist => self.persist(&mut run)?,
                SagaStep::Apply => self.apply(&mut run)?,
            }
        }

        let patch = run.candidate()?.clone();
        info!(
            target: SAGA_TARGET,
            operation = run.operation.as_str(),
            scope = %run.scope,
            key = %patch.message_id,
            applied = run.applied,
            warnings = run.warnings.len(),
            "webhook embed mutation completed"
        );
        Ok(SagaOutcome {
            operation: run.operation,
            scope: run.scope,
            patch,
            warnings: run.warnings,
            applied: run.applied,
        })
    }

    fn load(&self, run: &mut SagaRun) -> Result<(), SagaError> {
        let existing = self
            .repository
            .get(&run.scope, &run.key)?
            .ok_or_else(|| SagaError::NotFound {
                scope: run.scope.clone(),
                key: run.key.clone(),
            })?;
        run.candidate = Some(match &run.request {
            Request::Update(changes) => changes.apply_to(&existing),
            Request::Create | Request::Delete => existing,
        });
        Ok(())
    }

    fn validate(&self, run: &mut SagaRun) -> Result<(), SagaError> {
        let policy = run.options.validation;
        if !policy.probes() {
            return Ok(());
        }
        let candidate = run.candidate()?;
        let Err(failure) =
            self.probe
                .probe(&candidate.webhook_url, &candidate.message_id, policy.timeout())
        else {
            return Ok(());
        };

        match policy.mode() {
            ValidationMode::Strict => {
                warn!(
                    target: SAGA_TARGET,
                    key = %run.key,
                    webhook = %candidate.webhook_url.redacted(),
                    error = %failure,
                    "strict validation rejected webhook"
                );
                Err(SagaError::ValidationFailed { source: failure })
            }
            ValidationMode::Soft | ValidationMode::Off => {
                warn!(
                    target: SAGA_TARGET,
                    key = %run.key,
                    error = %failure,
                    "webhook validation failed; continuing"
                );
                run.warnings
                    .push(format!("Webhook validation failed: {failure}. Saved anyway."));
                Ok(())
            }
        }
    }

    fn persist(&self, run: &mut SagaRun) -> Result<(), SagaError> {
        let candidate = run.candidate()?.clone();
        match run.operation {
            Operation::Create => {
                self.repository.insert(&run.scope, &candidate)?;
                run.compensation = Compensation::Remove {
                    key: candidate.message_id,
                };
            }
            Operation::Update => {
                let previous = self
                    .repository
                    .replace(&run.scope, &run.key, &candidate)
                    .map_err(|error| match error {
                        StoreError::Missing { .. } => SagaError::NotFound {
                            scope: run.scope.clone(),
                            key: run.key.clone(),
                        },
                        other => other.into(),
                    })?;
                if let Some(previous) = previous {
                    run.compensation = Compensation::Restore {
                        current: candidate.message_id,
                        previous,
                    };
                }
            }
            Operation::Delete => {
                if self.repository.remove(&run.scope, &run.key)?.is_none() {
                    return Err(SagaError::NotFound {
                        scope: run.scope.clone(),
                        key: run.key.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn apply(&self, run: &mut SagaRun) -> Result<(), SagaError> {
        if !run.options.apply_now {
            return Ok(());
        }
        let candidate = run.candidate()?;
        match self.applier.apply(candidate, self.apply_timeout) {
            Ok(()) => {
                run.applied = true;
                Ok(())
            }
            Err(failure) => {
                warn!(
                    target: SAGA_TARGET,
                    operation = run.operation.as_str(),
                    key = %run.key,
                    error = %failure,
                    "apply failed; compensating"
                );
                let compensation = std::mem::replace(&mut run.compensation, Compensation::None);
                let rollback = self.compensate(&run.scope, compensation);
                Err(SagaError::ApplyFailed {
                    operation: run.operation,
                    key: run.key.clone(),
                    source: failure,
                    rollback,
                })
            }
        }
    }

    /// Undoes a persisted change. The only place rollback happens.
    fn compensate(&self, scope: &Scope, compensation: Compensation) -> Rollback {
        let outcome = match &compensation {
            Compensation::None => return Rollback::NotNeeded,
            Compensation::Remove { key } => self
                .repository
                .remove(scope, key)
                .map(|_| Rollback::RolledBack),
            Compensation::Restore { current, previous } => self
                .repository
                .restore(scope, current, previous)
                .map(|()| Rollback::Restored),
        };
        outcome.unwrap_or_else(|failure| {
            error!(
                target: SAGA_TARGET,
                %scope,
                ?compensation,
                error = %failure,
                "compensation failed"
            );
            Rollback::Failed {
                message: failure.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests;
