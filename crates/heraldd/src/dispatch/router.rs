//! Command routing, gating and error normalisation.
//!
//! The router is the single entry point for inbound interactions. It resolves
//! the command by name, applies the realm and permission gates, runs the
//! handler with panics contained, and turns whatever comes back into exactly
//! one terminal outbound message.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use herald_perms::{PermissionResolver, RealmId, UserId};
use tracing::{debug, error, warn};

use crate::interaction::{Interaction, InteractionKind};
use crate::settings::SettingsSource;

use super::command::{Command, CommandGroup};
use super::context::{ExecutionContext, SettingsSnapshot};
use super::errors::CommandError;
use super::registry::{AutocompleteHandler, CommandRegistry};
use super::response::{InteractionResponder, MAX_CHOICES, Outbound, Response};

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Routes interactions to registered commands.
pub struct CommandRouter {
    registry: RwLock<CommandRegistry>,
    permissions: Arc<PermissionResolver>,
    settings: Arc<dyn SettingsSource>,
}

impl CommandRouter {
    /// Creates a router with an empty registry.
    pub fn new(permissions: Arc<PermissionResolver>, settings: Arc<dyn SettingsSource>) -> Self {
        Self::with_registry(CommandRegistry::new(), permissions, settings)
    }

    /// Creates a router around a pre-built registry.
    pub fn with_registry(
        registry: CommandRegistry,
        permissions: Arc<PermissionResolver>,
        settings: Arc<dyn SettingsSource>,
    ) -> Self {
        Self {
            registry: RwLock::new(registry),
            permissions,
            settings,
        }
    }

    /// Permission resolver used for gating.
    #[must_use]
    pub fn permissions(&self) -> &PermissionResolver {
        &self.permissions
    }

    fn read_registry(&self) -> RwLockReadGuard<'_, CommandRegistry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_registry<T>(&self, change: impl FnOnce(&mut CommandRegistry) -> T) -> T {
        let mut guard = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        change(&mut guard)
    }

    /// Registers a top-level command, replacing any command with that name.
    pub fn register(&self, command: Command) {
        let name = command.name().to_owned();
        if self.write_registry(|registry| registry.register(command)).is_some() {
            warn!(target: DISPATCH_TARGET, command = %name, "replaced existing command");
        } else {
            debug!(target: DISPATCH_TARGET, command = %name, "registered command");
        }
    }

    /// Registers a group: each child under the group name, then the group's
    /// parent command.
    pub fn register_group(&self, group: CommandGroup) {
        let (parent, children) = group.into_parts();
        for child in children {
            self.register_child(parent.name(), child);
        }
        self.register(parent);
    }

    /// Registers `child` under `parent`, replacing any child with that name.
    pub fn register_child(&self, parent: &str, child: Command) {
        let name = child.name().to_owned();
        if self
            .write_registry(|registry| registry.register_child(parent, child))
            .is_some()
        {
            warn!(target: DISPATCH_TARGET, parent, command = %name, "replaced existing subcommand");
        } else {
            debug!(target: DISPATCH_TARGET, parent, command = %name, "registered subcommand");
        }
    }

    /// Registers the autocomplete handler for the command called `name`.
    pub fn register_autocomplete(&self, name: &str, handler: Arc<dyn AutocompleteHandler>) {
        if self.write_registry(|registry| registry.register_autocomplete(name, handler)) {
            warn!(target: DISPATCH_TARGET, command = name, "replaced autocomplete handler");
        }
    }

    /// Looks up a top-level command.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Command> {
        self.read_registry().lookup(name).cloned()
    }

    /// Looks up a subcommand.
    #[must_use]
    pub fn lookup_child(&self, parent: &str, child: &str) -> Option<Command> {
        self.read_registry().lookup_child(parent, child).cloned()
    }

    /// Registered top-level command names, sorted.
    #[must_use]
    pub fn command_names(&self) -> Vec<String> {
        self.read_registry()
            .names()
            .into_iter()
            .map(str::to_owned)
            .collect()
    }

    /// Handles one interaction, emitting exactly one terminal outbound
    /// message through `responder`.
    pub fn dispatch(&self, interaction: &Interaction, responder: &dyn InteractionResponder) {
        debug!(
            target: DISPATCH_TARGET,
            interaction = %interaction.id,
            command = %interaction.name,
            kind = ?interaction.kind,
            "dispatching interaction"
        );
        match interaction.kind {
            InteractionKind::Command => self.dispatch_command(interaction, responder),
            InteractionKind::Autocomplete => self.dispatch_autocomplete(interaction, responder),
        }
    }

    fn dispatch_command(&self, interaction: &Interaction, responder: &dyn InteractionResponder) {
        let mut ctx = self.build_context(interaction, responder);
        let result = self.run(&mut ctx);
        let deferred = ctx.deferred_ephemeral();

        let mut response = match result {
            Ok(response) => response,
            Err(error) => self.error_response(interaction, &error),
        };
        let outbound = match deferred {
            Some(ephemeral) => {
                response.ephemeral = ephemeral;
                Outbound::Edit { response }
            }
            None => Outbound::Message { response },
        };
        if let Err(error) = responder.send(interaction, outbound) {
            error!(
                target: DISPATCH_TARGET,
                interaction = %interaction.id,
                %error,
                "failed to deliver response"
            );
        }
    }

    fn build_context<'a>(
        &'a self,
        interaction: &'a Interaction,
        responder: &'a dyn InteractionResponder,
    ) -> ExecutionContext<'a> {
        let (realm_owner, settings) = match interaction.realm() {
            Some(realm) => (
                self.resolve_owner(realm, &interaction.actor),
                self.load_settings(realm),
            ),
            None => (false, SettingsSnapshot::Absent),
        };
        ExecutionContext::new(interaction, self, responder, realm_owner, settings)
    }

    fn resolve_owner(&self, realm: &RealmId, actor: &UserId) -> bool {
        self.permissions
            .is_owner(realm, actor)
            .unwrap_or_else(|error| {
                warn!(
                    target: DISPATCH_TARGET,
                    realm = %realm,
                    %error,
                    "owner lookup failed; treating actor as non-owner"
                );
                false
            })
    }

    fn load_settings(&self, realm: &RealmId) -> SettingsSnapshot {
        match self.settings.realm_settings(realm) {
            Ok(Some(settings)) => SettingsSnapshot::Loaded(settings),
            Ok(None) => SettingsSnapshot::Absent,
            Err(error) => {
                warn!(
                    target: DISPATCH_TARGET,
                    realm = %realm,
                    %error,
                    "failed to load realm settings; restricting realm to its owner"
                );
                SettingsSnapshot::Unreadable
            }
        }
    }

    fn run(&self, ctx: &mut ExecutionContext<'_>) -> Result<Response, CommandError> {
        let name = ctx.interaction().name.clone();
        let command = self
            .lookup(&name)
            .ok_or_else(|| CommandError::unknown_command(&name))?;

        ensure_realm(ctx, command.needs_realm())?;
        self.enforce_allow_list(ctx)?;
        self.ensure_permission(ctx, command.needs_permission())?;
        command.validate_options(ctx.options())?;

        invoke(&command, ctx)
    }

    /// Applies a command's own realm and permission flags.
    ///
    /// Used by the router for top-level commands and by group dispatch for
    /// the selected child.
    pub(crate) fn gate(
        &self,
        ctx: &ExecutionContext<'_>,
        requires_realm: bool,
        requires_permission: bool,
    ) -> Result<(), CommandError> {
        ensure_realm(ctx, requires_realm)?;
        self.ensure_permission(ctx, requires_permission)
    }

    fn enforce_allow_list(&self, ctx: &ExecutionContext<'_>) -> Result<(), CommandError> {
        let restricted = ctx.settings_unreadable()
            || ctx
                .settings()
                .is_some_and(|settings| !settings.allowed_roles.is_empty());
        if restricted && !self.authorized(ctx) {
            return Err(CommandError::denied());
        }
        Ok(())
    }

    fn ensure_permission(
        &self,
        ctx: &ExecutionContext<'_>,
        requires_permission: bool,
    ) -> Result<(), CommandError> {
        if requires_permission && !self.authorized(ctx) {
            return Err(CommandError::denied());
        }
        Ok(())
    }

    fn authorized(&self, ctx: &ExecutionContext<'_>) -> bool {
        let Some(realm) = ctx.realm() else {
            return false;
        };
        if ctx.is_realm_owner() {
            return true;
        }
        let allow_list = ctx
            .settings()
            .map(|settings| settings.allowed_roles.as_slice())
            .unwrap_or_default();
        let permitted = self
            .permissions
            .has_permission(realm, ctx.actor(), allow_list);
        if !permitted {
            debug!(
                target: DISPATCH_TARGET,
                realm = %realm,
                actor = %ctx.actor(),
                command = %ctx.path(),
                "permission denied"
            );
        }
        permitted
    }

    fn error_response(&self, interaction: &Interaction, failure: &CommandError) -> Response {
        match failure.kind() {
            Some(kind) => debug!(
                target: DISPATCH_TARGET,
                interaction = %interaction.id,
                command = %interaction.name,
                ?kind,
                error = %failure,
                "command reported an error"
            ),
            None => error!(
                target: DISPATCH_TARGET,
                interaction = %interaction.id,
                command = %interaction.name,
                error = %failure,
                source = ?std::error::Error::source(failure),
                "command failed"
            ),
        }
        failure.to_response()
    }

    fn dispatch_autocomplete(
        &self,
        interaction: &Interaction,
        responder: &dyn InteractionResponder,
    ) {
        let mut ctx = self.build_context(interaction, responder);
        let handler = self.read_registry().lookup_autocomplete(&interaction.name);
        let choices = match (handler, ctx.options().focused().cloned()) {
            (Some(handler), Some(focused)) => {
                if let Some((child, nested)) = ctx
                    .options()
                    .subcommand()
                    .map(|(child, nested)| (child.to_owned(), nested.to_vec()))
                {
                    ctx.descend(&child, &nested);
                }
                let suggested = catch_unwind(AssertUnwindSafe(|| handler.suggest(&ctx, &focused)));
                match suggested {
                    Ok(Ok(mut choices)) => {
                        choices.truncate(MAX_CHOICES);
                        choices
                    }
                    Ok(Err(error)) => {
                        debug!(target: DISPATCH_TARGET, %error, "autocomplete failed");
                        Vec::new()
                    }
                    Err(_) => {
                        error!(target: DISPATCH_TARGET, command = %interaction.name, "autocomplete handler panicked");
                        Vec::new()
                    }
                }
            }
            _ => Vec::new(),
        };
        if let Err(error) = responder.send(interaction, Outbound::Choices { choices }) {
            warn!(target: DISPATCH_TARGET, %error, "failed to deliver autocomplete choices");
        }
    }
}

fn ensure_realm(ctx: &ExecutionContext<'_>, requires_realm: bool) -> Result<(), CommandError> {
    if requires_realm && ctx.realm().is_none() {
        return Err(CommandError::realm_required());
    }
    Ok(())
}

/// Runs a handler, converting a panic into an internal error.
pub(crate) fn invoke(
    command: &Command,
    ctx: &mut ExecutionContext<'_>,
) -> Result<Response, CommandError> {
    catch_unwind(AssertUnwindSafe(|| command.handler().handle(ctx))).unwrap_or_else(|payload| {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|message| (*message).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_owned());
        Err(CommandError::internal(format!(
            "handler for `{}` panicked: {detail}",
            ctx.path()
        )))
    })
}
