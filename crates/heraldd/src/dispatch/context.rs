//! Per-invocation execution context.

use herald_perms::{PermissionResolver, RealmId, UserId};

use crate::interaction::{CommandOption, Interaction, OptionSet};
use crate::settings::RealmSettings;

use super::errors::CommandError;
use super::response::{InteractionResponder, Outbound};
use super::router::{CommandRouter, DISPATCH_TARGET};

/// Realm settings as observed when a context was built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SettingsSnapshot {
    /// Direct message, or a realm that never stored settings.
    Absent,
    /// Settings read successfully.
    Loaded(RealmSettings),
    /// Settings exist but could not be read or decoded.
    Unreadable,
}

/// Everything a handler may consult while running one interaction.
///
/// Built by the router before gating. Group dispatch narrows the context to
/// the selected child via [`ExecutionContext::descend`].
pub struct ExecutionContext<'a> {
    interaction: &'a Interaction,
    router: &'a CommandRouter,
    responder: &'a dyn InteractionResponder,
    realm_owner: bool,
    settings: SettingsSnapshot,
    options: OptionSet,
    path: Vec<String>,
    deferred: Option<bool>,
}

impl<'a> ExecutionContext<'a> {
    pub(crate) fn new(
        interaction: &'a Interaction,
        router: &'a CommandRouter,
        responder: &'a dyn InteractionResponder,
        realm_owner: bool,
        settings: SettingsSnapshot,
    ) -> Self {
        Self {
            interaction,
            router,
            responder,
            realm_owner,
            settings,
            options: OptionSet::new(interaction.options.clone()),
            path: vec![interaction.name.clone()],
            deferred: None,
        }
    }

    /// Interaction being handled.
    #[must_use]
    pub fn interaction(&self) -> &Interaction {
        self.interaction
    }

    /// Realm the command was used in.
    #[must_use]
    pub fn realm(&self) -> Option<&RealmId> {
        self.interaction.realm()
    }

    /// Realm the command was used in, or the realm-required denial.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::realm_required`] outside a realm.
    pub fn require_realm(&self) -> Result<&RealmId, CommandError> {
        self.realm().ok_or_else(CommandError::realm_required)
    }

    /// Invoking user.
    #[must_use]
    pub fn actor(&self) -> &UserId {
        &self.interaction.actor
    }

    /// Whether the actor owns the realm.
    #[must_use]
    pub const fn is_realm_owner(&self) -> bool {
        self.realm_owner
    }

    /// Realm settings snapshot taken when the context was built.
    ///
    /// `None` both when nothing is configured and when the settings could not
    /// be read; gating tells the two apart through
    /// [`ExecutionContext::settings_unreadable`].
    #[must_use]
    pub const fn settings(&self) -> Option<&RealmSettings> {
        match &self.settings {
            SettingsSnapshot::Loaded(settings) => Some(settings),
            SettingsSnapshot::Absent | SettingsSnapshot::Unreadable => None,
        }
    }

    /// Whether the realm's settings failed to load.
    #[must_use]
    pub const fn settings_unreadable(&self) -> bool {
        matches!(self.settings, SettingsSnapshot::Unreadable)
    }

    /// Options at the current command level.
    #[must_use]
    pub fn options(&self) -> &OptionSet {
        &self.options
    }

    /// Required string option at the current level.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the option is missing or blank.
    pub fn required_string(&self, name: &str) -> Result<&str, CommandError> {
        self.options
            .string(name)
            .ok_or_else(|| CommandError::validation(format!("Option `{name}` is required.")))
    }

    /// Command path from the top-level name down to the current level.
    #[must_use]
    pub fn path(&self) -> String {
        self.path.join(" ")
    }

    /// Router dispatching this interaction.
    #[must_use]
    pub fn router(&self) -> &CommandRouter {
        self.router
    }

    /// Permission resolver shared with the router.
    #[must_use]
    pub fn permissions(&self) -> &PermissionResolver {
        self.router.permissions()
    }

    /// Acknowledges the interaction now and promises a later edit.
    ///
    /// The handler's eventual result is sent as that edit. Repeated calls are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns an internal error when the acknowledgement cannot be sent.
    pub fn defer(&mut self, ephemeral: bool) -> Result<(), CommandError> {
        if self.deferred.is_some() {
            return Ok(());
        }
        self.responder
            .send(self.interaction, Outbound::Deferred { ephemeral })
            .map_err(|error| CommandError::internal_from("failed to defer interaction", error))?;
        tracing::debug!(
            target: DISPATCH_TARGET,
            interaction = %self.interaction.id,
            "deferred interaction"
        );
        self.deferred = Some(ephemeral);
        Ok(())
    }

    /// Whether [`ExecutionContext::defer`] has been called.
    #[must_use]
    pub const fn is_deferred(&self) -> bool {
        self.deferred.is_some()
    }

    /// Ephemeral flag promised by the deferral, if any.
    pub(crate) const fn deferred_ephemeral(&self) -> Option<bool> {
        self.deferred
    }

    /// Narrows the context to a subcommand and its nested options.
    pub(crate) fn descend(&mut self, child: &str, options: &[CommandOption]) {
        self.path.push(child.to_owned());
        self.options = OptionSet::new(options.to_vec());
    }
}
