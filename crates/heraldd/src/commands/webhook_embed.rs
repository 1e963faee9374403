//! The `webhook-embed` command group.
//!
//! Subcommands `create`, `read`, `update`, `delete` and `list` manage
//! webhook-embed patches in the global scope or the current realm's scope.
//! Mutations run through [`ConfigMutationSaga`]; reads go straight to the
//! repository.

use std::fmt::Write as _;
use std::sync::Arc;

use herald_config::ValidationPolicy;
use herald_perms::RealmId;

use crate::dispatch::{
    Choice, Command, CommandError, CommandGroup, CommandRouter, ExecutionContext, MAX_CHOICES,
    OptionSpec, Response, autocomplete_fn,
};
use crate::interaction::{CommandOption, OptionKind, OptionValue};
use crate::saga::{
    ConfigMutationSaga, EmbedPayload, MessageId, PatchChanges, SagaError, SagaOptions,
    SagaOutcome, ScopeSelector, WebhookEmbedPatch, WebhookTarget, resolve_scope,
};
use crate::settings::SettingsSource;
use crate::store::Scope;

/// Name of the command group.
pub const GROUP_NAME: &str = "webhook-embed";

const MESSAGE_ID: &str = "message_id";
const NEW_MESSAGE_ID: &str = "new_message_id";
const URL: &str = "url";
const EMBED: &str = "embed";
const SCOPE: &str = "scope";
const APPLY_NOW: &str = "apply_now";

/// Handlers behind the `webhook-embed` group.
pub struct WebhookEmbedCommands {
    saga: ConfigMutationSaga,
    settings: Arc<dyn SettingsSource>,
    validation: ValidationPolicy,
    page_size: usize,
}

impl WebhookEmbedCommands {
    /// Creates the handlers.
    ///
    /// `validation` is the global policy; realms may override it through
    /// their settings. `page_size` caps `list` output.
    pub fn new(
        saga: ConfigMutationSaga,
        settings: Arc<dyn SettingsSource>,
        validation: ValidationPolicy,
        page_size: usize,
    ) -> Self {
        Self {
            saga,
            settings,
            validation,
            page_size: page_size.max(1),
        }
    }

    /// Registers the group and its autocomplete handler on `router`.
    pub fn register(self: &Arc<Self>, router: &CommandRouter) {
        router.register_group(self.group());
        let commands = Arc::clone(self);
        router.register_autocomplete(
            GROUP_NAME,
            autocomplete_fn(move |ctx, focused| commands.suggest(ctx, focused)),
        );
    }

    /// Builds the command group.
    #[must_use]
    pub fn group(self: &Arc<Self>) -> CommandGroup {
        let create = Arc::clone(self);
        let read = Arc::clone(self);
        let update = Arc::clone(self);
        let delete = Arc::clone(self);
        let list = Arc::clone(self);

        CommandGroup::new(GROUP_NAME)
            .description("Manage embeds patched into webhook messages")
            .child(
                Command::from_fn("create", move |ctx| create.create(ctx))
                    .description("Store an embed patch for a webhook message")
                    .option(OptionSpec::required(MESSAGE_ID, OptionKind::String))
                    .option(OptionSpec::required(URL, OptionKind::String))
                    .option(OptionSpec::required(EMBED, OptionKind::String))
                    .option(OptionSpec::optional(SCOPE, OptionKind::String))
                    .option(OptionSpec::optional(APPLY_NOW, OptionKind::Bool))
                    .requires_permission(),
            )
            .child(
                Command::from_fn("read", move |ctx| read.read(ctx))
                    .description("Show a stored embed patch")
                    .option(OptionSpec::required(MESSAGE_ID, OptionKind::String))
                    .option(OptionSpec::optional(SCOPE, OptionKind::String))
                    .requires_permission(),
            )
            .child(
                Command::from_fn("update", move |ctx| update.update(ctx))
                    .description("Change a stored embed patch")
                    .option(OptionSpec::required(MESSAGE_ID, OptionKind::String))
                    .option(OptionSpec::optional(NEW_MESSAGE_ID, OptionKind::String))
                    .option(OptionSpec::optional(URL, OptionKind::String))
                    .option(OptionSpec::optional(EMBED, OptionKind::String))
                    .option(OptionSpec::optional(SCOPE, OptionKind::String))
                    .option(OptionSpec::optional(APPLY_NOW, OptionKind::Bool))
                    .requires_permission(),
            )
            .child(
                Command::from_fn("delete", move |ctx| delete.delete(ctx))
                    .description("Remove a stored embed patch")
                    .option(OptionSpec::required(MESSAGE_ID, OptionKind::String))
                    .option(OptionSpec::optional(SCOPE, OptionKind::String))
                    .option(OptionSpec::optional(APPLY_NOW, OptionKind::Bool))
                    .requires_permission(),
            )
            .child(
                Command::from_fn("list", move |ctx| list.list(ctx))
                    .description("List stored embed patches")
                    .option(OptionSpec::optional(SCOPE, OptionKind::String))
                    .requires_permission(),
            )
    }

    fn create(&self, ctx: &mut ExecutionContext<'_>) -> Result<Response, CommandError> {
        let scope = scope_of(ctx)?;
        let patch = WebhookEmbedPatch::new(
            message_id(ctx, MESSAGE_ID)?,
            WebhookTarget::parse(ctx.required_string(URL)?).map_err(invalid)?,
            EmbedPayload::parse(ctx.required_string(EMBED)?).map_err(invalid)?,
        );
        let options = self.saga_options(ctx, &scope)?;

        let outcome = self
            .saga
            .create(scope, patch, options)
            .map_err(saga_error)?;
        Ok(Response::ephemeral(describe(&outcome, "Saved")))
    }

    fn read(&self, ctx: &mut ExecutionContext<'_>) -> Result<Response, CommandError> {
        let scope = scope_of(ctx)?;
        let key = message_id(ctx, MESSAGE_ID)?;
        let patch = self
            .saga
            .repository()
            .get(&scope, &key)
            .map_err(|error| saga_error(error.into()))?
            .ok_or_else(|| saga_error(SagaError::NotFound { scope: scope.clone(), key }))?;

        let payload = serde_json::to_string_pretty(patch.embed.as_value())
            .map_err(|error| CommandError::internal_from("failed to render embed", error))?;
        Ok(Response::ephemeral(format!(
            "Webhook embed patch for message `{}` ({scope})\nWebhook: {}\n```json\n{payload}\n```",
            patch.message_id,
            patch.webhook_url.as_str(),
        )))
    }

    fn update(&self, ctx: &mut ExecutionContext<'_>) -> Result<Response, CommandError> {
        let scope = scope_of(ctx)?;
        let key = message_id(ctx, MESSAGE_ID)?;
        let options = ctx.options();
        let changes = PatchChanges {
            message_id: options
                .string(NEW_MESSAGE_ID)
                .map(MessageId::parse)
                .transpose()
                .map_err(invalid)?,
            webhook_url: options
                .string(URL)
                .map(WebhookTarget::parse)
                .transpose()
                .map_err(invalid)?,
            embed: options
                .string(EMBED)
                .map(EmbedPayload::parse)
                .transpose()
                .map_err(invalid)?,
        };
        if changes.is_empty() {
            return Err(CommandError::validation(
                "Nothing to update: pass new_message_id, url or embed.",
            ));
        }
        let saga_options = self.saga_options(ctx, &scope)?;

        let outcome = self
            .saga
            .update(scope, key, changes, saga_options)
            .map_err(saga_error)?;
        Ok(Response::ephemeral(describe(&outcome, "Updated")))
    }

    fn delete(&self, ctx: &mut ExecutionContext<'_>) -> Result<Response, CommandError> {
        let scope = scope_of(ctx)?;
        let key = message_id(ctx, MESSAGE_ID)?;
        let options = self.saga_options(ctx, &scope)?;

        let outcome = self
            .saga
            .delete(scope, key, options)
            .map_err(saga_error)?;
        Ok(Response::ephemeral(describe(&outcome, "Deleted")))
    }

    fn list(&self, ctx: &mut ExecutionContext<'_>) -> Result<Response, CommandError> {
        let scope = scope_of(ctx)?;
        let patches = self
            .saga
            .repository()
            .list(&scope)
            .map_err(|error| saga_error(error.into()))?;
        Ok(Response::ephemeral(render_list(&scope, &patches, self.page_size)))
    }

    fn suggest(
        &self,
        ctx: &ExecutionContext<'_>,
        focused: &CommandOption,
    ) -> Result<Vec<Choice>, CommandError> {
        if focused.name != MESSAGE_ID {
            return Ok(Vec::new());
        }
        ctx.router().gate(ctx, true, true)?;
        let prefix = match &focused.value {
            OptionValue::String(text) => text.trim(),
            _ => "",
        };
        let scope = scope_of(ctx)?;
        let patches = self
            .saga
            .repository()
            .list(&scope)
            .map_err(|error| saga_error(error.into()))?;
        Ok(patches
            .iter()
            .map(|patch| patch.message_id.as_str())
            .filter(|id| id.starts_with(prefix))
            .take(MAX_CHOICES)
            .map(Choice::plain)
            .collect())
    }

    /// Resolves the validation policy for `scope` and defers the reply when
    /// the mutation will call out to the webhook.
    fn saga_options(
        &self,
        ctx: &mut ExecutionContext<'_>,
        scope: &Scope,
    ) -> Result<SagaOptions, CommandError> {
        let validation = match scope {
            Scope::Global => self.validation,
            Scope::Realm(realm) => self.realm_policy(ctx, realm)?,
        };
        let apply_now = ctx.options().boolean(APPLY_NOW).unwrap_or(false);
        if apply_now || validation.probes() {
            ctx.defer(true)?;
        }
        Ok(SagaOptions {
            apply_now,
            validation,
        })
    }

    fn realm_policy(
        &self,
        ctx: &ExecutionContext<'_>,
        realm: &RealmId,
    ) -> Result<ValidationPolicy, CommandError> {
        let settings = match ctx.settings() {
            Some(settings) if ctx.realm() == Some(realm) => Some(settings.clone()),
            _ => self
                .settings
                .realm_settings(realm)
                .map_err(|error| CommandError::internal_from("failed to load realm settings", error))?,
        };
        Ok(settings.map_or(self.validation, |settings| {
            settings.validation.resolve(self.validation)
        }))
    }
}

fn scope_of(ctx: &ExecutionContext<'_>) -> Result<Scope, CommandError> {
    let selector = ctx
        .options()
        .string(SCOPE)
        .map(str::parse::<ScopeSelector>)
        .transpose()
        .map_err(saga_error)?;
    resolve_scope(selector, ctx.realm()).map_err(saga_error)
}

fn message_id(ctx: &ExecutionContext<'_>, option: &str) -> Result<MessageId, CommandError> {
    MessageId::parse(ctx.required_string(option)?).map_err(invalid)
}

fn invalid(error: crate::saga::PatchError) -> CommandError {
    CommandError::validation(error.to_string())
}

fn saga_error(error: SagaError) -> CommandError {
    match error {
        SagaError::NotFound { .. } => CommandError::not_found(error.to_string()),
        SagaError::Conflict { .. } => CommandError::conflict(error.to_string()),
        SagaError::ValidationFailed { .. }
        | SagaError::InvalidPatch(_)
        | SagaError::ScopeUnavailable { .. } => CommandError::validation(error.to_string()),
        SagaError::ApplyFailed { .. } => CommandError::apply_failed(error.to_string()),
        SagaError::Store(source) => CommandError::internal_from("patch store failed", source),
    }
}

fn describe(outcome: &SagaOutcome, verb: &str) -> String {
    let mut text = format!(
        "{verb} webhook embed patch for message `{}` ({}).",
        outcome.patch.message_id, outcome.scope
    );
    if outcome.applied {
        text.push_str("\nApplied to the webhook message.");
    }
    for warning in &outcome.warnings {
        let _ = write!(text, "\n⚠️ {warning}");
    }
    text
}

fn render_list(scope: &Scope, patches: &[WebhookEmbedPatch], page_size: usize) -> String {
    if patches.is_empty() {
        return format!("No webhook embed patches in {scope}.");
    }
    let mut text = format!("Webhook embed patches in {scope}:");
    for patch in patches.iter().take(page_size) {
        let _ = write!(
            text,
            "\n• `{}` → webhook {}",
            patch.message_id,
            patch.webhook_url.webhook_id()
        );
    }
    if patches.len() > page_size {
        let _ = write!(text, "\n… and {} more", patches.len() - page_size);
    }
    text
}
