//! Command definitions and the handler seam.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::interaction::{OptionKind, OptionSet};

use super::context::ExecutionContext;
use super::errors::CommandError;
use super::group::GroupDispatcher;
use super::response::Response;

/// Executes one command.
pub trait CommandHandler: Send + Sync {
    /// Runs the command.
    ///
    /// # Errors
    ///
    /// Returns a [`CommandError`] that the router turns into the reply.
    fn handle(&self, ctx: &mut ExecutionContext<'_>) -> Result<Response, CommandError>;
}

struct FnHandler<F>(F);

impl<F> CommandHandler for FnHandler<F>
where
    F: Fn(&mut ExecutionContext<'_>) -> Result<Response, CommandError> + Send + Sync,
{
    fn handle(&self, ctx: &mut ExecutionContext<'_>) -> Result<Response, CommandError> {
        (self.0)(ctx)
    }
}

/// Declared option of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSpec {
    name: String,
    kind: OptionKind,
    required: bool,
}

impl OptionSpec {
    /// Declares a mandatory option.
    pub fn required(name: impl Into<String>, kind: OptionKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
        }
    }

    /// Declares an optional option.
    pub fn optional(name: impl Into<String>, kind: OptionKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
        }
    }

    /// Option name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared kind.
    #[must_use]
    pub const fn kind(&self) -> OptionKind {
        self.kind
    }

    /// Whether the option must be supplied.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }
}

/// A registered command: metadata, flags and handler.
#[derive(Clone)]
pub struct Command {
    name: String,
    description: String,
    options: Vec<OptionSpec>,
    requires_realm: bool,
    requires_permission: bool,
    handler: Arc<dyn CommandHandler>,
}

impl Command {
    /// Creates a command around an existing handler.
    pub fn new(name: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            options: Vec::new(),
            requires_realm: false,
            requires_permission: false,
            handler,
        }
    }

    /// Creates a command from a closure.
    pub fn from_fn<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut ExecutionContext<'_>) -> Result<Response, CommandError> + Send + Sync + 'static,
    {
        Self::new(name, Arc::new(FnHandler(handler)))
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declares an option.
    #[must_use]
    pub fn option(mut self, spec: OptionSpec) -> Self {
        self.options.push(spec);
        self
    }

    /// Restricts the command to realm contexts.
    #[must_use]
    pub const fn requires_realm(mut self) -> Self {
        self.requires_realm = true;
        self
    }

    /// Requires the actor to own the realm or hold an allow-listed role.
    ///
    /// Permission is resolved per realm, so this implies a realm context.
    #[must_use]
    pub const fn requires_permission(mut self) -> Self {
        self.requires_permission = true;
        self
    }

    /// Command name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description.
    #[must_use]
    pub fn summary(&self) -> &str {
        &self.description
    }

    /// Declared options.
    #[must_use]
    pub fn options(&self) -> &[OptionSpec] {
        &self.options
    }

    /// Whether a realm context is needed.
    #[must_use]
    pub const fn needs_realm(&self) -> bool {
        self.requires_realm
    }

    /// Whether a permission check is needed.
    #[must_use]
    pub const fn needs_permission(&self) -> bool {
        self.requires_permission
    }

    pub(crate) fn handler(&self) -> &dyn CommandHandler {
        self.handler.as_ref()
    }

    /// Checks supplied options against the declared schema.
    ///
    /// Undeclared options are ignored so a group can carry its subcommand
    /// option through.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the first missing or mistyped option.
    pub fn validate_options(&self, supplied: &OptionSet) -> Result<(), CommandError> {
        for spec in &self.options {
            match supplied.get(spec.name()) {
                None if spec.is_required() => {
                    return Err(CommandError::validation(format!(
                        "Missing required option `{}`.",
                        spec.name()
                    )));
                }
                Some(value) if !spec.kind().accepts(value) => {
                    return Err(CommandError::validation(format!(
                        "Option `{}` has the wrong type.",
                        spec.name()
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Command")
            .field("name", &self.name)
            .field("options", &self.options)
            .field("requires_realm", &self.requires_realm)
            .field("requires_permission", &self.requires_permission)
            .finish_non_exhaustive()
    }
}

/// A parent command whose subcommands are dispatched by name.
#[derive(Debug, Clone)]
pub struct CommandGroup {
    name: String,
    description: String,
    children: BTreeMap<String, Command>,
}

impl CommandGroup {
    /// Creates an empty group.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            children: BTreeMap::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Adds a subcommand, replacing any child with the same name.
    #[must_use]
    pub fn child(mut self, command: Command) -> Self {
        self.children.insert(command.name().to_owned(), command);
        self
    }

    /// Group name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Subcommands in name order.
    pub fn children(&self) -> impl Iterator<Item = &Command> {
        self.children.values()
    }

    /// Splits the group into its parent command and its children.
    ///
    /// The parent requires a realm or permission if any child does, so the
    /// router rejects early; the dispatcher resolves each child through the
    /// registry and re-checks the child's own flags.
    pub(crate) fn into_parts(self) -> (Command, Vec<Command>) {
        let requires_realm = self.children.values().any(Command::needs_realm);
        let requires_permission = self.children.values().any(Command::needs_permission);
        let dispatcher = GroupDispatcher::new(self.name.clone());
        let parent = Command {
            name: self.name,
            description: self.description,
            options: Vec::new(),
            requires_realm,
            requires_permission,
            handler: Arc::new(dispatcher),
        };
        (parent, self.children.into_values().collect())
    }
}
