//! Name-indexed command tables.
//!
//! The registry is a plain value built at startup and owned by the router.
//! Registering a name twice replaces the earlier entry; callers that want to
//! know about the replacement inspect the returned value.

use std::collections::HashMap;
use std::sync::Arc;

use super::command::Command;
use super::context::ExecutionContext;
use super::errors::CommandError;
use super::response::Choice;
use crate::interaction::CommandOption;

/// Suggests values for a focused option.
pub trait AutocompleteHandler: Send + Sync {
    /// Returns suggestions for `focused`.
    ///
    /// # Errors
    ///
    /// Returns an error when suggestions cannot be produced; the router then
    /// answers with an empty list.
    fn suggest(
        &self,
        ctx: &ExecutionContext<'_>,
        focused: &CommandOption,
    ) -> Result<Vec<Choice>, CommandError>;
}

struct FnAutocomplete<F>(F);

impl<F> AutocompleteHandler for FnAutocomplete<F>
where
    F: Fn(&ExecutionContext<'_>, &CommandOption) -> Result<Vec<Choice>, CommandError>
        + Send
        + Sync,
{
    fn suggest(
        &self,
        ctx: &ExecutionContext<'_>,
        focused: &CommandOption,
    ) -> Result<Vec<Choice>, CommandError> {
        (self.0)(ctx, focused)
    }
}

/// Wraps a closure as an [`AutocompleteHandler`].
pub fn autocomplete_fn<F>(handler: F) -> Arc<dyn AutocompleteHandler>
where
    F: Fn(&ExecutionContext<'_>, &CommandOption) -> Result<Vec<Choice>, CommandError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(FnAutocomplete(handler))
}

/// Commands, subcommands and autocomplete handlers keyed by name.
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Command>,
    children: HashMap<String, HashMap<String, Command>>,
    autocomplete: HashMap<String, Arc<dyn AutocompleteHandler>>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a top-level command, returning the entry it replaced.
    pub fn register(&mut self, command: Command) -> Option<Command> {
        self.commands.insert(command.name().to_owned(), command)
    }

    /// Inserts a child under `parent`, creating the parent's table on demand.
    pub fn register_child(&mut self, parent: &str, child: Command) -> Option<Command> {
        self.children
            .entry(parent.to_owned())
            .or_default()
            .insert(child.name().to_owned(), child)
    }

    /// Inserts an autocomplete handler for the command called `name`.
    pub fn register_autocomplete(
        &mut self,
        name: impl Into<String>,
        handler: Arc<dyn AutocompleteHandler>,
    ) -> bool {
        self.autocomplete.insert(name.into(), handler).is_some()
    }

    /// Looks up a top-level command.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    /// Looks up a child of `parent`.
    #[must_use]
    pub fn lookup_child(&self, parent: &str, child: &str) -> Option<&Command> {
        self.children.get(parent)?.get(child)
    }

    /// Looks up the autocomplete handler for `name`.
    #[must_use]
    pub fn lookup_autocomplete(&self, name: &str) -> Option<Arc<dyn AutocompleteHandler>> {
        self.autocomplete.get(name).cloned()
    }

    /// Registered top-level names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of top-level commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns true when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
