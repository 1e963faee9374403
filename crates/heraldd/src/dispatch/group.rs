//! Subcommand dispatch for command groups.

use tracing::debug;

use super::command::CommandHandler;
use super::context::ExecutionContext;
use super::errors::CommandError;
use super::response::Response;
use super::router::{DISPATCH_TARGET, invoke};

/// Handler of a group's parent command.
///
/// Children are resolved through the router's registry at dispatch time, so
/// a later [`CommandRouter::register_child`] changes routing. The router
/// gates the parent on the OR of its children's flags. This dispatcher then
/// gates the selected child on that child's own flags, so access to a
/// lenient sibling never opens a stricter one.
///
/// [`CommandRouter::register_child`]: super::CommandRouter::register_child
pub struct GroupDispatcher {
    group: String,
}

impl GroupDispatcher {
    /// Creates a dispatcher for the children registered under `group`.
    #[must_use]
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
        }
    }
}

impl CommandHandler for GroupDispatcher {
    fn handle(&self, ctx: &mut ExecutionContext<'_>) -> Result<Response, CommandError> {
        let (name, nested) = ctx
            .options()
            .subcommand()
            .map(|(name, nested)| (name.to_owned(), nested.to_vec()))
            .ok_or_else(|| CommandError::subcommand_required(&self.group))?;
        let child = ctx
            .router()
            .lookup_child(&self.group, &name)
            .ok_or_else(|| CommandError::unknown_subcommand(&self.group, &name))?;

        ctx.descend(&name, &nested);
        ctx.router()
            .gate(ctx, child.needs_realm(), child.needs_permission())?;
        child.validate_options(ctx.options())?;

        debug!(target: DISPATCH_TARGET, command = %ctx.path(), "delegating to subcommand");
        invoke(&child, ctx)
    }
}
