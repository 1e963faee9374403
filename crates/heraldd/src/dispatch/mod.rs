//! Command registration and interaction dispatch.
//!
//! The [`CommandRouter`] owns a [`CommandRegistry`] and a permission
//! resolver. For each [`Interaction`](crate::interaction::Interaction) it
//! builds an [`ExecutionContext`], applies the realm and permission gates,
//! runs the handler and sends one terminal [`Outbound`] through an
//! [`InteractionResponder`]. Group commands are handled by a
//! [`GroupDispatcher`] which re-applies the gates for the selected child.

mod command;
mod context;
mod errors;
mod group;
mod registry;
mod response;
mod router;

pub use command::{Command, CommandGroup, CommandHandler, OptionSpec};
pub use context::ExecutionContext;
pub use errors::{
    CommandError, DENIED_MESSAGE, ErrorKind, GENERIC_FAILURE_MESSAGE, REALM_REQUIRED_MESSAGE,
};
pub use group::GroupDispatcher;
pub use registry::{AutocompleteHandler, CommandRegistry, autocomplete_fn};
pub use response::{
    Choice, InteractionResponder, MAX_CHOICES, Outbound, Response, TransportError,
};
pub use router::CommandRouter;
