//! Interaction daemon for the Herald realm bot.
//!
//! Slash-command interactions arrive as JSON lines on stdin and responses
//! leave as JSON lines on stdout. Each interaction is looked up in a
//! [`CommandRouter`], checked against the realm gate and the realm's
//! role allow-list, and handed to its handler. Grouped commands route to
//! their subcommand through a [`GroupDispatcher`] that repeats the checks
//! for the child it selects.
//!
//! Permission questions go to a [`herald_perms::PermissionResolver`], which
//! walks a fast cache, the event-maintained snapshot, the durable store and
//! finally the remote authority, writing answers back into the cheaper
//! tiers.
//!
//! The `webhook-embed` command group edits stored embed patches through the
//! [`ConfigMutationSaga`]. A mutation loads the current record, optionally
//! validates its endpoint, persists the change and, when asked to, applies
//! it to the target. A failed application compensates the persisted change
//! so the store never claims a patch that was not applied.

mod bootstrap;
pub mod commands;
pub mod dispatch;
mod health;
pub mod interaction;
pub mod saga;
pub mod settings;
pub mod store;
mod telemetry;
pub mod transport;

pub use bootstrap::{
    BootstrapError, Collaborators, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader,
    bootstrap_with,
};
pub use dispatch::{CommandRouter, GroupDispatcher};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use saga::ConfigMutationSaga;
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
