//! Command surfaces registered on the router.

pub mod webhook_embed;

pub use webhook_embed::{GROUP_NAME as WEBHOOK_EMBED_GROUP, WebhookEmbedCommands};
