//! Outbound messages and the responder seam.
//!
//! Every interaction receives exactly one terminal [`Outbound`]: a
//! `Message`, or an `Edit` after an earlier `Deferred` acknowledgement, or
//! `Choices` for autocomplete. The [`InteractionResponder`] trait is the only
//! path by which anything reaches the platform.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::interaction::Interaction;

/// Maximum number of autocomplete choices the platform accepts.
pub const MAX_CHOICES: usize = 25;

/// Content of a reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Response {
    /// Message text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Embed objects attached to the message.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Value>,
    /// Whether only the actor sees the reply.
    pub ephemeral: bool,
}

impl Response {
    /// Public text reply.
    pub fn message(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Text reply visible only to the actor.
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ephemeral: true,
            ..Self::default()
        }
    }

    /// Attaches an embed.
    #[must_use]
    pub fn with_embed(mut self, embed: Value) -> Self {
        self.embeds.push(embed);
        self
    }

    /// Message text, or the empty string.
    #[must_use]
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}

/// One autocomplete suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    /// Label shown to the user.
    pub name: String,
    /// Value inserted when picked.
    pub value: String,
}

impl Choice {
    /// Choice whose label equals its value.
    pub fn plain(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            name: value.clone(),
            value,
        }
    }
}

/// Message sent back to the platform for an interaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outbound {
    /// Initial reply.
    Message {
        /// Reply content.
        response: Response,
    },
    /// Acknowledgement promising a later edit.
    Deferred {
        /// Whether the eventual reply is ephemeral.
        ephemeral: bool,
    },
    /// Replacement for a deferred acknowledgement.
    Edit {
        /// Reply content.
        response: Response,
    },
    /// Autocomplete suggestions.
    Choices {
        /// Suggestions, at most [`MAX_CHOICES`].
        choices: Vec<Choice>,
    },
}

impl Outbound {
    /// Returns true for the messages that close an interaction.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Deferred { .. })
    }

    /// Reply content for messages and edits.
    #[must_use]
    pub const fn response(&self) -> Option<&Response> {
        match self {
            Self::Message { response } | Self::Edit { response } => Some(response),
            Self::Deferred { .. } | Self::Choices { .. } => None,
        }
    }
}

/// Failure delivering an outbound message.
#[derive(Debug, Error)]
pub enum TransportError {
    /// IO failure on the output stream.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization failure.
    #[error("failed to serialize outbound message: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Output stream lock poisoned.
    #[error("responder lock poisoned")]
    Poisoned,
}

/// Delivers outbound messages for interactions.
pub trait InteractionResponder: Send + Sync {
    /// Sends `outbound` in reply to `interaction`.
    ///
    /// # Errors
    ///
    /// Returns an error when the message cannot be delivered.
    fn send(&self, interaction: &Interaction, outbound: Outbound) -> Result<(), TransportError>;
}
