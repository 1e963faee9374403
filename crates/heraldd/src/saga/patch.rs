//! The webhook-embed patch record and its validated fields.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::Url;

/// A field failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    /// Message id is blank or contains whitespace.
    #[error("message id must be a single non-empty word, got '{value}'")]
    InvalidMessageId {
        /// Rejected input.
        value: String,
    },

    /// Webhook URL does not address a specific webhook.
    #[error("invalid webhook URL: {reason}")]
    InvalidUrl {
        /// Why the URL was rejected.
        reason: String,
    },

    /// Embed payload is not a JSON object or array.
    #[error("invalid embed payload: {reason}")]
    InvalidPayload {
        /// Why the payload was rejected.
        reason: String,
    },
}

impl PatchError {
    fn url(reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            reason: reason.into(),
        }
    }

    fn payload(reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            reason: reason.into(),
        }
    }
}

/// Id of the message a patch targets; unique within a scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MessageId(String);

impl MessageId {
    /// Parses a message id.
    ///
    /// # Errors
    ///
    /// Returns [`PatchError::InvalidMessageId`] when the trimmed input is
    /// empty or still contains whitespace or control characters.
    pub fn parse(value: &str) -> Result<Self, PatchError> {
        let trimmed = value.trim();
        if trimmed.is_empty()
            || trimmed
                .chars()
                .any(|ch| ch.is_whitespace() || ch.is_control())
        {
            return Err(PatchError::InvalidMessageId {
                value: value.to_owned(),
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MessageId {
    type Error = PatchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MessageId> for String {
    fn from(value: MessageId) -> Self {
        value.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// URL of one webhook, including its secret token.
///
/// Accepted shape: `http(s)://host[/api[/vN]]/webhooks/{id}/{token}` with an
/// optional query string.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WebhookTarget {
    url: Url,
    webhook_id: String,
}

impl WebhookTarget {
    /// Parses and checks a webhook URL.
    ///
    /// # Errors
    ///
    /// Returns [`PatchError::InvalidUrl`] when the URL is malformed or does
    /// not address a specific webhook and token.
    pub fn parse(value: &str) -> Result<Self, PatchError> {
        let url = Url::parse(value.trim()).map_err(|error| PatchError::url(error.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(PatchError::url("scheme must be http or https"));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(PatchError::url("host is missing"));
        }

        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|segment| !segment.is_empty()).collect())
            .unwrap_or_default();
        let position = segments
            .iter()
            .position(|segment| *segment == "webhooks")
            .ok_or_else(|| PatchError::url("path must contain /webhooks/{id}/{token}"))?;
        let (prefix, tail) = segments.split_at(position);
        if !valid_prefix(prefix) {
            return Err(PatchError::url("unexpected path before /webhooks"));
        }
        let [_, id, token] = tail else {
            return Err(PatchError::url("path must end with /webhooks/{id}/{token}"));
        };
        if !id.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(PatchError::url("webhook id must be numeric"));
        }
        if token.is_empty() {
            return Err(PatchError::url("webhook token is missing"));
        }

        let webhook_id = (*id).to_owned();
        Ok(Self { url, webhook_id })
    }

    /// Full URL, token included.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// Parsed URL.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Numeric webhook id.
    #[must_use]
    pub fn webhook_id(&self) -> &str {
        &self.webhook_id
    }

    /// URL with the token hidden, for logs and public replies.
    #[must_use]
    pub fn redacted(&self) -> String {
        let host = self.url.host_str().unwrap_or_default();
        format!("{}://{host}/…/webhooks/{}/***", self.url.scheme(), self.webhook_id)
    }
}

fn valid_prefix(prefix: &[&str]) -> bool {
    match prefix {
        [] | ["api"] => true,
        ["api", version] => version
            .strip_prefix('v')
            .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())),
        _ => false,
    }
}

impl fmt::Debug for WebhookTarget {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_tuple("WebhookTarget")
            .field(&self.redacted())
            .finish()
    }
}

impl TryFrom<String> for WebhookTarget {
    type Error = PatchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<WebhookTarget> for String {
    fn from(value: WebhookTarget) -> Self {
        value.url.into()
    }
}

/// Embed JSON sent to the webhook; an object or an array of objects.
///
/// Only the outer shape is checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct EmbedPayload(Value);

impl EmbedPayload {
    /// Parses a payload from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`PatchError::InvalidPayload`] when the text is not JSON or
    /// not an object or array.
    pub fn parse(text: &str) -> Result<Self, PatchError> {
        let value: Value =
            serde_json::from_str(text).map_err(|error| PatchError::payload(error.to_string()))?;
        Self::from_value(value)
    }

    /// Wraps an already-parsed value.
    ///
    /// # Errors
    ///
    /// Returns [`PatchError::InvalidPayload`] unless `value` is an object or
    /// array.
    pub fn from_value(value: Value) -> Result<Self, PatchError> {
        match value {
            Value::Object(_) | Value::Array(_) => Ok(Self(value)),
            _ => Err(PatchError::payload("expected a JSON object or array")),
        }
    }

    /// Payload JSON.
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Embeds as a list, wrapping a single object.
    #[must_use]
    pub fn embeds(&self) -> Vec<Value> {
        match &self.0 {
            Value::Array(items) => items.clone(),
            other => vec![other.clone()],
        }
    }
}

impl TryFrom<Value> for EmbedPayload {
    type Error = PatchError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<EmbedPayload> for Value {
    fn from(value: EmbedPayload) -> Self {
        value.0
    }
}

/// Stored instruction to patch one webhook message with an embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookEmbedPatch {
    /// Target message; the record key within its scope.
    pub message_id: MessageId,
    /// Webhook that owns the message.
    pub webhook_url: WebhookTarget,
    /// Embed content to apply.
    pub embed: EmbedPayload,
}

impl WebhookEmbedPatch {
    /// Builds a patch from validated parts.
    pub fn new(message_id: MessageId, webhook_url: WebhookTarget, embed: EmbedPayload) -> Self {
        Self {
            message_id,
            webhook_url,
            embed,
        }
    }
}

/// Field changes requested by an update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchChanges {
    /// New record key.
    pub message_id: Option<MessageId>,
    /// New webhook URL.
    pub webhook_url: Option<WebhookTarget>,
    /// New embed payload.
    pub embed: Option<EmbedPayload>,
}

impl PatchChanges {
    /// Returns true when nothing would change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.message_id.is_none() && self.webhook_url.is_none() && self.embed.is_none()
    }

    /// Applies the changes to a copy of `current`.
    #[must_use]
    pub fn apply_to(&self, current: &WebhookEmbedPatch) -> WebhookEmbedPatch {
        WebhookEmbedPatch {
            message_id: self
                .message_id
                .clone()
                .unwrap_or_else(|| current.message_id.clone()),
            webhook_url: self
                .webhook_url
                .clone()
                .unwrap_or_else(|| current.webhook_url.clone()),
            embed: self.embed.clone().unwrap_or_else(|| current.embed.clone()),
        }
    }
}
