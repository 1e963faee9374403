//! Error types surfaced by command handlers and the router.
//!
//! A [`CommandError::Reported`] carries a user-safe message that the router
//! relays verbatim. Anything else is [`CommandError::Internal`]: it is logged
//! in full and the user only ever sees a generic failure notice.

use std::error::Error as StdError;

use thiserror::Error;

use super::response::Response;

/// Message shown when the actor lacks permission.
pub const DENIED_MESSAGE: &str = "You do not have permission to use this command.";

/// Message shown when a realm-only command is used outside a realm.
pub const REALM_REQUIRED_MESSAGE: &str = "This command can only be used inside a server.";

/// Message shown for internal failures.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Something went wrong while running this command. Please try again later.";

/// Classification of user-facing failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Referenced command or record does not exist.
    NotFound,
    /// Input failed validation.
    Validation,
    /// Actor lacks permission or context.
    Denied,
    /// Target key is already taken.
    Conflict,
    /// External side effect failed; persisted state was compensated.
    ApplyFailed,
}

/// Failure returned by a command handler or the routing gate.
#[derive(Debug, Error)]
pub enum CommandError {
    /// User-safe failure relayed as-is.
    #[error("{message}")]
    Reported {
        /// Classification.
        kind: ErrorKind,
        /// Message shown to the user.
        message: String,
        /// Whether only the actor sees the message.
        ephemeral: bool,
    },

    /// Unexpected failure; never shown to the user.
    #[error("internal error: {message}")]
    Internal {
        /// Diagnostic message for logs.
        message: String,
        /// Underlying cause, if any.
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
}

impl CommandError {
    fn reported(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Reported {
            kind,
            message: message.into(),
            ephemeral: true,
        }
    }

    /// Creates a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::reported(ErrorKind::NotFound, message)
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::reported(ErrorKind::Validation, message)
    }

    /// Creates the standard permission denial.
    pub fn denied() -> Self {
        Self::reported(ErrorKind::Denied, DENIED_MESSAGE)
    }

    /// Creates the realm-required denial.
    pub fn realm_required() -> Self {
        Self::reported(ErrorKind::Denied, REALM_REQUIRED_MESSAGE)
    }

    /// Creates a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::reported(ErrorKind::Conflict, message)
    }

    /// Creates an apply-failure error.
    pub fn apply_failed(message: impl Into<String>) -> Self {
        Self::reported(ErrorKind::ApplyFailed, message)
    }

    /// Creates an unknown command error.
    pub fn unknown_command(name: &str) -> Self {
        Self::not_found(format!("Unknown command `{name}`."))
    }

    /// Creates the error returned when a group is invoked without a subcommand.
    pub fn subcommand_required(group: &str) -> Self {
        Self::validation(format!("`/{group}` needs a subcommand."))
    }

    /// Creates the error returned for an unknown subcommand.
    pub fn unknown_subcommand(group: &str, child: &str) -> Self {
        Self::not_found(format!("Unknown subcommand `{child}` for `/{group}`."))
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error wrapping its cause.
    pub fn internal_from(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Makes a reported error visible to the whole channel.
    #[must_use]
    pub fn public(self) -> Self {
        match self {
            Self::Reported { kind, message, .. } => Self::Reported {
                kind,
                message,
                ephemeral: false,
            },
            internal @ Self::Internal { .. } => internal,
        }
    }

    /// Classification, `None` for internal failures.
    #[must_use]
    pub const fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Reported { kind, .. } => Some(*kind),
            Self::Internal { .. } => None,
        }
    }

    /// Converts the error into the response shown to the user.
    #[must_use]
    pub fn to_response(&self) -> Response {
        match self {
            Self::Reported {
                message, ephemeral, ..
            } => Response {
                content: Some(message.clone()),
                embeds: Vec::new(),
                ephemeral: *ephemeral,
            },
            Self::Internal { .. } => Response::ephemeral(GENERIC_FAILURE_MESSAGE),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(CommandError::not_found("gone"), Some(ErrorKind::NotFound))]
    #[case(CommandError::denied(), Some(ErrorKind::Denied))]
    #[case(CommandError::realm_required(), Some(ErrorKind::Denied))]
    #[case(CommandError::conflict("taken"), Some(ErrorKind::Conflict))]
    #[case(CommandError::internal("boom"), None)]
    fn classifies_errors(#[case] error: CommandError, #[case] expected: Option<ErrorKind>) {
        assert_eq!(error.kind(), expected);
    }

    #[test]
    fn internal_errors_hide_their_details() {
        let error = CommandError::internal_from("store offline", io::Error::other("disk on fire"));
        let response = error.to_response();
        assert_eq!(response.content.as_deref(), Some(GENERIC_FAILURE_MESSAGE));
        assert!(response.ephemeral);
    }

    #[test]
    fn public_errors_are_not_ephemeral() {
        let response = CommandError::validation("bad input").public().to_response();
        assert!(!response.ephemeral);
        assert_eq!(response.content.as_deref(), Some("bad input"));
    }
}
