//! Resolution of the scope a mutation targets.

use std::str::FromStr;

use herald_perms::RealmId;

use crate::store::Scope;

use super::SagaError;

/// Scope requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeSelector {
    /// Shared by every realm.
    Global,
    /// The realm the command was used in.
    Realm,
}

impl FromStr for ScopeSelector {
    type Err = SagaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(Self::Global),
            "guild" | "realm" | "server" => Ok(Self::Realm),
            other => Err(SagaError::scope(format!(
                "unknown scope '{other}'; use 'global' or 'guild'"
            ))),
        }
    }
}

/// Resolves the scope of a mutation.
///
/// An explicit `global` always wins. An explicit realm selector needs a
/// realm context. An omitted selector means the current realm and is an
/// error outside one; it never silently falls back to global.
///
/// # Errors
///
/// Returns [`SagaError::ScopeUnavailable`] when a realm scope is needed but
/// the command was used outside a realm.
pub fn resolve_scope(
    selector: Option<ScopeSelector>,
    realm: Option<&RealmId>,
) -> Result<Scope, SagaError> {
    match (selector, realm) {
        (Some(ScopeSelector::Global), _) => Ok(Scope::Global),
        (Some(ScopeSelector::Realm) | None, Some(realm)) => Ok(Scope::Realm(realm.clone())),
        (Some(ScopeSelector::Realm), None) => Err(SagaError::scope(
            "the guild scope can only be used inside a server",
        )),
        (None, None) => Err(SagaError::scope(
            "no scope given and no server context; pass scope:global explicitly",
        )),
    }
}
