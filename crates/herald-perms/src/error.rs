//! Errors raised while walking the permission tiers.
//!
//! Tier-level failures ([`TierError`]) are routine: the cascade logs them and
//! falls through to the next tier. Only a failure of the final, authoritative
//! tier becomes a [`ResolveError`], which callers treat as "cannot verify,
//! deny".

use thiserror::Error;

/// Failure reported by the remote authority.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorityError {
    /// The authority could not be reached.
    #[error("authority unreachable: {message}")]
    Unreachable {
        /// Transport-level description.
        message: String,
    },
    /// The authority did not answer within the granted timeout.
    #[error("authority timed out after {timeout_ms}ms")]
    Timeout {
        /// Timeout granted to the call.
        timeout_ms: u64,
    },
    /// The authority has no record for the requested key.
    #[error("authority has no record for {key}")]
    NotFound {
        /// Rendered key.
        key: String,
    },
}

impl AuthorityError {
    /// Creates an unreachable error.
    #[must_use]
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
        }
    }

    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }
}

/// Failure of a single tier.
#[derive(Debug, Error)]
pub enum TierError {
    /// A lock guarding the tier was poisoned by a panicking writer.
    #[error("tier '{tier}' lock poisoned")]
    Poisoned {
        /// Tier name.
        tier: &'static str,
    },
    /// The backing storage failed.
    #[error("tier '{tier}' unavailable: {message}")]
    Unavailable {
        /// Tier name.
        tier: &'static str,
        /// Description of the failure.
        message: String,
    },
    /// The remote authority failed.
    #[error(transparent)]
    Authority(#[from] AuthorityError),
}

impl TierError {
    /// Creates an unavailable error.
    #[must_use]
    pub fn unavailable(tier: &'static str, message: impl Into<String>) -> Self {
        Self::Unavailable {
            tier,
            message: message.into(),
        }
    }
}

/// Failure to resolve a value through the whole cascade.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The cascade was built without tiers.
    #[error("no permission tiers configured")]
    NoTiers,
    /// Every tier missed, including the authoritative one.
    #[error("no tier holds a record for {key}")]
    NotFound {
        /// Rendered key.
        key: String,
    },
    /// The authoritative tier failed.
    #[error("authoritative tier '{tier}' failed for {key}: {source}")]
    Unavailable {
        /// Name of the failing tier.
        tier: &'static str,
        /// Rendered key.
        key: String,
        /// Underlying tier failure.
        #[source]
        source: TierError,
    },
}
