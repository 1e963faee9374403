//! Remote authority: the definitive, network-reachable source of truth.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{AuthorityError, TierError};
use crate::ids::{MemberKey, RealmId, RoleSet, UserId};
use crate::tier::Tier;

/// Network client for the platform's ownership and membership records.
///
/// Each call carries its own timeout; implementations must give up once it
/// elapses and report [`AuthorityError::Timeout`].
pub trait RemoteAuthority: Send + Sync {
    /// Fetches the owner of `realm`.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthorityError`] when the record cannot be fetched.
    fn owner(&self, realm: &RealmId, timeout: Duration) -> Result<UserId, AuthorityError>;

    /// Fetches the roles held by `actor` in `realm`.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthorityError`] when the record cannot be fetched.
    fn member_roles(
        &self,
        realm: &RealmId,
        actor: &UserId,
        timeout: Duration,
    ) -> Result<RoleSet, AuthorityError>;
}

/// Adapts a [`RemoteAuthority`] into the final tier of a cascade.
pub struct AuthorityTier {
    authority: Arc<dyn RemoteAuthority>,
    timeout: Duration,
}

impl AuthorityTier {
    /// Wraps `authority`, granting each call `timeout`.
    #[must_use]
    pub fn new(authority: Arc<dyn RemoteAuthority>, timeout: Duration) -> Self {
        Self { authority, timeout }
    }
}

impl Tier<RealmId, UserId> for AuthorityTier {
    fn name(&self) -> &'static str {
        "authority"
    }

    fn lookup(&self, key: &RealmId) -> Result<Option<UserId>, TierError> {
        match self.authority.owner(key, self.timeout) {
            Ok(owner) => Ok(Some(owner)),
            Err(AuthorityError::NotFound { .. }) => Ok(None),
            Err(error) => Err(error.into()),
        }
    }
}

impl Tier<MemberKey, RoleSet> for AuthorityTier {
    fn name(&self) -> &'static str {
        "authority"
    }

    fn lookup(&self, key: &MemberKey) -> Result<Option<RoleSet>, TierError> {
        match self
            .authority
            .member_roles(key.realm(), key.actor(), self.timeout)
        {
            Ok(roles) => Ok(Some(roles)),
            Err(AuthorityError::NotFound { .. }) => Ok(None),
            Err(error) => Err(error.into()),
        }
    }
}

/// Authority used when no network client is configured: every call fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnreachableAuthority;

impl RemoteAuthority for UnreachableAuthority {
    fn owner(&self, realm: &RealmId, _timeout: Duration) -> Result<UserId, AuthorityError> {
        Err(AuthorityError::unreachable(format!(
            "no authority configured for realm {realm}"
        )))
    }

    fn member_roles(
        &self,
        realm: &RealmId,
        _actor: &UserId,
        _timeout: Duration,
    ) -> Result<RoleSet, AuthorityError> {
        Err(AuthorityError::unreachable(format!(
            "no authority configured for realm {realm}"
        )))
    }
}
