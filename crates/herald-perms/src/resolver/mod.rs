//! Permission decisions built on the owner and member cascades.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::authority::{AuthorityTier, RemoteAuthority};
use crate::cache::FastCache;
use crate::cascade::{CASCADE_TARGET, Cascade};
use crate::error::ResolveError;
use crate::ids::{MemberKey, RealmId, RoleId, RoleSet, UserId};
use crate::snapshot::LocalSnapshot;
use crate::store::{PermissionStore, StoreTier};
use crate::tier::Tier;

/// Default capacity of each fast cache built by [`PermissionResolverBuilder`].
pub const DEFAULT_CACHE_CAPACITY: usize = 1_024;

/// Default timeout granted to each authority call.
pub const DEFAULT_AUTHORITY_TIMEOUT: Duration = Duration::from_secs(5);

/// Answers "is this actor authorized in this realm".
///
/// Failures never fail open: when ownership or membership cannot be
/// determined, [`PermissionResolver::has_permission`] denies.
pub struct PermissionResolver {
    owners: Cascade<RealmId, UserId>,
    members: Cascade<MemberKey, RoleSet>,
    owner_cache: Option<Arc<FastCache<RealmId, UserId>>>,
    member_cache: Option<Arc<FastCache<MemberKey, RoleSet>>>,
}

impl PermissionResolver {
    /// Starts a builder around the remote authority.
    #[must_use]
    pub fn builder(authority: Arc<dyn RemoteAuthority>) -> PermissionResolverBuilder {
        PermissionResolverBuilder::new(authority)
    }

    /// Builds a resolver from explicit cascades.
    ///
    /// Resolvers built this way have no fast cache handles, so the
    /// `invalidate_*` methods are no-ops.
    #[must_use]
    pub fn from_cascades(
        owners: Cascade<RealmId, UserId>,
        members: Cascade<MemberKey, RoleSet>,
    ) -> Self {
        Self {
            owners,
            members,
            owner_cache: None,
            member_cache: None,
        }
    }

    /// Resolves the owner of `realm`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when every tier is exhausted.
    pub fn owner(&self, realm: &RealmId) -> Result<UserId, ResolveError> {
        self.owners.resolve(realm).map(|resolved| resolved.into_value())
    }

    /// Resolves the roles `actor` holds in `realm`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when every tier is exhausted.
    pub fn member_roles(&self, realm: &RealmId, actor: &UserId) -> Result<RoleSet, ResolveError> {
        let key = MemberKey::new(realm.clone(), actor.clone());
        self.members.resolve(&key).map(|resolved| resolved.into_value())
    }

    /// Returns whether `actor` owns `realm`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when the owner cannot be resolved.
    pub fn is_owner(&self, realm: &RealmId, actor: &UserId) -> Result<bool, ResolveError> {
        self.owner(realm).map(|owner| &owner == actor)
    }

    /// Decides whether `actor` may run gated commands in `realm`.
    ///
    /// The owner is always allowed. With an empty allow-list nobody else is,
    /// and the member tiers are not consulted. Otherwise the actor needs at
    /// least one role from `allow_list`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when ownership or membership cannot be
    /// resolved.
    pub fn check_permission(
        &self,
        realm: &RealmId,
        actor: &UserId,
        allow_list: &[RoleId],
    ) -> Result<bool, ResolveError> {
        if self.is_owner(realm, actor)? {
            return Ok(true);
        }
        if allow_list.is_empty() {
            return Ok(false);
        }
        let roles = self.member_roles(realm, actor)?;
        Ok(allow_list.iter().any(|role| roles.contains(role)))
    }

    /// Like [`Self::check_permission`], denying when resolution fails.
    #[must_use]
    pub fn has_permission(&self, realm: &RealmId, actor: &UserId, allow_list: &[RoleId]) -> bool {
        match self.check_permission(realm, actor, allow_list) {
            Ok(allowed) => allowed,
            Err(error) => {
                warn!(
                    target: CASCADE_TARGET,
                    realm = %realm,
                    actor = %actor,
                    %error,
                    "cannot verify permission, denying"
                );
                false
            }
        }
    }

    /// Evicts the cached owner of `realm`.
    pub fn invalidate_owner(&self, realm: &RealmId) {
        if let Some(cache) = &self.owner_cache
            && cache.evict(realm)
        {
            debug!(target: CASCADE_TARGET, realm = %realm, "evicted cached owner");
        }
    }

    /// Evicts the cached roles of `actor` in `realm`.
    pub fn invalidate_member(&self, realm: &RealmId, actor: &UserId) {
        if let Some(cache) = &self.member_cache
            && cache.evict(&MemberKey::new(realm.clone(), actor.clone()))
        {
            debug!(
                target: CASCADE_TARGET,
                realm = %realm,
                actor = %actor,
                "evicted cached member roles"
            );
        }
    }
}

/// Assembles the standard four-tier resolver.
pub struct PermissionResolverBuilder {
    authority: Arc<dyn RemoteAuthority>,
    snapshot: Option<Arc<LocalSnapshot>>,
    store: Option<Arc<dyn PermissionStore>>,
    cache_capacity: usize,
    authority_timeout: Duration,
}

impl PermissionResolverBuilder {
    fn new(authority: Arc<dyn RemoteAuthority>) -> Self {
        Self {
            authority,
            snapshot: None,
            store: None,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            authority_timeout: DEFAULT_AUTHORITY_TIMEOUT,
        }
    }

    /// Adds the event-maintained snapshot tier.
    #[must_use]
    pub fn snapshot(mut self, snapshot: Arc<LocalSnapshot>) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    /// Adds the durable store tier.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn PermissionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the capacity of each fast cache.
    #[must_use]
    pub const fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Sets the timeout granted to each authority call.
    #[must_use]
    pub const fn authority_timeout(mut self, timeout: Duration) -> Self {
        self.authority_timeout = timeout;
        self
    }

    /// Builds the resolver: fast cache, snapshot, store, authority.
    #[must_use]
    pub fn build(self) -> PermissionResolver {
        let owner_cache = Arc::new(FastCache::new(self.cache_capacity));
        let member_cache = Arc::new(FastCache::new(self.cache_capacity));
        let store_tier = self.store.map(|store| Arc::new(StoreTier::new(store)));
        let authority_tier = Arc::new(AuthorityTier::new(self.authority, self.authority_timeout));

        let mut owner_tiers: Vec<Arc<dyn Tier<RealmId, UserId>>> = vec![owner_cache.clone()];
        let mut member_tiers: Vec<Arc<dyn Tier<MemberKey, RoleSet>>> = vec![member_cache.clone()];
        if let Some(snapshot) = self.snapshot {
            owner_tiers.push(snapshot.clone());
            member_tiers.push(snapshot);
        }
        if let Some(store_tier) = store_tier {
            owner_tiers.push(store_tier.clone());
            member_tiers.push(store_tier);
        }
        owner_tiers.push(authority_tier.clone());
        member_tiers.push(authority_tier);

        PermissionResolver {
            owners: Cascade::new(owner_tiers),
            members: Cascade::new(member_tiers),
            owner_cache: Some(owner_cache),
            member_cache: Some(member_cache),
        }
    }
}

#[cfg(test)]
mod tests;
