//! Multi-tier permission resolution for Herald.
//!
//! Every question the router asks ("who owns this realm", "which roles does
//! this member hold") is answered by a read-through [`Cascade`] of tiers,
//! cheapest first:
//!
//! 1. [`FastCache`]: bounded in-process LRU.
//! 2. [`LocalSnapshot`]: event-maintained local mirror.
//! 3. [`StoreTier`]: persisted copies behind a [`PermissionStore`].
//! 4. [`AuthorityTier`]: the [`RemoteAuthority`], the source of truth.
//!
//! A hit below the first tier is written back into the cheaper tiers that
//! accept it before being returned. The [`PermissionResolver`] combines the
//! owner and member cascades into a single allow/deny decision that never
//! fails open.

mod authority;
mod cache;
mod cascade;
mod error;
mod ids;
mod resolver;
mod snapshot;
mod store;
mod tier;

pub use authority::{AuthorityTier, RemoteAuthority, UnreachableAuthority};
pub use cache::FastCache;
pub use cascade::{Cascade, Resolution};
pub use error::{AuthorityError, ResolveError, TierError};
pub use ids::{MemberKey, RealmId, RoleId, RoleSet, UserId};
pub use resolver::{
    DEFAULT_AUTHORITY_TIMEOUT, DEFAULT_CACHE_CAPACITY, PermissionResolver,
    PermissionResolverBuilder,
};
pub use snapshot::LocalSnapshot;
pub use store::{PermissionStore, StoreTier};
pub use tier::Tier;
