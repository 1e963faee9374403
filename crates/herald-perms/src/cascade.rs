//! Ordered chain of tiers with write-back on a deep hit.
//!
//! Tiers are consulted cheapest first. The final tier is authoritative: its
//! miss or failure ends the resolution with a [`ResolveError`], while misses
//! and failures of earlier tiers are logged and skipped. A hit at depth `i`
//! is written back into every shallower tier that accepts write-back, so
//! repeated lookups for the same key converge on the first tier.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::ResolveError;
use crate::tier::Tier;

pub(crate) const CASCADE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::cascade");

/// A value together with the tier that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution<V> {
    value: V,
    tier: &'static str,
    depth: usize,
}

impl<V> Resolution<V> {
    /// Resolved value.
    #[must_use]
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Consumes the resolution, returning the value.
    #[must_use]
    pub fn into_value(self) -> V {
        self.value
    }

    /// Name of the tier that answered.
    #[must_use]
    pub const fn tier(&self) -> &'static str {
        self.tier
    }

    /// Zero-based position of the answering tier.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }
}

/// Read-through chain of responsibility over [`Tier`] implementations.
pub struct Cascade<K, V> {
    tiers: Vec<Arc<dyn Tier<K, V>>>,
}

impl<K, V> Cascade<K, V>
where
    K: fmt::Display,
{
    /// Builds a cascade from tiers ordered cheapest first.
    #[must_use]
    pub fn new(tiers: Vec<Arc<dyn Tier<K, V>>>) -> Self {
        Self { tiers }
    }

    /// Names of the configured tiers, cheapest first.
    #[must_use]
    pub fn tier_names(&self) -> Vec<&'static str> {
        self.tiers.iter().map(|tier| tier.name()).collect()
    }

    /// Resolves `key`, writing the value back into shallower tiers.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when the authoritative tier misses or fails,
    /// or when no tiers are configured.
    pub fn resolve(&self, key: &K) -> Result<Resolution<V>, ResolveError> {
        let last = self.tiers.len().checked_sub(1).ok_or(ResolveError::NoTiers)?;

        for (depth, tier) in self.tiers.iter().enumerate() {
            match tier.lookup(key) {
                Ok(Some(value)) => {
                    self.write_back(depth, key, &value);
                    return Ok(Resolution {
                        value,
                        tier: tier.name(),
                        depth,
                    });
                }
                Ok(None) if depth == last => {
                    return Err(ResolveError::NotFound {
                        key: key.to_string(),
                    });
                }
                Err(source) if depth == last => {
                    return Err(ResolveError::Unavailable {
                        tier: tier.name(),
                        key: key.to_string(),
                        source,
                    });
                }
                Ok(None) => {
                    debug!(target: CASCADE_TARGET, tier = tier.name(), %key, "tier miss");
                }
                Err(error) => {
                    debug!(target: CASCADE_TARGET, tier = tier.name(), %key, %error, "tier failed, falling through");
                }
            }
        }

        Err(ResolveError::NoTiers)
    }

    fn write_back(&self, depth: usize, key: &K, value: &V) {
        for tier in self.tiers.iter().take(depth) {
            if !tier.accepts_write_back() {
                continue;
            }
            if let Err(error) = tier.write_back(key, value) {
                warn!(target: CASCADE_TARGET, tier = tier.name(), %key, %error, "write-back failed");
            }
        }
    }
}

impl<K, V> fmt::Debug for Cascade<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Cascade")
            .field(
                "tiers",
                &self.tiers.iter().map(|tier| tier.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
