//! The lookup capability every permission tier implements.

use std::sync::Arc;

use crate::error::TierError;

/// One level of the read-through cascade.
///
/// A tier answers `Ok(None)` on a miss. Tiers that are cheaper than the ones
/// below them opt into write-back so a value found deeper in the cascade is
/// copied upwards before it is returned.
pub trait Tier<K, V>: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Looks up `key`.
    ///
    /// # Errors
    ///
    /// Returns a [`TierError`] when the tier cannot answer at all.
    fn lookup(&self, key: &K) -> Result<Option<V>, TierError>;

    /// Whether values found in deeper tiers should be copied into this one.
    fn accepts_write_back(&self) -> bool {
        false
    }

    /// Stores a value found in a deeper tier.
    ///
    /// # Errors
    ///
    /// Returns a [`TierError`] when the write cannot be recorded.
    fn write_back(&self, _key: &K, _value: &V) -> Result<(), TierError> {
        Ok(())
    }
}

impl<K, V, T> Tier<K, V> for Arc<T>
where
    T: Tier<K, V> + ?Sized,
{
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn lookup(&self, key: &K) -> Result<Option<V>, TierError> {
        (**self).lookup(key)
    }

    fn accepts_write_back(&self) -> bool {
        (**self).accepts_write_back()
    }

    fn write_back(&self, key: &K, value: &V) -> Result<(), TierError> {
        (**self).write_back(key, value)
    }
}
