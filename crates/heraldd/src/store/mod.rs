//! Durable key-value storage for realm settings, permission copies and
//! webhook-embed patches.
//!
//! Values live under a `(scope, key)` address. [`KeyValueStore::transact`]
//! gives a read-modify-write over one address that no concurrent writer can
//! interleave with; the patch repository relies on it for duplicate checks.

mod document;
mod file;
mod memory;
mod permissions;

use std::fmt;

use herald_perms::RealmId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use permissions::StorePermissions;

/// Tracing target for store operations.
pub(crate) const STORE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::store");

/// Namespace a stored value belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Shared by every realm.
    Global,
    /// Private to one realm.
    Realm(RealmId),
}

impl Scope {
    /// Stable string used to address the scope on disk.
    #[must_use]
    pub fn storage_key(&self) -> String {
        match self {
            Self::Global => "global".to_owned(),
            Self::Realm(realm) => format!("realm:{realm}"),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => formatter.write_str("global"),
            Self::Realm(realm) => write!(formatter, "realm {realm}"),
        }
    }
}

/// Errors raised by stores and by `transact` closures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A value was expected at the address but none exists.
    #[error("no value stored under '{key}' in {scope}")]
    Missing {
        /// Scope searched.
        scope: Scope,
        /// Key searched.
        key: String,
    },

    /// The write would overwrite a value it must not.
    #[error("'{key}' already exists in {scope}")]
    Conflict {
        /// Scope written.
        scope: Scope,
        /// Key already taken.
        key: String,
    },

    /// A stored value did not have the expected shape.
    #[error("stored value under '{key}' is malformed: {source}")]
    Malformed {
        /// Key read.
        key: String,
        /// Decoding failure.
        #[source]
        source: serde_json::Error,
    },

    /// The backing file could not be read or written.
    #[error("store IO failed for {path}: {source}")]
    Io {
        /// File involved.
        path: String,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },

    /// The in-memory state lock was poisoned.
    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// Creates a missing-value error.
    pub fn missing(scope: &Scope, key: impl Into<String>) -> Self {
        Self::Missing {
            scope: scope.clone(),
            key: key.into(),
        }
    }

    /// Creates a conflict error.
    pub fn conflict(scope: &Scope, key: impl Into<String>) -> Self {
        Self::Conflict {
            scope: scope.clone(),
            key: key.into(),
        }
    }

    /// Creates a malformed-value error.
    pub fn malformed(key: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Malformed {
            key: key.into(),
            source,
        }
    }
}

/// Closure applied by [`KeyValueStore::transact`].
///
/// Receives the current value and returns the replacement: `Some` stores it,
/// `None` deletes the address. Returning an error aborts without writing.
pub type Transaction<'a> = dyn FnMut(Option<Value>) -> Result<Option<Value>, StoreError> + 'a;

/// Durable key-value storage.
pub trait KeyValueStore: Send + Sync {
    /// Reads the value at `(scope, key)`.
    ///
    /// # Errors
    ///
    /// Returns an error when the store cannot be read.
    fn get(&self, scope: &Scope, key: &str) -> Result<Option<Value>, StoreError>;

    /// Writes the value at `(scope, key)`.
    ///
    /// # Errors
    ///
    /// Returns an error when the store cannot be written.
    fn put(&self, scope: &Scope, key: &str, value: Value) -> Result<(), StoreError>;

    /// Removes the value at `(scope, key)`, returning whether one existed.
    ///
    /// # Errors
    ///
    /// Returns an error when the store cannot be written.
    fn delete(&self, scope: &Scope, key: &str) -> Result<bool, StoreError>;

    /// Atomically replaces the value at `(scope, key)` with the result of
    /// `apply`.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or an error when the store cannot be
    /// written. Nothing is written on error.
    fn transact(
        &self,
        scope: &Scope,
        key: &str,
        apply: &mut Transaction<'_>,
    ) -> Result<(), StoreError>;

    /// Returns the next value of the realm's monotonic counter, starting at 1.
    ///
    /// # Errors
    ///
    /// Returns an error when the store cannot be written.
    fn next_sequence(&self, realm: &RealmId) -> Result<u64, StoreError>;
}
