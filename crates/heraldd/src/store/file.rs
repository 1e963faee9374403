//! JSON-file store with atomic replacement.
//!
//! The whole document is held in memory and rewritten on every change. Each
//! write goes to a temporary file in the target directory which is then
//! renamed over the original, so readers never observe a partial document.
//! A failed write leaves both the file and the in-memory copy untouched.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use herald_perms::RealmId;
use serde_json::Value;
use tempfile::Builder;
use tracing::debug;

use super::document::StoreDocument;
use super::{KeyValueStore, STORE_TARGET, Scope, StoreError, Transaction};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Durable [`KeyValueStore`] backed by one JSON file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    document: Mutex<StoreDocument>,
}

impl FileStore {
    /// Opens the store at `path`, starting empty when the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read or parsed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let document = match fs::read(&path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => StoreDocument::default(),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|source| StoreError::malformed(path.display().to_string(), source))?,
            Err(error) if error.kind() == io::ErrorKind::NotFound => StoreDocument::default(),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        debug!(target: STORE_TARGET, path = %path.display(), "opened file store");
        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreDocument>, StoreError> {
        self.document.lock().map_err(|_| StoreError::Poisoned)
    }

    fn mutate<T>(
        &self,
        change: impl FnOnce(&mut StoreDocument) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self.lock()?;
        let mut next = guard.clone();
        let outcome = change(&mut next)?;
        if next != *guard {
            self.persist(&next)?;
            *guard = next;
        }
        Ok(outcome)
    }

    fn persist(&self, document: &StoreDocument) -> Result<(), StoreError> {
        let io_error = |source| StoreError::Io {
            path: self.path.display().to_string(),
            source,
        };
        let bytes = serde_json::to_vec_pretty(document)
            .map_err(|source| StoreError::malformed(self.path.display().to_string(), source))?;
        atomic_write(&self.path, &bytes).map_err(io_error)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, scope: &Scope, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.lock()?.get(scope, key).cloned())
    }

    fn put(&self, scope: &Scope, key: &str, value: Value) -> Result<(), StoreError> {
        self.mutate(|document| {
            document.put(scope, key, value);
            Ok(())
        })
    }

    fn delete(&self, scope: &Scope, key: &str) -> Result<bool, StoreError> {
        self.mutate(|document| Ok(document.delete(scope, key)))
    }

    fn transact(
        &self,
        scope: &Scope,
        key: &str,
        apply: &mut Transaction<'_>,
    ) -> Result<(), StoreError> {
        self.mutate(|document| document.transact(scope, key, apply))
    }

    fn next_sequence(&self, realm: &RealmId) -> Result<u64, StoreError> {
        self.mutate(|document| Ok(document.next_sequence(realm)))
    }
}

fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut builder = Builder::new();
    builder.prefix(
        path.file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("herald"),
    );
    #[cfg(unix)]
    {
        builder.permissions(fs::Permissions::from_mode(0o600));
    }

    let mut file = builder.tempfile_in(directory)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;
    Ok(())
}
