//! Configuration loaders covering success and failure paths.

use std::ffi::OsString;
use std::fs;
use std::sync::Arc;

use camino::Utf8PathBuf;
use herald_config::{Config, LogFormat};
use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;

use crate::bootstrap::ConfigLoader;

/// Loader pointing the store at a fresh temporary directory.
pub struct TestConfigLoader {
    dir: TempDir,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temporary store directory"),
        }
    }

    fn store_path(&self) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.dir.path().join("herald.json"))
            .expect("temporary store path was not valid UTF-8")
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            log_format: LogFormat::Compact,
            store_path: Some(self.store_path()),
            ..Config::default()
        })
    }
}

/// Loader that fails by passing an invalid command line.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("heraldd"),
            OsString::from("--fast-cache-capacity"),
            OsString::from("lots"),
        ];
        Config::load_from_iter(args)
    }
}

/// Loader whose store document is not valid JSON.
pub struct CorruptStoreLoader {
    inner: TestConfigLoader,
}

impl CorruptStoreLoader {
    #[must_use]
    pub fn new() -> Self {
        let inner = TestConfigLoader::new();
        fs::write(inner.store_path(), "{ not json").expect("failed to seed corrupt store");
        Self { inner }
    }
}

impl ConfigLoader for CorruptStoreLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        self.inner.load()
    }
}
