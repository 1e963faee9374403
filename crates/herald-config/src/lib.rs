//! Shared configuration for the Herald interaction daemon.
//!
//! Configuration is layered by `ortho_config`: built-in defaults, then
//! configuration files, then `HERALD_*` environment variables, then command
//! line flags. The resulting [`Config`] carries the ambient settings (logging)
//! alongside the knobs that govern permission caching, endpoint validation and
//! remote-call timeouts.

mod defaults;
mod logging;
mod validation;

use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_APPLY_TIMEOUT_MS, DEFAULT_AUTHORITY_TIMEOUT_MS, DEFAULT_FAST_CACHE_CAPACITY,
    DEFAULT_LIST_PAGE_SIZE, DEFAULT_LOG_FILTER, DEFAULT_VALIDATION_TIMEOUT_MS,
    default_apply_timeout_ms, default_authority_timeout_ms, default_fast_cache_capacity,
    default_list_page_size, default_log_filter, default_log_filter_string, default_log_format,
    default_validation_mode, default_validation_timeout_ms,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use validation::{ValidationMode, ValidationOverride, ValidationPolicy};

/// Runtime configuration shared by the daemon and its tests.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "HERALD")]
pub struct Config {
    /// `tracing` filter expression applied to the telemetry subscriber.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for structured logs.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Global endpoint validation mode; realms may override it.
    #[serde(default = "default_validation_mode")]
    #[ortho_config(default = default_validation_mode())]
    pub validation_mode: ValidationMode,
    /// Global endpoint probe timeout in milliseconds.
    #[serde(default = "default_validation_timeout_ms")]
    #[ortho_config(default = default_validation_timeout_ms())]
    pub validation_timeout_ms: u64,
    /// Timeout for a single remote authority lookup in milliseconds.
    #[serde(default = "default_authority_timeout_ms")]
    #[ortho_config(default = default_authority_timeout_ms())]
    pub authority_timeout_ms: u64,
    /// Timeout for applying a patch to its target in milliseconds.
    #[serde(default = "default_apply_timeout_ms")]
    #[ortho_config(default = default_apply_timeout_ms())]
    pub apply_timeout_ms: u64,
    /// Entries kept by each permission fast cache.
    #[serde(default = "default_fast_cache_capacity")]
    #[ortho_config(default = default_fast_cache_capacity())]
    pub fast_cache_capacity: usize,
    /// Entries rendered by list commands before truncation.
    #[serde(default = "default_list_page_size")]
    #[ortho_config(default = default_list_page_size())]
    pub list_page_size: usize,
    /// Path of the JSON document backing the durable store. When unset the
    /// daemon keeps its state in memory.
    #[serde(default)]
    pub store_path: Option<Utf8PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            validation_mode: default_validation_mode(),
            validation_timeout_ms: default_validation_timeout_ms(),
            authority_timeout_ms: default_authority_timeout_ms(),
            apply_timeout_ms: default_apply_timeout_ms(),
            fast_cache_capacity: default_fast_cache_capacity(),
            list_page_size: default_list_page_size(),
            store_path: None,
        }
    }
}

impl Config {
    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Global validation policy used when a realm does not override it.
    #[must_use]
    pub const fn validation_policy(&self) -> ValidationPolicy {
        ValidationPolicy::new(
            self.validation_mode,
            Duration::from_millis(self.validation_timeout_ms),
        )
    }

    /// Timeout applied to each remote authority lookup.
    #[must_use]
    pub const fn authority_timeout(&self) -> Duration {
        Duration::from_millis(self.authority_timeout_ms)
    }

    /// Timeout applied to each patch application.
    #[must_use]
    pub const fn apply_timeout(&self) -> Duration {
        Duration::from_millis(self.apply_timeout_ms)
    }

    /// Capacity of each permission fast cache, clamped to at least one entry.
    #[must_use]
    pub fn fast_cache_capacity(&self) -> usize {
        self.fast_cache_capacity.max(1)
    }

    /// Page size for list commands, clamped to at least one entry.
    #[must_use]
    pub fn list_page_size(&self) -> usize {
        self.list_page_size.max(1)
    }

    /// Location of the durable store document, if any.
    #[must_use]
    pub fn store_path(&self) -> Option<&Utf8PathBuf> {
        self.store_path.as_ref()
    }
}
