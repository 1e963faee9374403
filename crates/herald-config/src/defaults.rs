use crate::logging::LogFormat;
use crate::validation::ValidationMode;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default timeout, in milliseconds, for a single endpoint probe.
pub const DEFAULT_VALIDATION_TIMEOUT_MS: u64 = 5_000;

/// Default timeout, in milliseconds, for a remote authority lookup.
pub const DEFAULT_AUTHORITY_TIMEOUT_MS: u64 = 5_000;

/// Default timeout, in milliseconds, for applying a patch to its target.
pub const DEFAULT_APPLY_TIMEOUT_MS: u64 = 10_000;

/// Default number of entries held by each permission fast cache.
pub const DEFAULT_FAST_CACHE_CAPACITY: usize = 1_024;

/// Default number of entries rendered by list commands.
pub const DEFAULT_LIST_PAGE_SIZE: usize = 10;

/// Default log filter expression used by the binaries.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default validation mode when a realm does not override it.
#[must_use]
pub fn default_validation_mode() -> ValidationMode {
    ValidationMode::Off
}

/// Serde helper returning [`DEFAULT_VALIDATION_TIMEOUT_MS`].
#[must_use]
pub const fn default_validation_timeout_ms() -> u64 {
    DEFAULT_VALIDATION_TIMEOUT_MS
}

/// Serde helper returning [`DEFAULT_AUTHORITY_TIMEOUT_MS`].
#[must_use]
pub const fn default_authority_timeout_ms() -> u64 {
    DEFAULT_AUTHORITY_TIMEOUT_MS
}

/// Serde helper returning [`DEFAULT_APPLY_TIMEOUT_MS`].
#[must_use]
pub const fn default_apply_timeout_ms() -> u64 {
    DEFAULT_APPLY_TIMEOUT_MS
}

/// Serde helper returning [`DEFAULT_FAST_CACHE_CAPACITY`].
#[must_use]
pub const fn default_fast_cache_capacity() -> usize {
    DEFAULT_FAST_CACHE_CAPACITY
}

/// Serde helper returning [`DEFAULT_LIST_PAGE_SIZE`].
#[must_use]
pub const fn default_list_page_size() -> usize {
    DEFAULT_LIST_PAGE_SIZE
}
