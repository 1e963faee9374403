//! Endpoint validation policy applied before persisting webhook patches.
//!
//! A policy pairs a [`ValidationMode`] with the timeout granted to a single
//! probe of the target endpoint. Realms may override the mode and timeout;
//! anything left unset falls back to the global defaults carried by
//! [`crate::Config`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How strictly a mutation must validate its target before persisting.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ValidationMode {
    /// Skip validation entirely.
    #[default]
    Off,
    /// Validate, but only warn when the probe fails.
    Soft,
    /// Validate and abort the mutation when the probe fails.
    Strict,
}

/// Resolved validation policy for one mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationPolicy {
    mode: ValidationMode,
    timeout: Duration,
}

impl ValidationPolicy {
    /// Builds a policy from its parts.
    #[must_use]
    pub const fn new(mode: ValidationMode, timeout: Duration) -> Self {
        Self { mode, timeout }
    }

    /// Validation mode.
    #[must_use]
    pub const fn mode(&self) -> ValidationMode {
        self.mode
    }

    /// Timeout granted to a single probe.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns true when the probe must run.
    #[must_use]
    pub const fn probes(&self) -> bool {
        !matches!(self.mode, ValidationMode::Off)
    }
}

/// Partial policy stored alongside realm settings.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ValidationOverride {
    /// Mode override; `None` keeps the global default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ValidationMode>,
    /// Timeout override in milliseconds; `None` keeps the global default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl ValidationOverride {
    /// Layers this override on top of `fallback`.
    #[must_use]
    pub fn resolve(&self, fallback: ValidationPolicy) -> ValidationPolicy {
        ValidationPolicy::new(
            self.mode.unwrap_or(fallback.mode()),
            self.timeout_ms
                .map_or(fallback.timeout(), Duration::from_millis),
        )
    }
}
