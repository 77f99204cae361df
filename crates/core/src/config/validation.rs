//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use std::ops::RangeInclusive;

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

const MAX_BYTES_LIMIT: usize = 50 * 1024 * 1024;
const TIMEOUT_MS_RANGE: RangeInclusive<u64> = 100..=300_000;
const INSTALL_ATTEMPTS_RANGE: RangeInclusive<u32> = 1..=10;

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

fn check_manifest_entry(entry: &str) -> Result<(), ConfigError> {
    if entry.starts_with("//") {
        return Err(invalid("manifest", format!("'{entry}' is protocol-relative; give the scheme explicitly")));
    }
    if entry.starts_with('/') {
        return Ok(());
    }
    if !(entry.starts_with("http://") || entry.starts_with("https://")) {
        return Err(invalid("manifest", format!("'{entry}' must be an absolute http(s) URL or start with '/'")));
    }
    url::Url::parse(entry)
        .map(|_| ())
        .map_err(|e| invalid("manifest", format!("'{entry}': {e}")))
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `cache_version` is empty, and
    /// `ConfigError::Invalid` if:
    /// - `cache_version` has surrounding whitespace
    /// - `origin` is not an absolute http(s) URL
    /// - a manifest entry is neither an absolute http(s) URL nor root-relative
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is outside 100ms..=5 minutes
    /// - `user_agent` is empty
    /// - `install_attempts` is outside 1..=10
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_version.is_empty() {
            return Err(ConfigError::Missing {
                field: "cache_version".into(),
                hint: "Set TETHER_CACHE_VERSION to a deployment identifier".into(),
            });
        }
        if self.cache_version.trim() != self.cache_version {
            return Err(invalid("cache_version", "must not have leading or trailing whitespace"));
        }

        self.origin_url()?;
        self.manifest.iter().try_for_each(|entry| check_manifest_entry(entry))?;

        if self.max_bytes == 0 || self.max_bytes > MAX_BYTES_LIMIT {
            return Err(invalid("max_bytes", format!("must be between 1 and {MAX_BYTES_LIMIT}")));
        }
        if !TIMEOUT_MS_RANGE.contains(&self.timeout_ms) {
            return Err(invalid("timeout_ms", format!("must be within {TIMEOUT_MS_RANGE:?}")));
        }
        if self.user_agent.trim().is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }
        if !INSTALL_ATTEMPTS_RANGE.contains(&self.install_attempts) {
            return Err(invalid("install_attempts", format!("must be within {INSTALL_ATTEMPTS_RANGE:?}")));
        }

        if self.manifest.is_empty() {
            tracing::warn!("manifest is empty; every request will take the network-first path");
        }

        Ok(())
    }
}
