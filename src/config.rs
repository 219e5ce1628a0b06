//! Configuration management for transform runs.
//!
//! Provides the policy switches that decide how row-level problems are
//! handled: whether invalid values are nullified or abort the batch, and
//! whether rows containing non-ASCII text are skipped or fatal.

use crate::constants::{NON_ASCII_ENV_VAR, NULLIFY_INVALID_ENV_VAR};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Handling of missing columns, out-of-range values and coercion failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ValidationPolicy {
    /// Record a warning and set the field to missing
    #[default]
    Lenient,
    /// Propagate the error and stop the batch at the offending row
    Strict,
}

impl ValidationPolicy {
    pub fn nullify_on_fail(&self) -> bool {
        matches!(self, ValidationPolicy::Lenient)
    }
}

/// Handling of rows containing non-ASCII characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NonAsciiPolicy {
    /// Emit a failed result for the row and continue
    #[default]
    Skip,
    /// Abort the batch
    Fail,
}

/// Configuration for a single transform invocation
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Field-level validation policy
    pub validation: ValidationPolicy,

    /// Non-ASCII row policy
    pub non_ascii: NonAsciiPolicy,

    /// Reuse the last packed bytes when a row stores identical values
    pub use_cached_bytes: bool,
}

impl TransformConfig {
    /// Build a configuration from the process environment
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(value) = std::env::var(NULLIFY_INVALID_ENV_VAR) {
            if matches!(value.trim().to_lowercase().as_str(), "false" | "0" | "no") {
                config.validation = ValidationPolicy::Strict;
            }
        }

        if let Ok(value) = std::env::var(NON_ASCII_ENV_VAR) {
            if value.trim().eq_ignore_ascii_case("fail") {
                config.non_ascii = NonAsciiPolicy::Fail;
            }
        }

        debug!("Transform configuration from environment: {:?}", config);
        config
    }

    /// Use the strict (non-nullifying) validation policy
    pub fn strict(mut self) -> Self {
        self.validation = ValidationPolicy::Strict;
        self
    }

    /// Set the validation policy
    pub fn with_validation(mut self, validation: ValidationPolicy) -> Self {
        self.validation = validation;
        self
    }

    /// Set the non-ASCII row policy
    pub fn with_non_ascii(mut self, non_ascii: NonAsciiPolicy) -> Self {
        self.non_ascii = non_ascii;
        self
    }

    /// Skip packing when a row stores exactly the values of the last encoded row
    pub fn with_cached_bytes(mut self) -> Self {
        self.use_cached_bytes = true;
        self
    }
}
