//! Per-row diagnostics collection.
//!
//! A [`Diagnostics`] collector is owned by one transform invocation and
//! passed by reference through the row-processing call chain. Every entry
//! is mirrored to `tracing` as it is recorded; the collector is drained
//! into each row's result and starts empty for the next row.

use tracing::{error, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning for the current row
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.warnings.push(message);
    }

    /// Record an error for the current row
    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!("{}", message);
        self.errors.push(message);
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty() && self.errors.is_empty()
    }

    /// Move the collected warnings and errors out, leaving the collector empty
    pub fn take(&mut self) -> (Vec<String>, Vec<String>) {
        (
            std::mem::take(&mut self.warnings),
            std::mem::take(&mut self.errors),
        )
    }

    pub fn clear(&mut self) {
        self.warnings.clear();
        self.errors.clear();
    }
}
