//! Error handling for template-driven BUFR encoding.
//!
//! Leaf errors are typed per component so the row driver can decide,
//! based on the configured policy, whether a failure nullifies a field,
//! fails a single row, or aborts the whole batch.

use std::path::PathBuf;
use thiserror::Error;

use crate::models::Value;

/// Failures raised while parsing or resolving a value expression.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Invalid expression '{expression}': {reason}")]
    InvalidExpression { expression: String, reason: String },

    #[error("Column '{column}' not found in data row")]
    MissingColumn { column: String },

    #[error("Key '{key}' not found in station metadata")]
    MissingMetadata { key: String },
}

/// Failures raised by the scaling and validation unit or by type coercion.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{key}: Value ({value}) out of valid range ({valid_min} - {valid_max}).")]
    Range {
        key: String,
        value: Value,
        valid_min: Value,
        valid_max: Value,
    },

    #[error("{key}: {expected} expected but received {value}")]
    TypeCoercion {
        key: String,
        expected: String,
        value: Value,
    },

    #[error("Scaling failed for value {value} (scale {scale}, offset {offset}): {reason}")]
    Scaling {
        value: Value,
        scale: Value,
        offset: Value,
        reason: String,
    },
}

/// Failures reported by a [`crate::codec::Codec`] implementation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("Unable to create message: {reason}")]
    Init { reason: String },

    #[error("Unable to set '{key}': {reason}")]
    Set { key: String, reason: String },

    #[error("Unable to pack message: {reason}")]
    Pack { reason: String },

    #[error("Unable to write message: {reason}")]
    Write { reason: String },

    #[error("Key '{key}' not present in message")]
    UnknownKey { key: String },

    #[error("Attribute '{attribute}' not available for '{key}'")]
    Attribute { key: String, attribute: String },
}

#[derive(Error, Debug)]
pub enum Csv2BufrError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV read failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid template: {reason}")]
    InvalidTemplate { reason: String },

    #[error("Template not found: {name}")]
    TemplateNotFound { name: String },

    #[error("Template directory not readable: {path}")]
    TemplateDirectory { path: PathBuf },

    #[error("Unable to determine descriptor sequence or table version: {reason}")]
    MissingDescriptors { reason: String },

    #[error("No WIGOS station identifier configured: {reason}")]
    MissingStationIdentifier { reason: String },

    #[error("Invalid WIGOS station identifier '{identifier}'")]
    InvalidStationIdentifier { identifier: String },

    #[error("Unknown key '{key}' referenced by template")]
    UnknownKey { key: String },

    #[error("Row {row} contains non-ASCII characters: {content}")]
    NonAscii { row: usize, content: String },

    #[error("Column names row {row} not found in input")]
    MissingColumnNames { row: usize },

    #[error("Processing interrupted: {reason}")]
    ProcessingInterrupted { reason: String },

    #[error(transparent)]
    Expression(#[from] ExpressionError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl Csv2BufrError {
    /// Create an invalid template error
    pub fn invalid_template(reason: impl Into<String>) -> Self {
        Self::InvalidTemplate {
            reason: reason.into(),
        }
    }

    /// Create a missing descriptors error
    pub fn missing_descriptors(reason: impl Into<String>) -> Self {
        Self::MissingDescriptors {
            reason: reason.into(),
        }
    }

    /// Create a missing station identifier error
    pub fn missing_station_identifier(reason: impl Into<String>) -> Self {
        Self::MissingStationIdentifier {
            reason: reason.into(),
        }
    }

    /// Create a template not found error
    pub fn template_not_found(name: impl Into<String>) -> Self {
        Self::TemplateNotFound { name: name.into() }
    }

    /// Create a processing interrupted error
    pub fn processing_interrupted(reason: impl Into<String>) -> Self {
        Self::ProcessingInterrupted {
            reason: reason.into(),
        }
    }

    /// Whether the error is a data problem confined to one row, as opposed
    /// to a broken template or input stream
    pub fn is_row_level(&self) -> bool {
        match self {
            Self::NonAscii { .. } | Self::InvalidStationIdentifier { .. } | Self::Validation(_) => {
                true
            }
            Self::Expression(e) => !matches!(e, ExpressionError::InvalidExpression { .. }),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Csv2BufrError>;
