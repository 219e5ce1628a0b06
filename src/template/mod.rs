//! Mapping templates.
//!
//! A template is a JSON document describing how CSV columns and constants
//! map onto message keys. Expressions are parsed into [`Expr`] values while
//! the document is deserialized, so a loaded [`Template`] never carries a
//! malformed expression.

pub mod skeleton;
pub mod store;

pub use skeleton::create_template;
pub use store::{TemplateEntry, TemplateStore};

use crate::codec::MessageParams;
use crate::constants::{
    DEFAULT_DELIMITER, DEFAULT_QUOTECHAR, MASTER_TABLE_VERSION_KEY, QUOTE_NONE,
    UNEXPANDED_DESCRIPTORS_KEY, wigos_keys,
};
use crate::error::{Csv2BufrError, Result};
use crate::expression::Expr;
use crate::models::{Row, Value};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Mapping of one message key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub eccodes_key: String,

    pub value: Expr,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<Expr>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<Expr>,

    #[serde(default, alias = "valid-min", skip_serializing_if = "Option::is_none")]
    pub valid_min: Option<Expr>,

    #[serde(default, alias = "valid-max", skip_serializing_if = "Option::is_none")]
    pub valid_max: Option<Expr>,
}

impl FieldSpec {
    pub fn new(eccodes_key: impl Into<String>, value: Expr) -> Self {
        Self {
            eccodes_key: eccodes_key.into(),
            value,
            scale: None,
            offset: None,
            valid_min: None,
            valid_max: None,
        }
    }

    pub fn with_scaling(mut self, scale: Expr, offset: Expr) -> Self {
        self.scale = Some(scale);
        self.offset = Some(offset);
        self
    }

    pub fn with_range(mut self, valid_min: Expr, valid_max: Expr) -> Self {
        self.valid_min = Some(valid_min);
        self.valid_max = Some(valid_max);
        self
    }

    fn validate(&self, section: &str, position: usize) -> Result<()> {
        if self.eccodes_key.trim().is_empty() {
            return Err(Csv2BufrError::invalid_template(format!(
                "{} entry {} has an empty eccodes_key",
                section, position
            )));
        }
        if self.scale.is_some() != self.offset.is_some() {
            return Err(Csv2BufrError::invalid_template(format!(
                "{}: scale and offset must be given together",
                self.eccodes_key
            )));
        }
        Ok(())
    }
}

/// Where the station identifier of each row comes from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StationIdentifierSource<'a> {
    /// One expression yielding `series-issuer-issueNumber-local`
    Expression(&'a Expr),
    /// The four component fields, in series, issuer, issue number, local order
    Components([&'a FieldSpec; 4]),
}

/// CSV dialect derived from a template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvDialect {
    pub delimiter: u8,
    pub quote: u8,
    pub quoting: bool,
}

impl CsvDialect {
    pub fn reader_builder(&self) -> csv::ReaderBuilder {
        let mut builder = csv::ReaderBuilder::new();
        builder
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .delimiter(self.delimiter)
            .quote(self.quote)
            .quoting(self.quoting);
        builder
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(rename = "inputShortDelayedDescriptorReplicationFactor")]
    pub short_replication: Vec<i64>,

    #[serde(rename = "inputDelayedDescriptorReplicationFactor")]
    pub normal_replication: Vec<i64>,

    #[serde(rename = "inputExtendedDelayedDescriptorReplicationFactor")]
    pub extended_replication: Vec<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wigos_station_identifier: Option<Expr>,

    /// Rows preceding the data, column names included
    pub number_header_rows: usize,

    /// One-based row holding the column names
    pub column_names_row: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<char>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quoting: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quotechar: Option<char>,

    pub header: Vec<FieldSpec>,

    pub data: Vec<FieldSpec>,
}

impl Template {
    /// Parse and structurally validate a template document
    pub fn from_json(json: &str) -> Result<Self> {
        let template: Template =
            serde_json::from_str(json).map_err(|e| Csv2BufrError::invalid_template(e.to_string()))?;
        template.validate()?;
        Ok(template)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading template from {}", path.display());
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the structural rules that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.number_header_rows == 0 {
            return Err(Csv2BufrError::invalid_template(
                "number_header_rows must include the column names row",
            ));
        }
        if self.column_names_row == 0 || self.column_names_row > self.number_header_rows {
            return Err(Csv2BufrError::invalid_template(format!(
                "column_names_row {} outside header rows 1..={}",
                self.column_names_row, self.number_header_rows
            )));
        }

        for (position, field) in self.header.iter().enumerate() {
            field.validate("header", position)?;
        }
        for (position, field) in self.data.iter().enumerate() {
            field.validate("data", position)?;
        }

        self.dialect()?;
        Ok(())
    }

    /// All field specs, header section first
    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.header.iter().chain(self.data.iter())
    }

    pub fn find_field(&self, key: &str) -> Option<&FieldSpec> {
        self.fields().find(|f| f.eccodes_key == key)
    }

    pub fn station_identifier_source(&self) -> Result<StationIdentifierSource<'_>> {
        if let Some(expr) = &self.wigos_station_identifier {
            return Ok(StationIdentifierSource::Expression(expr));
        }

        let find = |key: &str| self.data.iter().find(|f| f.eccodes_key == key);
        match (
            find(wigos_keys::SERIES),
            find(wigos_keys::ISSUER),
            find(wigos_keys::ISSUE_NUMBER),
            find(wigos_keys::LOCAL),
        ) {
            (Some(series), Some(issuer), Some(issue_number), Some(local)) => Ok(
                StationIdentifierSource::Components([series, issuer, issue_number, local]),
            ),
            _ => Err(Csv2BufrError::missing_station_identifier(
                "template has neither wigos_station_identifier nor the four WIGOS identifier fields",
            )),
        }
    }

    /// Resolve the descriptor sequence and table version.
    ///
    /// Both must come from header fields that do not depend on row data.
    pub fn message_params(&self, metadata: &Row) -> Result<MessageParams> {
        let resolve = |key: &str| -> Result<Value> {
            let field = self
                .header
                .iter()
                .find(|f| f.eccodes_key == key)
                .ok_or_else(|| Csv2BufrError::missing_descriptors(format!("no header entry for {}", key)))?;
            if field.value.is_row_dependent() {
                return Err(Csv2BufrError::missing_descriptors(format!(
                    "{} must not depend on row data",
                    key
                )));
            }
            field
                .value
                .resolve(&Row::new(), metadata)
                .map_err(|e| Csv2BufrError::missing_descriptors(e.to_string()))
        };

        let descriptors = match resolve(UNEXPANDED_DESCRIPTORS_KEY)? {
            Value::List(values) => values
                .iter()
                .map(|v| match v {
                    Value::Int(i) => Ok(*i),
                    other => Err(Csv2BufrError::missing_descriptors(format!(
                        "descriptor {} is not an integer",
                        other
                    ))),
                })
                .collect::<Result<Vec<i64>>>()?,
            Value::Int(single) => vec![single],
            other => {
                return Err(Csv2BufrError::missing_descriptors(format!(
                    "{} resolved to {}",
                    UNEXPANDED_DESCRIPTORS_KEY, other
                )));
            }
        };

        let table_version = resolve(MASTER_TABLE_VERSION_KEY)?.as_i64().ok_or_else(|| {
            Csv2BufrError::missing_descriptors(format!("{} is not an integer", MASTER_TABLE_VERSION_KEY))
        })?;

        Ok(MessageParams {
            descriptors,
            short_replication: self.short_replication.clone(),
            normal_replication: self.normal_replication.clone(),
            extended_replication: self.extended_replication.clone(),
            table_version,
        })
    }

    /// CSV dialect, defaulting to comma separated with double quotes
    pub fn dialect(&self) -> Result<CsvDialect> {
        let byte = |c: char, what: &str| -> Result<u8> {
            u8::try_from(c)
                .ok()
                .filter(u8::is_ascii)
                .ok_or_else(|| Csv2BufrError::invalid_template(format!("{} '{}' is not ASCII", what, c)))
        };

        Ok(CsvDialect {
            delimiter: byte(self.delimiter.unwrap_or(DEFAULT_DELIMITER), "delimiter")?,
            quote: byte(self.quotechar.unwrap_or(DEFAULT_QUOTECHAR), "quotechar")?,
            quoting: self.quoting.as_deref() != Some(QUOTE_NONE),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests;
