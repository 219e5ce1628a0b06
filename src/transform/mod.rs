//! Batch transform of CSV text into BUFR messages.
//!
//! [`Transform::run`] performs every batch-level check up front (template
//! structure, station identifier source, descriptor sequence, key space,
//! column names) and returns a lazy [`RowResults`] iterator. Each call to
//! `next` converts exactly one data row. The iterator is forward-only: once
//! a row has been yielded its diagnostics are gone, and converting the input
//! again means calling [`Transform::run`] again.

mod driver;
pub mod wigos;

pub use wigos::WigosIdentifier;

use crate::codec::{Bufr4Codec, Codec};
use crate::config::TransformConfig;
use crate::error::{Csv2BufrError, Result};
use crate::message::BufrMessage;
use crate::models::{Row, RowResult};
use crate::template::Template;
use driver::RowDriver;
use std::iter::FusedIterator;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Builder for one transform invocation
pub struct Transform<'a> {
    template: &'a Template,
    codec: Arc<dyn Codec>,
    config: TransformConfig,
    metadata: Row,
}

impl<'a> Transform<'a> {
    pub fn new(template: &'a Template) -> Self {
        Self {
            template,
            codec: Arc::new(Bufr4Codec::new()),
            config: TransformConfig::default(),
            metadata: Row::new(),
        }
    }

    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_config(mut self, config: TransformConfig) -> Self {
        self.config = config;
        self
    }

    /// Station metadata resolved by `metadata:` expressions
    pub fn with_metadata(mut self, metadata: Row) -> Self {
        self.metadata = metadata;
        self
    }

    /// Validate the batch and start converting rows
    pub fn run(self, csv_text: &'a str) -> Result<RowResults<'a>> {
        let template = self.template;
        template.validate()?;

        let station = template.station_identifier_source()?;
        let params = template.message_params(&self.metadata)?;
        let message = BufrMessage::new(self.codec, params)?;

        if let Some(field) = template.fields().find(|f| !message.contains(&f.eccodes_key)) {
            return Err(Csv2BufrError::UnknownKey {
                key: field.eccodes_key.clone(),
            });
        }

        let mut records = template
            .dialect()?
            .reader_builder()
            .from_reader(csv_text.as_bytes())
            .into_records();

        let mut columns = None;
        for row in 1..=template.number_header_rows {
            let Some(record) = records.next() else {
                break;
            };
            let record = record?;
            if row == template.column_names_row {
                columns = Some(record.iter().map(str::to_string).collect::<Vec<_>>());
            } else {
                debug!("Skipping header row {}", row);
            }
        }
        let columns = columns.ok_or(Csv2BufrError::MissingColumnNames {
            row: template.column_names_row,
        })?;
        debug!("Column names: {:?}", columns);

        Ok(RowResults {
            driver: RowDriver::new(
                template,
                station,
                message,
                self.config,
                self.metadata,
                columns,
            ),
            records,
            next_row: 0,
            passed: 0,
            failed: 0,
            finished: false,
        })
    }
}

/// Convert CSV text with the default codec and a configuration taken from
/// the environment
pub fn transform<'a>(csv_text: &'a str, template: &'a Template) -> Result<RowResults<'a>> {
    Transform::new(template)
        .with_config(TransformConfig::from_env())
        .run(csv_text)
}

/// Lazy sequence of row results, one per CSV data row in input order.
///
/// A batch-fatal error is yielded once as `Err`, after which the iterator
/// is exhausted.
pub struct RowResults<'a> {
    driver: RowDriver<'a>,
    records: csv::StringRecordsIntoIter<&'a [u8]>,
    next_row: usize,
    passed: usize,
    failed: usize,
    finished: bool,
}

impl RowResults<'_> {
    pub fn columns(&self) -> &[String] {
        self.driver.columns()
    }

    pub fn passed(&self) -> usize {
        self.passed
    }

    pub fn failed(&self) -> usize {
        self.failed
    }
}

impl Iterator for RowResults<'_> {
    type Item = Result<RowResult>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let record = match self.records.next() {
            None => {
                self.finished = true;
                info!(
                    "{} row(s) read: {} converted, {} failed",
                    self.next_row, self.passed, self.failed
                );
                return None;
            }
            Some(Err(e)) => {
                self.finished = true;
                error!("CSV read failed after row {}: {}", self.next_row, e);
                return Some(Err(e.into()));
            }
            Some(Ok(record)) => record,
        };

        let index = self.next_row;
        self.next_row += 1;

        match self.driver.process(index, &record) {
            Ok(result) => {
                if result.is_passed() {
                    self.passed += 1;
                } else {
                    self.failed += 1;
                }
                Some(Ok(result))
            }
            Err(e) => {
                self.finished = true;
                error!("Aborting batch at row {}: {}", index, e);
                Some(Err(e))
            }
        }
    }
}

impl FusedIterator for RowResults<'_> {}

#[cfg(test)]
mod tests;
