//! Tests for the row driver and the lazy result sequence


use super::Transform;
use crate::config::TransformConfig;
use crate::error::Result;
use crate::models::RowResult;
use crate::template::Template;

pub use crate::template::tests::{SURFACE_HEADER, SURFACE_ROW, surface_csv, surface_template};

/// Convert every row, collecting results including a terminating error
pub fn run_all(template: &Template, csv: &str, config: TransformConfig) -> Vec<Result<RowResult>> {
    Transform::new(template)
        .with_config(config)
        .run(csv)
        .expect("batch starts")
        .collect()
}

/// Convert every row and require that none aborted the batch
pub fn run_ok(template: &Template, csv: &str) -> Vec<RowResult> {
    run_all(template, csv, TransformConfig::default())
        .into_iter()
        .map(|r| r.expect("row converted"))
        .collect()
}

/// Surface data line with one column replaced
pub fn surface_row_with(column: usize, value: &str) -> String {
    SURFACE_ROW
        .split(',')
        .enumerate()
        .map(|(i, field)| if i == column { value } else { field })
        .collect::<Vec<_>>()
        .join(",")
}

pub const LATITUDE_COLUMN: usize = 2;
pub const PRESSURE_COLUMN: usize = 1;
pub const TEMPERATURE_COLUMN: usize = 0;
