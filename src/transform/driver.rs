//! Per-row processing: resolve, validate, scale and store every template
//! field, then serialize and describe the message.

use super::wigos::WigosIdentifier;
use crate::config::{NonAsciiPolicy, TransformConfig};
use crate::constants::{
    DATA_CATEGORY_KEY, IDENTIFIER_PREFIX, LATITUDE_KEY, LONGITUDE_KEY, ORIGINATING_CENTRE_KEY,
    datetime_keys,
};
use crate::diagnostics::Diagnostics;
use crate::error::{Csv2BufrError, Result};
use crate::expression::Expr;
use crate::message::{BufrMessage, coerce};
use crate::models::{Geometry, NativeType, Row, RowProperties, RowResult, RowStatus, Value};
use crate::template::{FieldSpec, StationIdentifierSource, Template};
use crate::validation::{apply_scaling, normalize_missing, validate_range};
use chrono::{DateTime, TimeZone, Utc};
use csv::StringRecord;
use tracing::{debug, trace};

pub(crate) struct RowDriver<'a> {
    template: &'a Template,
    station: StationIdentifierSource<'a>,
    message: BufrMessage,
    config: TransformConfig,
    metadata: Row,
    columns: Vec<String>,
    diagnostics: Diagnostics,
}

impl<'a> RowDriver<'a> {
    pub(crate) fn new(
        template: &'a Template,
        station: StationIdentifierSource<'a>,
        message: BufrMessage,
        config: TransformConfig,
        metadata: Row,
        columns: Vec<String>,
    ) -> Self {
        Self {
            template,
            station,
            message,
            config,
            metadata,
            columns,
            diagnostics: Diagnostics::new(),
        }
    }

    pub(crate) fn columns(&self) -> &[String] {
        &self.columns
    }

    #[cfg(test)]
    pub(crate) fn message(&self) -> &BufrMessage {
        &self.message
    }

    fn lenient(&self) -> bool {
        self.config.validation.nullify_on_fail()
    }

    /// Convert one data row.
    ///
    /// Returns `Err` only for failures the configured policy treats as
    /// fatal to the batch; every other problem yields a failed result.
    pub(crate) fn process(&mut self, index: usize, record: &StringRecord) -> Result<RowResult> {
        self.diagnostics.clear();

        if let Some(content) = non_ascii_content(record) {
            if self.config.non_ascii == NonAsciiPolicy::Fail || !self.lenient() {
                return Err(Csv2BufrError::NonAscii {
                    row: index,
                    content,
                });
            }
            self.diagnostics.warn(format!(
                "Row {} contains non-ASCII characters, row skipped: {}",
                index, content
            ));
            return Ok(self.failed(index, None));
        }

        let mut row = self.build_row(record);

        let wsi = match self.station_identifier(&row) {
            Ok(wsi) => wsi,
            Err(e) if self.lenient() && e.is_row_level() => {
                self.diagnostics
                    .error(format!("Unable to determine station identifier: {}", e));
                return Ok(self.failed(index, None));
            }
            Err(e) => return Err(e),
        };
        wsi.insert_columns(&mut row);

        self.message.reset();
        let template = self.template;
        for field in template.fields() {
            self.apply_field(field, &row)?;
        }

        let Some(bytes) = self
            .message
            .serialize(self.config.use_cached_bytes, &mut self.diagnostics)
        else {
            return Ok(self.failed(index, Some(&wsi)));
        };

        let Some(datetime) = self.characteristic_datetime() else {
            self.diagnostics.error(format!(
                "Unable to determine characteristic date/time from {}..{}",
                datetime_keys::YEAR,
                datetime_keys::MINUTE
            ));
            return Ok(self.failed(index, Some(&wsi)));
        };

        let identifier = format!(
            "{}_{}_{}",
            IDENTIFIER_PREFIX,
            wsi,
            datetime.format("%Y%m%dT%H%M%S")
        );
        let checksum = self.message.checksum();
        debug!("Row {} encoded as {} ({} bytes)", index, identifier, bytes.len());

        let properties = RowProperties {
            identifier: identifier.clone(),
            wigos_station_identifier: wsi.to_string(),
            datetime: Some(datetime),
            checksum: checksum.clone(),
            originating_centre: self.stored(ORIGINATING_CENTRE_KEY).as_i64(),
            data_category: self.stored(DATA_CATEGORY_KEY).as_i64(),
        };
        let geometry = Geometry {
            lon: self.stored(LONGITUDE_KEY).as_f64(),
            lat: self.stored(LATITUDE_KEY).as_f64(),
        };
        let (warnings, errors) = self.diagnostics.take();

        Ok(RowResult {
            row: index,
            status: RowStatus::Passed,
            bytes: Some(bytes),
            identifier,
            checksum,
            geometry,
            properties,
            warnings,
            errors,
        })
    }

    fn build_row(&self, record: &StringRecord) -> Row {
        self.columns
            .iter()
            .zip(record.iter())
            .map(|(column, field)| (column.clone(), Value::from_csv_field(field)))
            .collect()
    }

    fn station_identifier(&self, row: &Row) -> Result<WigosIdentifier> {
        match self.station {
            StationIdentifierSource::Expression(expr) => {
                let value = expr.resolve(row, &self.metadata)?;
                value.to_string().parse()
            }
            StationIdentifierSource::Components(fields) => {
                let [series, issuer, issue_number, local] = fields.map(|f| {
                    f.value
                        .resolve(row, &self.metadata)
                        .map(normalize_missing)
                });
                WigosIdentifier::from_components([&series?, &issuer?, &issue_number?, &local?])
            }
        }
    }

    /// Resolve, normalize, coerce, validate, scale and store one field
    fn apply_field(&mut self, field: &FieldSpec, row: &Row) -> Result<()> {
        let key = field.eccodes_key.as_str();

        let value = self.resolve(key, Some(&field.value), row)?;
        let value = normalize_missing(value);

        let value = match self.message.native_type(key) {
            Some(native @ (NativeType::Int | NativeType::Float))
                if self.message.is_header(key) == Some(false) =>
            {
                self.recover(key, coerce(key, value, native))?
            }
            _ => value,
        };

        let valid_min = self.resolve(key, field.valid_min.as_ref(), row)?;
        let valid_max = self.resolve(key, field.valid_max.as_ref(), row)?;
        let lenient = self.lenient();
        let value = validate_range(
            key,
            value,
            &valid_min,
            &valid_max,
            lenient,
            &mut self.diagnostics,
        )?;

        let scale = self.resolve(key, field.scale.as_ref(), row)?;
        let offset = self.resolve(key, field.offset.as_ref(), row)?;
        let value = self.recover(key, apply_scaling(value, &scale, &offset))?;
        let value = normalize_missing(value);

        trace!("{} resolved to {}", key, value);
        self.message
            .set(key, value, self.config.validation, &mut self.diagnostics)
    }

    /// Resolve an optional expression, `Value::Null` when absent
    fn resolve(&mut self, key: &str, expr: Option<&Expr>, row: &Row) -> Result<Value> {
        match expr {
            None => Ok(Value::Null),
            Some(expr) => {
                let resolved = expr.resolve(row, &self.metadata);
                self.recover(key, resolved)
            }
        }
    }

    /// Apply the validation policy to a row-level failure
    fn recover<E: Into<Csv2BufrError>>(
        &mut self,
        key: &str,
        result: std::result::Result<Value, E>,
    ) -> Result<Value> {
        let error = match result {
            Ok(value) => return Ok(value),
            Err(e) => e.into(),
        };

        if !(self.lenient() && error.is_row_level()) {
            return Err(error);
        }

        match &error {
            Csv2BufrError::Validation(_) => {
                self.diagnostics
                    .warn(format!("{} Element set to missing", error));
            }
            _ => {
                self.diagnostics
                    .warn(format!("{}: {}. Element set to missing", key, error));
            }
        }
        Ok(Value::Null)
    }

    fn stored(&self, key: &str) -> Value {
        self.message.get(key).unwrap_or(Value::Null)
    }

    fn characteristic_datetime(&self) -> Option<DateTime<Utc>> {
        let part = |key: &str| self.stored(key).as_i64();
        let year = i32::try_from(part(datetime_keys::YEAR)?).ok()?;
        let month = u32::try_from(part(datetime_keys::MONTH)?).ok()?;
        let day = u32::try_from(part(datetime_keys::DAY)?).ok()?;
        let hour = u32::try_from(part(datetime_keys::HOUR)?).ok()?;
        let minute = u32::try_from(part(datetime_keys::MINUTE)?).ok()?;
        Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
            .single()
    }

    fn failed(&mut self, index: usize, wsi: Option<&WigosIdentifier>) -> RowResult {
        let (warnings, errors) = self.diagnostics.take();
        let wigos_station_identifier = wsi.map(|w| w.to_string()).unwrap_or_default();
        debug!("Row {} failed with {} error(s)", index, errors.len());

        RowResult {
            row: index,
            status: RowStatus::Failed,
            bytes: None,
            identifier: String::new(),
            checksum: None,
            geometry: Geometry::default(),
            properties: RowProperties {
                wigos_station_identifier,
                ..RowProperties::default()
            },
            warnings,
            errors,
        }
    }
}

/// Fields of the record holding non-ASCII text, joined for reporting
fn non_ascii_content(record: &StringRecord) -> Option<String> {
    let offending: Vec<&str> = record.iter().filter(|field| !field.is_ascii()).collect();
    if offending.is_empty() {
        None
    } else {
        Some(offending.join(", "))
    }
}
