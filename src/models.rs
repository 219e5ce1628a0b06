//! Core data structures shared across the encoder.
//!
//! Defines the closed value type that flows from CSV cells through the
//! resolver, validator and message registry, the native types and element
//! attributes reported by a codec, and the per-row result handed to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A single cell, constant, or array value.
///
/// `Null` stands in for "missing" everywhere: unset registry entries,
/// sentinel cells such as `NA`, and nullified out-of-range values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    /// Numeric view of the value, `None` for text, lists and nulls.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Interpret a raw CSV cell.
    ///
    /// Integers are only inferred for canonical digit strings so that
    /// identifiers with leading zeros (`"00147"`) survive as text. Words
    /// that Rust would happily parse as floats (`NaN`, `inf`) stay text
    /// so the missing-value sentinels can catch them.
    pub fn from_csv_field(field: &str) -> Value {
        let trimmed = field.trim();
        if trimmed.is_empty() {
            return Value::Text(String::new());
        }

        if let Ok(i) = trimmed.parse::<i64>() {
            if i.to_string() == trimmed.trim_start_matches('+') {
                return Value::Int(i);
            }
            return Value::Text(trimmed.to_string());
        }

        let looks_numeric = trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'));
        if looks_numeric {
            if let Ok(f) = trimmed.parse::<f64>() {
                return Value::Float(f);
            }
        }

        Value::Text(trimmed.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "None"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{:?}", v),
            Value::Text(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

/// One CSV data line keyed by column name, plus any derived columns.
pub type Row = HashMap<String, Value>;

/// Native storage type of a message key, fixed at registry construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NativeType {
    Int,
    Float,
    String,
    Array,
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NativeType::Int => "int",
            NativeType::Float => "float",
            NativeType::String => "str",
            NativeType::Array => "array",
        };
        write!(f, "{}", name)
    }
}

/// Code-table attributes of a data (non-header) element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementAttributes {
    pub code: i64,
    pub units: String,
    pub scale: i32,
    pub reference: i64,
    pub width: u32,
}

impl ElementAttributes {
    /// Look up an attribute by the name used in `key->attribute` addressing.
    pub fn get(&self, attribute: &str) -> Option<Value> {
        match attribute {
            "code" => Some(Value::Int(self.code)),
            "units" => Some(Value::Text(self.units.clone())),
            "scale" => Some(Value::Int(self.scale as i64)),
            "reference" => Some(Value::Int(self.reference)),
            "width" => Some(Value::Int(self.width as i64)),
            _ => None,
        }
    }
}

/// Outcome of converting one CSV data row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    Passed,
    Failed,
}

/// Station position taken from the encoded latitude/longitude elements.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Geometry {
    pub lon: Option<f64>,
    pub lat: Option<f64>,
}

/// Discovery metadata attached to each row result.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RowProperties {
    pub identifier: String,
    pub wigos_station_identifier: String,
    pub datetime: Option<DateTime<Utc>>,
    pub checksum: Option<String>,
    pub originating_centre: Option<i64>,
    pub data_category: Option<i64>,
}

/// Result record emitted once per CSV data row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowResult {
    /// Zero-based index of the data row within the batch
    pub row: usize,
    pub status: RowStatus,
    #[serde(skip)]
    pub bytes: Option<Vec<u8>>,
    pub identifier: String,
    pub checksum: Option<String>,
    pub geometry: Geometry,
    pub properties: RowProperties,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl RowResult {
    pub fn is_passed(&self) -> bool {
        self.status == RowStatus::Passed
    }

    /// Render as a GeoJSON-style feature for sidecar output.
    pub fn to_feature(&self) -> serde_json::Value {
        let geometry = match (self.geometry.lon, self.geometry.lat) {
            (Some(lon), Some(lat)) => serde_json::json!({
                "type": "Point",
                "coordinates": [lon, lat],
            }),
            _ => serde_json::Value::Null,
        };

        serde_json::json!({
            "type": "Feature",
            "id": self.identifier,
            "geometry": geometry,
            "properties": self.properties,
            "result": {
                "status": self.status,
                "warnings": self.warnings,
                "errors": self.errors,
            },
        })
    }
}
