//! Typed value expressions embedded in templates.
//!
//! Every template value is a `kind:payload` string. Expressions are parsed
//! once when a template is compiled and resolved against each data row:
//!
//! - `const:<literal>` - integer, float (if the literal contains `.`) or text
//! - `data:<column>` - a column of the current CSV row
//! - `array:<n, n, ...>` - a fixed list of numbers
//! - `metadata:<key>` - a key of the station metadata supplied by the caller

use crate::error::ExpressionError;
use crate::models::{Row, Value};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Const(Value),
    Data(String),
    Array(Vec<Value>),
    Metadata(String),
}

impl Expr {
    /// Parse an expression string
    pub fn parse(expression: &str) -> Result<Self, ExpressionError> {
        let invalid = |reason: &str| ExpressionError::InvalidExpression {
            expression: expression.to_string(),
            reason: reason.to_string(),
        };

        let (kind, payload) = expression
            .split_once(':')
            .ok_or_else(|| invalid("expected 'kind:payload'"))?;
        let payload = payload.trim();
        if payload.is_empty() {
            return Err(invalid("empty payload"));
        }

        match kind.trim() {
            "const" => parse_literal(payload)
                .map(Expr::Const)
                .ok_or_else(|| invalid(&format!("'{}' is not a valid number", payload))),
            "data" => Ok(Expr::Data(payload.to_string())),
            "metadata" => Ok(Expr::Metadata(payload.to_string())),
            "array" => {
                let tokens: Vec<&str> = payload.split(',').map(str::trim).collect();
                let as_float = tokens.iter().any(|t| t.contains('.'));
                let values = tokens
                    .iter()
                    .map(|token| {
                        let parsed = if as_float {
                            token.parse::<f64>().ok().map(Value::Float)
                        } else {
                            token.parse::<i64>().ok().map(Value::Int)
                        };
                        parsed.ok_or_else(|| invalid(&format!("'{}' is not a number", token)))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Expr::Array(values))
            }
            other => Err(invalid(&format!("unknown kind '{}'", other))),
        }
    }

    /// Resolve against a data row and station metadata.
    ///
    /// Resolution never mutates its inputs. Absent columns and metadata keys
    /// are reported as typed errors so the caller can apply its policy.
    pub fn resolve(&self, row: &Row, metadata: &Row) -> Result<Value, ExpressionError> {
        match self {
            Expr::Const(value) => Ok(value.clone()),
            Expr::Array(values) => Ok(Value::List(values.clone())),
            Expr::Data(column) => {
                row.get(column)
                    .cloned()
                    .ok_or_else(|| ExpressionError::MissingColumn {
                        column: column.clone(),
                    })
            }
            Expr::Metadata(key) => {
                metadata
                    .get(key)
                    .cloned()
                    .ok_or_else(|| ExpressionError::MissingMetadata { key: key.clone() })
            }
        }
    }

    /// Whether resolution depends on the current data row
    pub fn is_row_dependent(&self) -> bool {
        matches!(self, Expr::Data(_))
    }
}

/// Numbers for numeric-looking literals, missing for `None`, text for
/// anything else.
///
/// `None` when the literal is shaped like a number but does not parse
/// (`1.2.3`, `4.5e`). Identifiers such as `0-20000-0-06700` stay text.
fn parse_literal(literal: &str) -> Option<Value> {
    if literal == "None" {
        return Some(Value::Null);
    }
    if !looks_numeric(literal) {
        return Some(Value::Text(literal.to_string()));
    }
    if !literal.contains(['.', 'e', 'E']) {
        if let Ok(i) = literal.parse::<i64>() {
            return Some(Value::Int(i));
        }
    }
    literal
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(Value::Float)
}

/// Optional sign, then digits and dots, then an optional exponent
fn looks_numeric(literal: &str) -> bool {
    let unsigned = literal.strip_prefix(['+', '-']).unwrap_or(literal);
    let (mantissa, exponent) = match unsigned.split_once(['e', 'E']) {
        Some((mantissa, exponent)) => (mantissa, Some(exponent)),
        None => (unsigned, None),
    };
    let exponent_ok = exponent.is_none_or(|e| {
        let digits = e.strip_prefix(['+', '-']).unwrap_or(e);
        digits.chars().all(|c| c.is_ascii_digit())
    });

    mantissa.chars().any(|c| c.is_ascii_digit())
        && mantissa.chars().all(|c| c.is_ascii_digit() || c == '.')
        && exponent_ok
}

impl FromStr for Expr {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Expr::parse(s)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(value) => write!(f, "const:{}", value),
            Expr::Data(column) => write!(f, "data:{}", column),
            Expr::Metadata(key) => write!(f, "metadata:{}", key),
            Expr::Array(values) => {
                let joined: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "array:{}", joined.join(", "))
            }
        }
    }
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Expr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Expr::parse(&raw).map_err(serde::de::Error::custom)
    }
}
