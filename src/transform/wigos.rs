//! WIGOS station identifiers.

use crate::constants::wigos_columns;
use crate::error::Csv2BufrError;
use crate::models::{Row, Value};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static WSI_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)-(\d+)-(\d+)-([^-\s]+)$").expect("WIGOS identifier pattern is valid")
});

/// Longest local identifier the message can carry
pub const MAX_LOCAL_LENGTH: usize = 16;

/// `series-issuer-issueNumber-local`, e.g. `0-20000-0-06700`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WigosIdentifier {
    pub series: i64,
    pub issuer: i64,
    pub issue_number: i64,
    pub local: String,
}

impl WigosIdentifier {
    /// Assemble from the four resolved component values
    pub fn from_components(values: [&Value; 4]) -> Result<Self, Csv2BufrError> {
        let joined = values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join("-");
        joined.parse()
    }

    /// Add the component columns used by templates that map the four
    /// identifier elements individually
    pub fn insert_columns(&self, row: &mut Row) {
        row.insert(wigos_columns::SERIES.to_string(), Value::Int(self.series));
        row.insert(wigos_columns::ISSUER.to_string(), Value::Int(self.issuer));
        row.insert(
            wigos_columns::ISSUE_NUMBER.to_string(),
            Value::Int(self.issue_number),
        );
        row.insert(
            wigos_columns::LOCAL.to_string(),
            Value::Text(self.local.clone()),
        );
    }
}

impl FromStr for WigosIdentifier {
    type Err = Csv2BufrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Csv2BufrError::InvalidStationIdentifier {
            identifier: s.to_string(),
        };

        let captures = WSI_PATTERN.captures(s.trim()).ok_or_else(invalid)?;
        let number = |i: usize| -> Result<i64, Csv2BufrError> {
            captures[i].parse::<i64>().map_err(|_| invalid())
        };

        let local = captures[4].to_string();
        if local.len() > MAX_LOCAL_LENGTH || !local.is_ascii() {
            return Err(invalid());
        }

        Ok(Self {
            series: number(1)?,
            issuer: number(2)?,
            issue_number: number(3)?,
            local,
        })
    }
}

impl fmt::Display for WigosIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.series, self.issuer, self.issue_number, self.local
        )
    }
}
