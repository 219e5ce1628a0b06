//! Template skeletons generated from a descriptor sequence.

use super::{FieldSpec, Template};
use crate::codec::{Codec, MessageParams};
use crate::constants::{
    DEFAULT_WSI_COLUMN, EXTENDED_REPLICATION_KEY, MASTER_TABLE_VERSION_KEY,
    NORMAL_REPLICATION_KEY, SHORT_REPLICATION_KEY, UNEXPANDED_DESCRIPTORS_KEY,
};
use crate::error::Result;
use crate::expression::Expr;
use crate::models::Value;
use tracing::info;

/// Build a template listing every key of the descriptor sequence.
///
/// Header keys are mapped to the codec's default as a constant, written
/// `const:None` when the codec has no default so the template still loads
/// and the key is easy to spot for editing. Data keys are
/// mapped to a column named after the element, suffixed with the
/// occurrence number for repeated elements.
pub fn create_template(codec: &dyn Codec, descriptors: &[i64], table_version: i64) -> Result<Template> {
    let params = MessageParams {
        descriptors: descriptors.to_vec(),
        table_version,
        ..MessageParams::default()
    };
    let message = codec.new_empty_message(&params)?;

    let mut header = Vec::new();
    let mut data = Vec::new();
    for info in message.enumerate_keys() {
        let key = info.key;
        if info.is_header {
            if [SHORT_REPLICATION_KEY, NORMAL_REPLICATION_KEY, EXTENDED_REPLICATION_KEY]
                .contains(&key.as_str())
            {
                continue;
            }
            let value = match key.as_str() {
                UNEXPANDED_DESCRIPTORS_KEY => Expr::Array(descriptors.iter().map(|d| Value::Int(*d)).collect()),
                MASTER_TABLE_VERSION_KEY => Expr::Const(Value::Int(table_version)),
                _ => Expr::Const(message.get_value(&key)?),
            };
            header.push(FieldSpec::new(key, value));
        } else {
            let column = column_name(&key);
            data.push(FieldSpec::new(key, Expr::Data(column)));
        }
    }

    info!(
        "Created template skeleton with {} header and {} data keys",
        header.len(),
        data.len()
    );

    Ok(Template {
        short_replication: Vec::new(),
        normal_replication: Vec::new(),
        extended_replication: Vec::new(),
        wigos_station_identifier: Some(Expr::Data(DEFAULT_WSI_COLUMN.to_string())),
        number_header_rows: 1,
        column_names_row: 1,
        delimiter: None,
        quoting: None,
        quotechar: None,
        header,
        data,
    })
}

/// `#1#airTemperature` -> `airTemperature`, `#2#airTemperature` -> `airTemperature_2`
fn column_name(key: &str) -> String {
    let mut parts = key.trim_start_matches('#').splitn(2, '#');
    match (parts.next(), parts.next()) {
        (Some("1"), Some(name)) => name.to_string(),
        (Some(occurrence), Some(name)) => format!("{}_{}", name, occurrence),
        _ => key.to_string(),
    }
}
