//! In-process BUFR edition 4 codec.
//!
//! Lays out a single-subset, uncompressed message from the built-in
//! catalogue in [`super::tables`] and packs Sections 0 to 5. Numeric
//! elements are encoded as `round(value * 10^scale) - reference` in
//! `width` bits with all bits set meaning "missing"; CCITT IA5 elements
//! are space padded.

use super::bits::{BitWriter, all_ones};
use super::tables::{ElementDescriptor, find_element, find_sequence, fxy};
use super::{Codec, CodecMessage, KeyInfo, MessageParams};
use crate::constants::{
    EXTENDED_REPLICATION_KEY, MASTER_TABLE_VERSION_KEY, NORMAL_REPLICATION_KEY,
    SHORT_REPLICATION_KEY, UNEXPANDED_DESCRIPTORS_KEY,
};
use crate::error::CodecError;
use crate::models::{NativeType, Value};
use std::collections::HashMap;
use tracing::debug;

const SECTION1_LENGTH: usize = 22;

/// Codec backed by the built-in element catalogue
#[derive(Debug, Clone, Copy, Default)]
pub struct Bufr4Codec;

impl Bufr4Codec {
    pub fn new() -> Self {
        Self
    }
}

impl Codec for Bufr4Codec {
    fn new_empty_message(
        &self,
        params: &MessageParams,
    ) -> Result<Box<dyn CodecMessage>, CodecError> {
        Ok(Box::new(Bufr4Message::new(params)?))
    }
}

#[derive(Debug, Clone)]
struct HeaderSlot {
    name: &'static str,
    native_type: NativeType,
    value: Value,
}

#[derive(Debug, Clone)]
struct DataSlot {
    key: String,
    descriptor: &'static ElementDescriptor,
    value: Value,
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Header(usize),
    Data(usize),
}

/// Working message handle produced by [`Bufr4Codec`]
#[derive(Debug)]
pub struct Bufr4Message {
    descriptors: Vec<i64>,
    header: Vec<HeaderSlot>,
    data: Vec<DataSlot>,
    index: HashMap<String, Slot>,
    packed: Option<Vec<u8>>,
}

impl Bufr4Message {
    pub fn new(params: &MessageParams) -> Result<Self, CodecError> {
        if params.descriptors.is_empty() {
            return Err(CodecError::Init {
                reason: "empty descriptor sequence".to_string(),
            });
        }
        if !(0..=255).contains(&params.table_version) {
            return Err(CodecError::Init {
                reason: format!("table version {} out of range", params.table_version),
            });
        }

        let elements = expand(&params.descriptors)?;

        let ints = |values: &[i64]| Value::List(values.iter().map(|v| Value::Int(*v)).collect());
        let header = vec![
            header_slot("edition", Value::Int(4)),
            header_slot("masterTableNumber", Value::Int(0)),
            header_slot("bufrHeaderCentre", Value::Int(0)),
            header_slot("bufrHeaderSubCentre", Value::Int(0)),
            header_slot("updateSequenceNumber", Value::Int(0)),
            header_slot("dataCategory", Value::Int(0)),
            header_slot("internationalDataSubCategory", Value::Int(255)),
            header_slot("dataSubCategory", Value::Int(255)),
            header_slot(MASTER_TABLE_VERSION_KEY, Value::Int(params.table_version)),
            header_slot("localTablesVersionNumber", Value::Int(0)),
            header_slot("typicalYear", Value::Null),
            header_slot("typicalMonth", Value::Null),
            header_slot("typicalDay", Value::Null),
            header_slot("typicalHour", Value::Null),
            header_slot("typicalMinute", Value::Null),
            header_slot("typicalSecond", Value::Int(0)),
            header_slot("numberOfSubsets", Value::Int(1)),
            header_slot("observedData", Value::Int(1)),
            header_slot("compressedData", Value::Int(0)),
            array_slot(SHORT_REPLICATION_KEY, ints(&params.short_replication)),
            array_slot(NORMAL_REPLICATION_KEY, ints(&params.normal_replication)),
            array_slot(EXTENDED_REPLICATION_KEY, ints(&params.extended_replication)),
            array_slot(UNEXPANDED_DESCRIPTORS_KEY, ints(&params.descriptors)),
        ];

        let mut occurrences: HashMap<&str, usize> = HashMap::new();
        let data: Vec<DataSlot> = elements
            .into_iter()
            .map(|descriptor| {
                let count = occurrences.entry(descriptor.name).or_insert(0);
                *count += 1;
                DataSlot {
                    key: format!("#{}#{}", count, descriptor.name),
                    descriptor,
                    value: Value::Null,
                }
            })
            .collect();

        let mut index = HashMap::new();
        for (i, slot) in header.iter().enumerate() {
            index.insert(slot.name.to_string(), Slot::Header(i));
        }
        for (i, slot) in data.iter().enumerate() {
            index.insert(slot.key.clone(), Slot::Data(i));
        }

        debug!(
            "Created message with {} header keys and {} data elements",
            header.len(),
            data.len()
        );

        Ok(Self {
            descriptors: params.descriptors.clone(),
            header,
            data,
            index,
            packed: None,
        })
    }

    fn slot(&self, key: &str) -> Result<Slot, CodecError> {
        self.index
            .get(key)
            .copied()
            .ok_or_else(|| CodecError::UnknownKey {
                key: key.to_string(),
            })
    }

    fn header_int(&self, name: &str) -> Result<i64, CodecError> {
        let slot = self
            .header
            .iter()
            .find(|slot| slot.name == name)
            .ok_or_else(|| CodecError::UnknownKey {
                key: name.to_string(),
            })?;
        slot.value.as_i64().ok_or_else(|| CodecError::Pack {
            reason: format!("{} not set", name),
        })
    }

    fn encode_section1(&self) -> Result<Vec<u8>, CodecError> {
        let mut section = Vec::with_capacity(SECTION1_LENGTH);
        put_uint(&mut section, SECTION1_LENGTH as i64, 3, "section1Length")?;
        let originator: [(&str, usize); 4] = [
            ("masterTableNumber", 1),
            ("bufrHeaderCentre", 2),
            ("bufrHeaderSubCentre", 2),
            ("updateSequenceNumber", 1),
        ];
        let description: [(&str, usize); 11] = [
            ("dataCategory", 1),
            ("internationalDataSubCategory", 1),
            ("dataSubCategory", 1),
            (MASTER_TABLE_VERSION_KEY, 1),
            ("localTablesVersionNumber", 1),
            ("typicalYear", 2),
            ("typicalMonth", 1),
            ("typicalDay", 1),
            ("typicalHour", 1),
            ("typicalMinute", 1),
            ("typicalSecond", 1),
        ];
        for (name, octets) in originator {
            put_uint(&mut section, self.header_int(name)?, octets, name)?;
        }
        // Section 2 is never present
        section.push(0);
        for (name, octets) in description {
            put_uint(&mut section, self.header_int(name)?, octets, name)?;
        }
        Ok(section)
    }

    fn encode_section3(&self) -> Result<Vec<u8>, CodecError> {
        let subsets = self.header_int("numberOfSubsets")?;
        if subsets != 1 {
            return Err(CodecError::Pack {
                reason: format!("{} subsets requested, only 1 supported", subsets),
            });
        }
        if self.header_int("compressedData")? != 0 {
            return Err(CodecError::Pack {
                reason: "compressed data is not supported".to_string(),
            });
        }

        let mut flags = 0u8;
        if self.header_int("observedData")? != 0 {
            flags |= 0x80;
        }

        let length = 7 + 2 * self.descriptors.len();
        let mut section = Vec::with_capacity(length);
        put_uint(&mut section, length as i64, 3, "section3Length")?;
        section.push(0);
        put_uint(&mut section, subsets, 2, "numberOfSubsets")?;
        section.push(flags);
        for code in &self.descriptors {
            let (f, x, y) = fxy(*code);
            let packed = ((f as u16) << 14) | ((x as u16) << 8) | (y as u16);
            section.extend_from_slice(&packed.to_be_bytes());
        }
        Ok(section)
    }

    fn encode_section4(&self) -> Result<Vec<u8>, CodecError> {
        let mut writer = BitWriter::new();
        for slot in &self.data {
            encode_element(&mut writer, slot)?;
        }
        let payload = writer.into_bytes();

        let length = 4 + payload.len();
        let mut section = Vec::with_capacity(length);
        put_uint(&mut section, length as i64, 3, "section4Length")?;
        section.push(0);
        section.extend_from_slice(&payload);
        Ok(section)
    }
}

impl CodecMessage for Bufr4Message {
    fn enumerate_keys(&self) -> Vec<KeyInfo> {
        let header = self.header.iter().map(|slot| KeyInfo {
            key: slot.name.to_string(),
            native_type: slot.native_type,
            is_header: true,
        });
        let data = self.data.iter().map(|slot| KeyInfo {
            key: slot.key.clone(),
            native_type: slot.descriptor.native_type(),
            is_header: false,
        });
        header.chain(data).collect()
    }

    fn get_attribute(&self, key: &str, attribute: &str) -> Result<Value, CodecError> {
        let not_available = || CodecError::Attribute {
            key: key.to_string(),
            attribute: attribute.to_string(),
        };
        match self.slot(key)? {
            Slot::Header(_) => Err(not_available()),
            Slot::Data(i) => self.data[i]
                .descriptor
                .attributes()
                .get(attribute)
                .ok_or_else(not_available),
        }
    }

    fn get_value(&self, key: &str) -> Result<Value, CodecError> {
        Ok(match self.slot(key)? {
            Slot::Header(i) => self.header[i].value.clone(),
            Slot::Data(i) => self.data[i].value.clone(),
        })
    }

    fn set_scalar(&mut self, key: &str, value: &Value) -> Result<(), CodecError> {
        let rejected = |reason: &str| CodecError::Set {
            key: key.to_string(),
            reason: reason.to_string(),
        };

        match self.slot(key)? {
            Slot::Header(i) => {
                let slot = &mut self.header[i];
                if slot.native_type == NativeType::Array {
                    return Err(rejected("array expected"));
                }
                slot.value = match value {
                    Value::Null | Value::Int(_) => value.clone(),
                    Value::Float(f) if f.fract() == 0.0 && f.is_finite() => Value::Int(*f as i64),
                    _ => return Err(rejected(&format!("integer expected, got {}", value))),
                };
            }
            Slot::Data(i) => {
                let slot = &mut self.data[i];
                slot.value = match (slot.descriptor.is_text(), value) {
                    (_, Value::Null) => Value::Null,
                    (true, Value::Text(_)) => value.clone(),
                    (true, Value::Int(_) | Value::Float(_)) => Value::Text(value.to_string()),
                    (false, Value::Int(_) | Value::Float(_)) => value.clone(),
                    _ => return Err(rejected(&format!("cannot store {}", value))),
                };
            }
        }
        self.packed = None;
        Ok(())
    }

    fn set_array(&mut self, key: &str, values: &[Value]) -> Result<(), CodecError> {
        let rejected = |reason: String| CodecError::Set {
            key: key.to_string(),
            reason,
        };

        let Slot::Header(i) = self.slot(key)? else {
            return Err(rejected("replicated element arrays are not supported".to_string()));
        };
        if self.header[i].native_type != NativeType::Array {
            return Err(rejected("scalar expected".to_string()));
        }

        let ints = values
            .iter()
            .map(|v| match v {
                Value::Int(i) => Ok(*i),
                Value::Float(f) if f.fract() == 0.0 && f.is_finite() => Ok(*f as i64),
                other => Err(rejected(format!("integer expected, got {}", other))),
            })
            .collect::<Result<Vec<i64>, _>>()?;

        if key == UNEXPANDED_DESCRIPTORS_KEY && ints != self.descriptors {
            return Err(rejected(
                "descriptor sequence differs from the message layout".to_string(),
            ));
        }

        self.header[i].value = Value::List(ints.into_iter().map(Value::Int).collect());
        self.packed = None;
        Ok(())
    }

    fn pack(&mut self) -> Result<(), CodecError> {
        let edition = self.header_int("edition")?;
        if edition != 4 {
            return Err(CodecError::Pack {
                reason: format!("edition {} not supported", edition),
            });
        }

        let section1 = self.encode_section1()?;
        let section3 = self.encode_section3()?;
        let section4 = self.encode_section4()?;

        let total = 8 + section1.len() + section3.len() + section4.len() + 4;
        let mut message = Vec::with_capacity(total);
        message.extend_from_slice(b"BUFR");
        put_uint(&mut message, total as i64, 3, "totalLength")?;
        message.push(edition as u8);
        message.extend_from_slice(&section1);
        message.extend_from_slice(&section3);
        message.extend_from_slice(&section4);
        message.extend_from_slice(b"7777");

        debug!("Packed message of {} bytes", message.len());
        self.packed = Some(message);
        Ok(())
    }

    fn write_bytes(&self) -> Result<Vec<u8>, CodecError> {
        self.packed.clone().ok_or_else(|| CodecError::Write {
            reason: "message has not been packed".to_string(),
        })
    }
}

fn header_slot(name: &'static str, value: Value) -> HeaderSlot {
    HeaderSlot {
        name,
        native_type: NativeType::Int,
        value,
    }
}

fn array_slot(name: &'static str, value: Value) -> HeaderSlot {
    HeaderSlot {
        name,
        native_type: NativeType::Array,
        value,
    }
}

fn expand(descriptors: &[i64]) -> Result<Vec<&'static ElementDescriptor>, CodecError> {
    let unknown = |code: i64| CodecError::Init {
        reason: format!("descriptor {:06} not in element catalogue", code),
    };

    let mut elements = Vec::new();
    for code in descriptors {
        match fxy(*code).0 {
            0 => elements.push(find_element(*code).ok_or_else(|| unknown(*code))?),
            3 => {
                let members = find_sequence(*code).ok_or_else(|| unknown(*code))?;
                for member in members {
                    elements.push(find_element(*member).ok_or_else(|| unknown(*member))?);
                }
            }
            f => {
                return Err(CodecError::Init {
                    reason: format!("descriptor {:06} (F={}) not supported", code, f),
                });
            }
        }
    }
    Ok(elements)
}

fn put_uint(buffer: &mut Vec<u8>, value: i64, octets: usize, name: &str) -> Result<(), CodecError> {
    let max = all_ones(8 * octets as u32);
    if value < 0 || value as u64 > max {
        return Err(CodecError::Pack {
            reason: format!("{} ({}) does not fit in {} octet(s)", name, value, octets),
        });
    }
    let bytes = (value as u64).to_be_bytes();
    buffer.extend_from_slice(&bytes[8 - octets..]);
    Ok(())
}

fn encode_element(writer: &mut BitWriter, slot: &DataSlot) -> Result<(), CodecError> {
    let descriptor = slot.descriptor;
    let out_of_range = |reason: String| CodecError::Pack {
        reason: format!("{}: {}", slot.key, reason),
    };

    if descriptor.is_text() {
        let octets = (descriptor.width / 8) as usize;
        match &slot.value {
            Value::Null => writer.write_bytes(&vec![0xFF; octets]),
            Value::Text(text) => {
                if !text.is_ascii() || text.len() > octets {
                    return Err(out_of_range(format!(
                        "'{}' does not fit in {} characters",
                        text, octets
                    )));
                }
                let mut padded = text.as_bytes().to_vec();
                padded.resize(octets, b' ');
                writer.write_bytes(&padded);
            }
            other => return Err(out_of_range(format!("text expected, got {}", other))),
        }
        return Ok(());
    }

    let missing = all_ones(descriptor.width);
    let Some(value) = slot.value.as_f64() else {
        if slot.value.is_null() {
            writer.write(missing, descriptor.width);
            return Ok(());
        }
        return Err(out_of_range(format!("number expected, got {}", slot.value)));
    };

    let scaled = (value * 10f64.powi(descriptor.scale)).round();
    if !scaled.is_finite() {
        return Err(out_of_range(format!("{} is not finite", value)));
    }
    // Range-checked in f64 so extreme inputs cannot overflow the integer maths
    let encoded = scaled - descriptor.reference as f64;
    if encoded < 0.0 || encoded >= missing as f64 {
        return Err(out_of_range(format!(
            "value {} outside the {}-bit range of the element",
            slot.value, descriptor.width
        )));
    }
    writer.write(encoded as u64, descriptor.width);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> MessageParams {
        MessageParams {
            descriptors: vec![301150, 301011, 301012, 301021, 12101],
            table_version: 37,
            ..MessageParams::default()
        }
    }

    fn dated_message() -> Box<dyn CodecMessage> {
        let mut message = Bufr4Codec::new().new_empty_message(&params()).unwrap();
        for (key, value) in [
            ("typicalYear", 2021),
            ("typicalMonth", 11),
            ("typicalDay", 18),
            ("typicalHour", 18),
            ("typicalMinute", 0),
        ] {
            message.set_scalar(key, &Value::Int(value)).unwrap();
        }
        message
    }

    #[test]
    fn test_enumerates_header_then_data_keys() {
        let message = Bufr4Codec::new().new_empty_message(&params()).unwrap();
        let keys = message.enumerate_keys();

        let first_data = keys.iter().position(|k| !k.is_header).unwrap();
        assert!(keys[..first_data].iter().all(|k| k.is_header));
        assert!(keys[first_data..].iter().all(|k| !k.is_header));

        let lookup = |name: &str| keys.iter().find(|k| k.key == name).unwrap().native_type;
        assert_eq!(lookup("edition"), NativeType::Int);
        assert_eq!(lookup(UNEXPANDED_DESCRIPTORS_KEY), NativeType::Array);
        assert_eq!(lookup("#1#latitude"), NativeType::Float);
        assert_eq!(lookup("#1#year"), NativeType::Int);
        assert_eq!(lookup("#1#wigosLocalIdentifierCharacter"), NativeType::String);
    }

    #[test]
    fn test_repeated_elements_get_occurrence_numbers() {
        let params = MessageParams {
            descriptors: vec![12101, 12101],
            table_version: 37,
            ..MessageParams::default()
        };
        let message = Bufr4Codec::new().new_empty_message(&params).unwrap();
        let keys: Vec<String> = message
            .enumerate_keys()
            .into_iter()
            .filter(|k| !k.is_header)
            .map(|k| k.key)
            .collect();
        assert_eq!(keys, vec!["#1#airTemperature", "#2#airTemperature"]);
    }

    #[test]
    fn test_unknown_descriptor_fails_init() {
        let params = MessageParams {
            descriptors: vec![99999],
            table_version: 37,
            ..MessageParams::default()
        };
        assert!(matches!(
            Bufr4Codec::new().new_empty_message(&params),
            Err(CodecError::Init { .. })
        ));

        let replication = MessageParams {
            descriptors: vec![101000],
            table_version: 37,
            ..MessageParams::default()
        };
        assert!(Bufr4Codec::new().new_empty_message(&replication).is_err());
    }

    #[test]
    fn test_attributes() {
        let message = Bufr4Codec::new().new_empty_message(&params()).unwrap();
        assert_eq!(
            message.get_attribute("#1#airTemperature", "units").unwrap(),
            Value::Text("K".into())
        );
        assert_eq!(
            message.get_attribute("#1#latitude", "reference").unwrap(),
            Value::Int(-9_000_000)
        );
        assert!(matches!(
            message.get_attribute("edition", "units"),
            Err(CodecError::Attribute { .. })
        ));
        assert!(matches!(
            message.get_attribute("#9#airTemperature", "units"),
            Err(CodecError::UnknownKey { .. })
        ));
    }

    #[test]
    fn test_header_defaults_readable() {
        let message = Bufr4Codec::new().new_empty_message(&params()).unwrap();
        assert_eq!(message.get_value("edition").unwrap(), Value::Int(4));
        assert_eq!(
            message.get_value(MASTER_TABLE_VERSION_KEY).unwrap(),
            Value::Int(37)
        );
        assert_eq!(message.get_value("typicalYear").unwrap(), Value::Null);
        assert_eq!(message.get_value("#1#airTemperature").unwrap(), Value::Null);
    }

    #[test]
    fn test_pack_produces_framed_message() {
        let mut message = dated_message();
        message
            .set_scalar("#1#airTemperature", &Value::Float(290.31))
            .unwrap();
        message
            .set_scalar("#1#wigosLocalIdentifierCharacter", &Value::Text("ABCD".into()))
            .unwrap();
        message.pack().unwrap();
        let bytes = message.write_bytes().unwrap();

        assert_eq!(&bytes[..4], b"BUFR");
        assert_eq!(&bytes[bytes.len() - 4..], b"7777");
        let declared = ((bytes[4] as usize) << 16) | ((bytes[5] as usize) << 8) | bytes[6] as usize;
        assert_eq!(declared, bytes.len());
        assert_eq!(bytes[7], 4);
        // typicalYear in octets 16-17 of section 1
        assert_eq!(u16::from_be_bytes([bytes[8 + 15], bytes[8 + 16]]), 2021);
    }

    #[test]
    fn test_pack_is_deterministic() {
        let mut first = dated_message();
        let mut second = dated_message();
        first.pack().unwrap();
        second.pack().unwrap();
        assert_eq!(first.write_bytes().unwrap(), second.write_bytes().unwrap());
    }

    #[test]
    fn test_pack_requires_typical_date() {
        let mut message = Bufr4Codec::new().new_empty_message(&params()).unwrap();
        assert!(matches!(message.pack(), Err(CodecError::Pack { .. })));
        assert!(matches!(message.write_bytes(), Err(CodecError::Write { .. })));
    }

    #[test]
    fn test_value_too_large_for_element_fails_pack() {
        let mut message = dated_message();
        message
            .set_scalar("#1#airTemperature", &Value::Float(1000.0))
            .unwrap();
        assert!(matches!(message.pack(), Err(CodecError::Pack { .. })));
    }

    #[test]
    fn test_extreme_values_fail_pack_without_overflow() {
        for value in [1e15, -1e15, 1e300, f64::MAX] {
            let mut message = dated_message();
            message
                .set_scalar("#1#latitude", &Value::Float(value))
                .unwrap();
            assert!(
                matches!(message.pack(), Err(CodecError::Pack { .. })),
                "latitude {} should not pack",
                value
            );
        }
    }

    #[test]
    fn test_set_rejects_mismatched_values() {
        let mut message = dated_message();
        assert!(matches!(
            message.set_scalar("#1#airTemperature", &Value::Text("warm".into())),
            Err(CodecError::Set { .. })
        ));
        assert!(matches!(
            message.set_scalar(UNEXPANDED_DESCRIPTORS_KEY, &Value::Int(1)),
            Err(CodecError::Set { .. })
        ));
        assert!(matches!(
            message.set_array(UNEXPANDED_DESCRIPTORS_KEY, &[Value::Int(12101)]),
            Err(CodecError::Set { .. })
        ));
        assert!(matches!(
            message.set_scalar("notAKey", &Value::Int(1)),
            Err(CodecError::UnknownKey { .. })
        ));
    }
}
