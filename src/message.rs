//! Field registry holding the per-row state of one BUFR message.
//!
//! The registry is built once per batch. Construction asks the codec for an
//! empty message, enumerates every addressable key and records its native
//! type and, for data keys, the element attributes. Per-row work only
//! touches the stored values: [`BufrMessage::reset`] clears them,
//! [`BufrMessage::set`] coerces and stores them, and
//! [`BufrMessage::serialize`] hands them to the codec.

use crate::codec::{Codec, CodecMessage, MessageParams};
use crate::config::ValidationPolicy;
use crate::constants::{
    EXTENDED_REPLICATION_KEY, NORMAL_REPLICATION_KEY, SHORT_REPLICATION_KEY,
    UNEXPANDED_DESCRIPTORS_KEY,
};
use crate::diagnostics::Diagnostics;
use crate::error::{CodecError, Csv2BufrError, Result, ValidationError};
use crate::models::{ElementAttributes, NativeType, Value};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

const ATTRIBUTE_SEPARATOR: &str = "->";

/// Array keys are applied before anything else so the codec can lay out
/// replicated groups before their members are set.
const LAYOUT_KEYS: [&str; 4] = [
    SHORT_REPLICATION_KEY,
    NORMAL_REPLICATION_KEY,
    EXTENDED_REPLICATION_KEY,
    UNEXPANDED_DESCRIPTORS_KEY,
];

/// One registry entry
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEntry {
    pub key: String,
    pub value: Value,
    pub native_type: NativeType,
    pub is_header: bool,
    pub attributes: Option<ElementAttributes>,
}

pub struct BufrMessage {
    codec: Arc<dyn Codec>,
    params: MessageParams,
    entries: Vec<FieldEntry>,
    index: HashMap<String, usize>,
    /// Bytes of the current values, cleared by any change
    bytes: Option<Vec<u8>>,
    /// Values and bytes of the last successful encode, kept across resets
    last_encoded: Option<(Vec<Value>, Vec<u8>)>,
}

impl std::fmt::Debug for BufrMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufrMessage")
            .field("params", &self.params)
            .field("entries", &self.entries.len())
            .field("packed", &self.bytes.is_some())
            .finish()
    }
}

impl BufrMessage {
    /// Build the registry for a descriptor sequence
    pub fn new(codec: Arc<dyn Codec>, params: MessageParams) -> Result<Self> {
        let sample = codec.new_empty_message(&params)?;

        let mut entries = Vec::new();
        let mut index = HashMap::new();
        for info in sample.enumerate_keys() {
            let attributes = if info.is_header {
                None
            } else {
                Some(read_attributes(sample.as_ref(), &info.key)?)
            };
            index.insert(info.key.clone(), entries.len());
            entries.push(FieldEntry {
                key: info.key,
                value: Value::Null,
                native_type: info.native_type,
                is_header: info.is_header,
                attributes,
            });
        }

        debug!(
            "Registered {} keys for descriptors {:?}",
            entries.len(),
            params.descriptors
        );

        Ok(Self {
            codec,
            params,
            entries,
            index,
            bytes: None,
            last_encoded: None,
        })
    }

    pub fn params(&self) -> &MessageParams {
        &self.params
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(base_key(key))
    }

    pub fn entries(&self) -> &[FieldEntry] {
        &self.entries
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    pub fn native_type(&self, key: &str) -> Option<NativeType> {
        self.entry(key).ok().map(|e| e.native_type)
    }

    pub fn is_header(&self, key: &str) -> Option<bool> {
        self.entry(key).ok().map(|e| e.is_header)
    }

    fn entry(&self, key: &str) -> Result<&FieldEntry> {
        self.index
            .get(key)
            .map(|i| &self.entries[*i])
            .ok_or_else(|| Csv2BufrError::UnknownKey {
                key: key.to_string(),
            })
    }

    /// Clear every value and the cached bytes
    pub fn reset(&mut self) {
        for entry in &mut self.entries {
            entry.value = Value::Null;
        }
        self.bytes = None;
    }

    /// Coerce a value to the key's native type and store it.
    ///
    /// Under [`ValidationPolicy::Lenient`] a value that cannot be coerced is
    /// stored as missing and a warning recorded; otherwise the coercion error
    /// is returned and the stored value is left untouched.
    pub fn set(
        &mut self,
        key: &str,
        value: Value,
        policy: ValidationPolicy,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        let index = *self
            .index
            .get(key)
            .ok_or_else(|| Csv2BufrError::UnknownKey {
                key: key.to_string(),
            })?;
        let native_type = self.entries[index].native_type;

        let value = match coerce(key, value, native_type) {
            Ok(value) => value,
            Err(e) if policy.nullify_on_fail() => {
                diagnostics.warn(format!("{} Element set to missing", e));
                Value::Null
            }
            Err(e) => return Err(e.into()),
        };

        trace!("Setting {} = {}", key, value);
        self.entries[index].value = value;
        self.bytes = None;
        Ok(())
    }

    /// Stored value of a key, or one of its attributes via `key->attribute`
    pub fn get(&self, key: &str) -> Result<Value> {
        match key.split_once(ATTRIBUTE_SEPARATOR) {
            Some((base, attribute)) => {
                let entry = self.entry(base)?;
                entry
                    .attributes
                    .as_ref()
                    .and_then(|attrs| attrs.get(attribute))
                    .ok_or_else(|| {
                        CodecError::Attribute {
                            key: base.to_string(),
                            attribute: attribute.to_string(),
                        }
                        .into()
                    })
            }
            None => Ok(self.entry(key)?.value.clone()),
        }
    }

    /// Pack the stored values.
    ///
    /// With `use_cached`, values identical to the last successful encode
    /// (for example an unchanged row after a [`reset`](Self::reset)) reuse
    /// those bytes instead of packing again. Codec failures are recorded as
    /// errors in `diagnostics` and never propagate; the bytes cached for the
    /// current values are returned instead, `None` after any change.
    pub fn serialize(&mut self, use_cached: bool, diagnostics: &mut Diagnostics) -> Option<Vec<u8>> {
        if use_cached {
            if let Some(bytes) = &self.bytes {
                return Some(bytes.clone());
            }
            if let Some((values, bytes)) = &self.last_encoded {
                if values.iter().eq(self.entries.iter().map(|e| &e.value)) {
                    trace!("Reusing {} cached bytes", bytes.len());
                    self.bytes = Some(bytes.clone());
                    return Some(bytes.clone());
                }
            }
        }

        match self.encode() {
            Ok(bytes) => {
                debug!("Serialized message of {} bytes", bytes.len());
                let values = self.entries.iter().map(|e| e.value.clone()).collect();
                self.last_encoded = Some((values, bytes.clone()));
                self.bytes = Some(bytes.clone());
                Some(bytes)
            }
            Err(e) => {
                diagnostics.error(format!("Error encoding message: {}", e));
                self.bytes.clone()
            }
        }
    }

    fn encode(&self) -> std::result::Result<Vec<u8>, CodecError> {
        let mut handle = self.codec.new_empty_message(&self.params)?;

        let layout = LAYOUT_KEYS
            .iter()
            .filter_map(|key| self.index.get(*key).map(|i| &self.entries[*i]));
        let rest = self
            .entries
            .iter()
            .filter(|e| !LAYOUT_KEYS.contains(&e.key.as_str()));

        for entry in layout.chain(rest) {
            match &entry.value {
                Value::Null => continue,
                Value::List(values) => handle.set_array(&entry.key, values)?,
                value => handle.set_scalar(&entry.key, value)?,
            }
        }

        handle.pack()?;
        handle.write_bytes()
    }

    /// SHA-256 of the last successfully serialized bytes
    pub fn checksum(&self) -> Option<String> {
        self.bytes
            .as_ref()
            .map(|bytes| hex::encode(Sha256::digest(bytes)))
    }
}

fn base_key(key: &str) -> &str {
    key.split_once(ATTRIBUTE_SEPARATOR)
        .map_or(key, |(base, _)| base)
}

fn read_attributes(
    message: &dyn CodecMessage,
    key: &str,
) -> std::result::Result<ElementAttributes, CodecError> {
    let int = |attribute: &str| -> std::result::Result<i64, CodecError> {
        message
            .get_attribute(key, attribute)?
            .as_i64()
            .ok_or_else(|| CodecError::Attribute {
                key: key.to_string(),
                attribute: attribute.to_string(),
            })
    };

    let units = match message.get_attribute(key, "units")? {
        Value::Text(units) => units,
        other => other.to_string(),
    };

    Ok(ElementAttributes {
        code: int("code")?,
        units,
        scale: int("scale")? as i32,
        reference: int("reference")?,
        width: int("width")? as u32,
    })
}

/// Convert a value to a native type.
///
/// Missing values and lists are returned unchanged, as is anything headed
/// for a string or array key. Floats headed for an integer key are rounded
/// to the nearest integer (halves away from zero).
pub fn coerce(
    key: &str,
    value: Value,
    native_type: NativeType,
) -> std::result::Result<Value, ValidationError> {
    let failure = |value: Value| ValidationError::TypeCoercion {
        key: key.to_string(),
        expected: native_type.to_string(),
        value,
    };

    match (native_type, value) {
        (_, value @ (Value::Null | Value::List(_))) => Ok(value),
        (NativeType::Int, value @ Value::Int(_)) => Ok(value),
        (NativeType::Int, Value::Float(f)) => {
            let rounded = f.round();
            if rounded.is_finite() && rounded >= i64::MIN as f64 && rounded <= i64::MAX as f64 {
                Ok(Value::Int(rounded as i64))
            } else {
                Err(failure(Value::Float(f)))
            }
        }
        (NativeType::Int, Value::Text(text)) => match text.trim().parse::<i64>() {
            Ok(i) => Ok(Value::Int(i)),
            Err(_) => Err(failure(Value::Text(text))),
        },
        (NativeType::Float, value @ Value::Float(_)) => Ok(value),
        (NativeType::Float, Value::Int(i)) => Ok(Value::Float(i as f64)),
        (NativeType::Float, Value::Text(text)) => match text.trim().parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(Value::Float(f)),
            _ => Err(failure(Value::Text(text))),
        },
        (NativeType::String | NativeType::Array, value) => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Bufr4Codec;

    fn message() -> BufrMessage {
        let params = MessageParams {
            descriptors: vec![301021, 301011, 301012, 10051, 12101],
            table_version: 36,
            ..MessageParams::default()
        };
        BufrMessage::new(Arc::new(Bufr4Codec::new()), params).unwrap()
    }

    fn fill_date(message: &mut BufrMessage, diagnostics: &mut Diagnostics) {
        for (key, value) in [
            ("typicalYear", 2021),
            ("typicalMonth", 11),
            ("typicalDay", 18),
            ("typicalHour", 18),
            ("typicalMinute", 0),
        ] {
            message
                .set(key, Value::Int(value), ValidationPolicy::Strict, diagnostics)
                .unwrap();
        }
    }

    #[test]
    fn test_registry_enumerates_codec_keys() {
        let message = message();
        assert!(message.contains("edition"));
        assert!(message.contains("#1#airTemperature"));
        assert!(message.contains("#1#airTemperature->units"));
        assert!(!message.contains("#2#airTemperature"));

        assert_eq!(message.native_type("#1#latitude"), Some(NativeType::Float));
        assert_eq!(
            message.native_type(UNEXPANDED_DESCRIPTORS_KEY),
            Some(NativeType::Array)
        );
        assert_eq!(message.is_header("edition"), Some(true));
        assert_eq!(message.is_header("#1#year"), Some(false));
        assert!(message.entries().iter().all(|e| e.value.is_null()));
    }

    #[test]
    fn test_coercion_rules() {
        assert_eq!(
            coerce("k", Value::Float(2021.0), NativeType::Int).unwrap(),
            Value::Int(2021)
        );
        assert_eq!(
            coerce("k", Value::Float(17.6), NativeType::Int).unwrap(),
            Value::Int(18)
        );
        assert_eq!(
            coerce("k", Value::Text(" 42 ".into()), NativeType::Int).unwrap(),
            Value::Int(42)
        );
        assert_eq!(
            coerce("k", Value::Int(55), NativeType::Float).unwrap(),
            Value::Float(55.0)
        );
        assert_eq!(
            coerce("k", Value::Text("ABCD".into()), NativeType::String).unwrap(),
            Value::Text("ABCD".into())
        );
        assert_eq!(
            coerce("k", Value::List(vec![Value::Int(1)]), NativeType::Int).unwrap(),
            Value::List(vec![Value::Int(1)])
        );
        assert!(matches!(
            coerce("k", Value::Text("warm".into()), NativeType::Float),
            Err(ValidationError::TypeCoercion { .. })
        ));
    }

    #[test]
    fn test_set_lenient_nullifies_bad_values() {
        let mut message = message();
        let mut diagnostics = Diagnostics::new();
        message
            .set(
                "#1#airTemperature",
                Value::Text("warm".into()),
                ValidationPolicy::Lenient,
                &mut diagnostics,
            )
            .unwrap();

        assert_eq!(message.get("#1#airTemperature").unwrap(), Value::Null);
        assert_eq!(diagnostics.warnings().len(), 1);
    }

    #[test]
    fn test_set_strict_propagates() {
        let mut message = message();
        let mut diagnostics = Diagnostics::new();
        let err = message
            .set(
                "#1#airTemperature",
                Value::Text("warm".into()),
                ValidationPolicy::Strict,
                &mut diagnostics,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            Csv2BufrError::Validation(ValidationError::TypeCoercion { .. })
        ));
    }

    #[test]
    fn test_set_unknown_key() {
        let mut message = message();
        let mut diagnostics = Diagnostics::new();
        assert!(matches!(
            message.set("colour", Value::Int(1), ValidationPolicy::Lenient, &mut diagnostics),
            Err(Csv2BufrError::UnknownKey { .. })
        ));
        assert!(matches!(
            message.get("colour"),
            Err(Csv2BufrError::UnknownKey { .. })
        ));
    }

    #[test]
    fn test_set_get_is_idempotent() {
        let mut message = message();
        let mut diagnostics = Diagnostics::new();
        for (key, value) in [
            ("#1#latitude", Value::Float(55.154)),
            ("#1#pressureReducedToMeanSeaLevel", Value::Int(100130)),
            ("edition", Value::Int(4)),
        ] {
            message
                .set(key, value, ValidationPolicy::Strict, &mut diagnostics)
                .unwrap();
            let stored = message.get(key).unwrap();
            let native = message.native_type(key);
            message
                .set(key, stored.clone(), ValidationPolicy::Strict, &mut diagnostics)
                .unwrap();
            assert_eq!(message.get(key).unwrap(), stored);
            assert_eq!(message.native_type(key), native);
        }
    }

    #[test]
    fn test_attribute_addressing() {
        let message = message();
        assert_eq!(
            message.get("#1#airTemperature->units").unwrap(),
            Value::Text("K".into())
        );
        assert_eq!(
            message.get("#1#airTemperature->scale").unwrap(),
            Value::Int(2)
        );
        assert!(matches!(
            message.get("edition->units"),
            Err(Csv2BufrError::Codec(CodecError::Attribute { .. }))
        ));
        assert!(matches!(
            message.get("#1#nothing->units"),
            Err(Csv2BufrError::UnknownKey { .. })
        ));
    }

    #[test]
    fn test_reset_clears_values_and_cache() {
        let mut message = message();
        let mut diagnostics = Diagnostics::new();
        fill_date(&mut message, &mut diagnostics);
        assert!(message.serialize(false, &mut diagnostics).is_some());
        assert!(message.checksum().is_some());

        message.reset();
        assert!(message.entries().iter().all(|e| e.value.is_null()));
        assert!(message.checksum().is_none());
    }

    #[test]
    fn test_serialize_failure_is_recorded_not_raised() {
        let mut message = message();
        let mut diagnostics = Diagnostics::new();
        // No characteristic date: the codec refuses to pack
        let bytes = message.serialize(false, &mut diagnostics);
        assert!(bytes.is_none());
        assert!(diagnostics.has_errors());
        assert!(message.checksum().is_none());
    }

    #[test]
    fn test_serialize_uses_cache_when_asked() {
        let mut message = message();
        let mut diagnostics = Diagnostics::new();
        fill_date(&mut message, &mut diagnostics);
        let first = message.serialize(false, &mut diagnostics).unwrap();
        let cached = message.serialize(true, &mut diagnostics).unwrap();
        assert_eq!(first, cached);
        assert_eq!(message.checksum().unwrap().len(), 64);
    }

    /// Counts handles so tests can tell a fresh encode from a cache hit
    struct CountingCodec {
        inner: Bufr4Codec,
        handles: std::sync::atomic::AtomicUsize,
    }

    impl Codec for CountingCodec {
        fn new_empty_message(
            &self,
            params: &MessageParams,
        ) -> std::result::Result<Box<dyn CodecMessage>, CodecError> {
            self.handles
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.inner.new_empty_message(params)
        }
    }

    #[test]
    fn test_cache_survives_reset_for_unchanged_values() {
        let codec = Arc::new(CountingCodec {
            inner: Bufr4Codec::new(),
            handles: std::sync::atomic::AtomicUsize::new(0),
        });
        let params = message().params().clone();
        let mut message = BufrMessage::new(codec.clone(), params).unwrap();
        let mut diagnostics = Diagnostics::new();
        let handles = || codec.handles.load(std::sync::atomic::Ordering::SeqCst);

        fill_date(&mut message, &mut diagnostics);
        let first = message.serialize(true, &mut diagnostics).unwrap();
        let after_first = handles();

        message.reset();
        fill_date(&mut message, &mut diagnostics);
        assert_eq!(message.serialize(true, &mut diagnostics).unwrap(), first);
        assert_eq!(handles(), after_first);
        assert!(message.checksum().is_some());

        // Without the flag the same values are packed again
        message.reset();
        fill_date(&mut message, &mut diagnostics);
        assert_eq!(message.serialize(false, &mut diagnostics).unwrap(), first);
        assert_eq!(handles(), after_first + 1);

        // A changed value never reuses stale bytes
        message
            .set(
                "#1#airTemperature",
                Value::Float(280.0),
                ValidationPolicy::Strict,
                &mut diagnostics,
            )
            .unwrap();
        assert_ne!(message.serialize(true, &mut diagnostics).unwrap(), first);
        assert_eq!(handles(), after_first + 2);
    }

    #[test]
    fn test_failed_encode_after_success_returns_nothing() {
        let mut message = message();
        let mut diagnostics = Diagnostics::new();
        fill_date(&mut message, &mut diagnostics);
        assert!(message.serialize(true, &mut diagnostics).is_some());

        message.reset();
        assert!(message.serialize(true, &mut diagnostics).is_none());
        assert!(diagnostics.has_errors());
        assert!(message.checksum().is_none());
    }

    #[test]
    fn test_identical_values_give_identical_checksums() {
        let mut message = message();
        let mut diagnostics = Diagnostics::new();

        fill_date(&mut message, &mut diagnostics);
        message.serialize(false, &mut diagnostics).unwrap();
        let first = message.checksum();

        message.reset();
        fill_date(&mut message, &mut diagnostics);
        message.serialize(false, &mut diagnostics).unwrap();
        assert_eq!(message.checksum(), first);
    }
}
