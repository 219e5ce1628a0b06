//! Codec boundary for BUFR message packing.
//!
//! The encoder never manipulates wire bytes itself. It asks a [`Codec`]
//! for an empty message laid out for a descriptor sequence, enumerates the
//! keys that message exposes, sets typed values and asks for the packed
//! bytes. Message handles are released when dropped.
//!
//! [`Bufr4Codec`] is the in-process implementation shipped with the crate.

pub mod bits;
pub mod bufr4;
pub mod tables;

pub use bufr4::Bufr4Codec;

use crate::error::CodecError;
use crate::models::{NativeType, Value};
use serde::{Deserialize, Serialize};

/// Parameters that fix the layout of a message
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageParams {
    pub descriptors: Vec<i64>,
    pub short_replication: Vec<i64>,
    pub normal_replication: Vec<i64>,
    pub extended_replication: Vec<i64>,
    pub table_version: i64,
}

/// One addressable key of an empty message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    pub key: String,
    pub native_type: NativeType,
    pub is_header: bool,
}

/// Factory for message handles.
pub trait Codec: Send + Sync {
    /// Materialize an empty message for the given layout
    fn new_empty_message(
        &self,
        params: &MessageParams,
    ) -> Result<Box<dyn CodecMessage>, CodecError>;
}

/// A working message handle. Dropping the handle releases it.
pub trait CodecMessage {
    /// Every addressable key, header keys first
    fn enumerate_keys(&self) -> Vec<KeyInfo>;

    /// Code-table attribute (`code`, `units`, `scale`, `reference`, `width`)
    /// of a data key. Header keys have no attributes.
    fn get_attribute(&self, key: &str, attribute: &str) -> Result<Value, CodecError>;

    /// Current value of a key, `Value::Null` when unset
    fn get_value(&self, key: &str) -> Result<Value, CodecError>;

    fn set_scalar(&mut self, key: &str, value: &Value) -> Result<(), CodecError>;

    fn set_array(&mut self, key: &str, values: &[Value]) -> Result<(), CodecError>;

    /// Encode the current values
    fn pack(&mut self) -> Result<(), CodecError>;

    /// Bytes produced by the last successful [`CodecMessage::pack`]
    fn write_bytes(&self) -> Result<Vec<u8>, CodecError>;
}
