//! Native CQL values and their serialized form.

use crate::types::codec::{build_collection, build_map, build_tuple};
use crate::types::DataType;
use anyhow::{bail, Result};
use bytes::{BufMut, Bytes, BytesMut};

/// Native values that serialize into the CQL wire format
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Int(i32),
    BigInt(i64),
    Double(f64),
    Text(String),
    Blob(Vec<u8>),
    List(Vec<Value>),
    Set(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Tuple(Vec<Option<Value>>),
}

impl Value {
    /// Serialize this value
    pub fn serialize(&self) -> Bytes {
        match self {
            Value::Boolean(b) => Bytes::copy_from_slice(&[u8::from(*b)]),
            Value::Int(i) => {
                let mut buf = BytesMut::with_capacity(4);
                buf.put_i32(*i);
                buf.freeze()
            }
            Value::BigInt(i) => {
                let mut buf = BytesMut::with_capacity(8);
                buf.put_i64(*i);
                buf.freeze()
            }
            Value::Double(d) => {
                let mut buf = BytesMut::with_capacity(8);
                buf.put_f64(*d);
                buf.freeze()
            }
            Value::Text(s) => Bytes::copy_from_slice(s.as_bytes()),
            Value::Blob(b) => Bytes::copy_from_slice(b),
            Value::List(elements) | Value::Set(elements) => {
                build_collection(elements.iter().map(|e| Some(e.serialize())))
            }
            Value::Map(entries) => {
                build_map(entries.iter().map(|(k, v)| (k.serialize(), v.serialize())))
            }
            Value::Tuple(components) => {
                build_tuple(components.iter().map(|c| c.as_ref().map(Value::serialize)))
            }
        }
    }

    /// Check if this value is compatible with the given data type
    pub fn is_compatible_with(&self, data_type: &DataType) -> bool {
        match (self, data_type.without_reversed()) {
            (Value::Boolean(_), DataType::Boolean) => true,
            (Value::Int(_), DataType::Int) => true,
            (Value::BigInt(_), DataType::BigInt) => true,
            (Value::Double(_), DataType::Double) => true,
            (Value::Text(s), DataType::Ascii) => s.is_ascii(),
            (Value::Text(_), DataType::Text) => true,
            (Value::Blob(_), DataType::Blob) => true,
            (Value::List(elements), DataType::List(ty))
            | (Value::Set(elements), DataType::Set(ty)) => {
                elements.iter().all(|e| e.is_compatible_with(ty))
            }
            (Value::Map(entries), DataType::Map(kt, vt)) => entries
                .iter()
                .all(|(k, v)| k.is_compatible_with(kt) && v.is_compatible_with(vt)),
            (Value::Tuple(components), DataType::Tuple(types)) => {
                components.len() <= types.len()
                    && components.iter().zip(types).all(|(c, ty)| {
                        c.as_ref().map_or(true, |c| c.is_compatible_with(ty))
                    })
            }
            _ => false,
        }
    }
}

/// Serialize a value after checking it against the column type
pub fn serialize_value(value: &Value, data_type: &DataType) -> Result<Bytes> {
    if !value.is_compatible_with(data_type) {
        bail!("Value {:?} is not compatible with type {}", value, data_type);
    }
    Ok(value.serialize())
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}
