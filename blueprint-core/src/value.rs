//! Value Codec
//!
//! Controls hold their values in a typed serialized form. The state core
//! never interprets values beyond what the [`ValueCodec`] offers:
//!
//! - structural comparison (used by the idempotence gate)
//! - type identification
//! - casting between types
//! - canonical empty values
//!
//! [`StandardCodec`] is the codec used by default. Editors embedding the
//! core with a richer type library plug in their own implementation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Type tag of a serialized value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Boolean,
    Integer,
    Number,
    Text,
    Bytes,
}

impl ValueType {
    /// Every value type, in the order shown to users.
    pub const ALL: [ValueType; 5] = [
        ValueType::Text,
        ValueType::Integer,
        ValueType::Number,
        ValueType::Boolean,
        ValueType::Bytes,
    ];

    /// The stable tag used in the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Boolean => "boolean",
            ValueType::Integer => "integer",
            ValueType::Number => "number",
            ValueType::Text => "text",
            ValueType::Bytes => "bytes",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value in its serialized, type-tagged form.
///
/// Serializes as `{ "type": "<tag>", "data": ... }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum SerializedValue {
    Boolean(bool),
    Integer(i64),
    Number(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl SerializedValue {
    /// Type tag of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            SerializedValue::Boolean(_) => ValueType::Boolean,
            SerializedValue::Integer(_) => ValueType::Integer,
            SerializedValue::Number(_) => ValueType::Number,
            SerializedValue::Text(_) => ValueType::Text,
            SerializedValue::Bytes(_) => ValueType::Bytes,
        }
    }

    /// Shorthand for a text value.
    pub fn text(text: impl Into<String>) -> Self {
        SerializedValue::Text(text.into())
    }
}

/// Structural equality. Numbers compare by bit pattern as well as by value
/// so the relation stays total (`NaN` equals itself).
impl PartialEq for SerializedValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (SerializedValue::Boolean(a), SerializedValue::Boolean(b)) => a == b,
            (SerializedValue::Integer(a), SerializedValue::Integer(b)) => a == b,
            (SerializedValue::Number(a), SerializedValue::Number(b)) => {
                a == b || a.to_bits() == b.to_bits()
            }
            (SerializedValue::Text(a), SerializedValue::Text(b)) => a == b,
            (SerializedValue::Bytes(a), SerializedValue::Bytes(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for SerializedValue {}

impl Default for SerializedValue {
    fn default() -> Self {
        SerializedValue::Text(String::new())
    }
}

impl From<bool> for SerializedValue {
    fn from(value: bool) -> Self {
        SerializedValue::Boolean(value)
    }
}

impl From<i64> for SerializedValue {
    fn from(value: i64) -> Self {
        SerializedValue::Integer(value)
    }
}

impl From<f64> for SerializedValue {
    fn from(value: f64) -> Self {
        SerializedValue::Number(value)
    }
}

impl From<&str> for SerializedValue {
    fn from(value: &str) -> Self {
        SerializedValue::Text(value.to_string())
    }
}

impl From<Vec<u8>> for SerializedValue {
    fn from(value: Vec<u8>) -> Self {
        SerializedValue::Bytes(value)
    }
}

/// Operations the state core needs from a value library.
pub trait ValueCodec: fmt::Debug + Send + Sync {
    /// Structural equality of two serialized values.
    fn compare(&self, a: &SerializedValue, b: &SerializedValue) -> bool;

    /// Identify the type of a serialized value.
    fn identify(&self, value: &SerializedValue) -> ValueType;

    /// Cast a value to another type. Returns `None` if the value cannot be
    /// represented in the target type.
    fn cast(&self, value: &SerializedValue, to: ValueType) -> Option<SerializedValue>;

    /// The canonical empty value of a type, or of the default type if `None`.
    fn empty(&self, value_type: Option<ValueType>) -> SerializedValue;
}

/// The built-in codec over [`SerializedValue`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardCodec;

impl ValueCodec for StandardCodec {
    fn compare(&self, a: &SerializedValue, b: &SerializedValue) -> bool {
        a == b
    }

    fn identify(&self, value: &SerializedValue) -> ValueType {
        value.value_type()
    }

    fn cast(&self, value: &SerializedValue, to: ValueType) -> Option<SerializedValue> {
        use SerializedValue as V;

        if value.value_type() == to {
            return Some(value.clone());
        }

        match (value, to) {
            (V::Boolean(b), ValueType::Text) => Some(V::Text(b.to_string())),
            (V::Integer(i), ValueType::Text) => Some(V::Text(i.to_string())),
            (V::Number(n), ValueType::Text) => Some(V::Text(n.to_string())),
            (V::Bytes(bytes), ValueType::Text) => {
                String::from_utf8(bytes.clone()).ok().map(V::Text)
            }

            (V::Integer(i), ValueType::Number) => Some(V::Number(*i as f64)),
            (V::Text(s), ValueType::Number) => s.trim().parse::<f64>().ok().map(V::Number),

            (V::Number(n), ValueType::Integer) => {
                let in_range = n.is_finite()
                    && n.fract() == 0.0
                    && *n >= i64::MIN as f64
                    && *n < i64::MAX as f64;
                in_range.then(|| V::Integer(*n as i64))
            }
            (V::Text(s), ValueType::Integer) => s.trim().parse::<i64>().ok().map(V::Integer),

            (V::Text(s), ValueType::Boolean) => match s.trim() {
                "true" => Some(V::Boolean(true)),
                "false" => Some(V::Boolean(false)),
                _ => None,
            },

            (V::Text(s), ValueType::Bytes) => Some(V::Bytes(s.as_bytes().to_vec())),

            _ => None,
        }
    }

    fn empty(&self, value_type: Option<ValueType>) -> SerializedValue {
        match value_type.unwrap_or(ValueType::Text) {
            ValueType::Boolean => SerializedValue::Boolean(false),
            ValueType::Integer => SerializedValue::Integer(0),
            ValueType::Number => SerializedValue::Number(0.0),
            ValueType::Text => SerializedValue::Text(String::new()),
            ValueType::Bytes => SerializedValue::Bytes(Vec::new()),
        }
    }
}
