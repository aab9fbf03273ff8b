//! The neutral JSON value model.
//!
//! [`Value`] represents any value in the supported grammar. Numbers keep
//! their natural precision: integral literals that fit a signed 64-bit
//! range decode as [`Value::Integer`], larger ones promote to
//! [`Value::BigInt`], and real literals decode as [`Value::Double`] unless
//! the reader's `bigdec` option preserves them exactly as
//! [`Value::BigDecimal`] text.

use std::fmt;
use std::sync::Arc;

use num_bigint::BigInt;

/// A JSON value as defined by [RFC 8259].
///
/// Objects preserve insertion order as a sequence of key/value pairs; the
/// reader's visitors decide the final container shape, and this model is
/// what the default visitors produce.
///
/// [RFC 8259]: https://datatracker.ietf.org/doc/html/rfc8259
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    BigInt(BigInt),
    Double(f64),
    /// An arbitrary-precision decimal kept as its exact source literal;
    /// re-parse through `FromStr` into a decimal type of your choice.
    BigDecimal(Box<str>),
    String(Arc<str>),
    Array(Vec<Value>),
    Object(Vec<(Arc<str>, Value)>),
}

impl Default for Value {
    fn default() -> Self {
        Self::Null
    }
}

impl Value {
    /// Returns `true` if the value is [`Null`](Value::Null).
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(n) => Some(*n),
            #[allow(clippy::cast_precision_loss)]
            Self::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Looks up an object entry by key; the last entry wins when keys
    /// repeat.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Object(entries) => entries
                .iter()
                .rev()
                .find(|(k, _)| k.as_ref() == key)
                .map(|(_, v)| v),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(Arc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::Array(v)
    }
}

/// `Display` emits compact conformant JSON with the default escape
/// policy (unicode, slash, and JS-separator escaping all on).
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = Vec::new();
        let mut w = crate::json::JsonWriter::new(&mut out, crate::json::JsonWriteOptions::default());
        w.write_value(self).map_err(|_| fmt::Error)?;
        drop(w);
        f.write_str(std::str::from_utf8(&out).map_err(|_| fmt::Error)?)
    }
}
