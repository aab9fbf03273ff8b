//! JSON reading and writing.
//!
//! Reading is recursive descent over chunked character input producing
//! the neutral [`Value`] model (or anything else, through the visitor
//! hooks); writing is a recursive emitter with three independent escape
//! switches. Both ends conform to RFC 8259; the single permissive
//! extension on the read side is that unpaired surrogate escapes decode
//! to U+FFFD instead of raising.

mod reader;
mod value;
pub mod visitor;
mod writer;

pub use reader::{DynSupplier, JsonFactory, JsonReader};
pub use value::Value;
pub use visitor::{ArrayVisitor, KeyFn, ObjectVisitor, ValueFn};
pub use writer::{JsonWriter, ToJson};

use crate::error::Result;

/// Selects how strings and hooks participate in materialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonProfile {
    /// Canonicalized map keys, `key_fn`/`value_fn` applied.
    #[default]
    Immutable,
    /// Same containers as `Immutable`; the returned tree is exclusively
    /// owned either way, so the two differ only in intent.
    Mutable,
    /// Fastest path: no key canonicalization, hooks skipped.
    Raw,
}

/// Options for [`JsonReader`].
#[derive(Debug, Clone)]
pub struct JsonReadOptions {
    /// Decode real-number literals as [`Value::BigDecimal`] text instead
    /// of `f64`.
    pub bigdec: bool,
    /// Overrides the default real-number constructor; receives the exact
    /// literal.
    pub double_fn: Option<fn(&str) -> Result<Value>>,
    /// Rewrites object keys after canonicalization.
    pub key_fn: Option<KeyFn>,
    /// Rewrites entry values; returning `None` elides the entry.
    pub value_fn: Option<ValueFn>,
    pub profile: JsonProfile,
    /// When `true` (the default), [`JsonReader::read`] raises
    /// [`Error::EndOfInput`](crate::Error::EndOfInput) at end of input;
    /// otherwise `eof_fn`, or `eof_value`, or `Null` is substituted.
    pub eof_error: bool,
    pub eof_value: Option<Value>,
    pub eof_fn: Option<fn() -> Value>,
    /// Chunk size for the source-backed constructors.
    pub chunk_size: usize,
    /// Allocate a fresh chunk per read instead of rotating storage.
    pub allocate_chunks: bool,
    /// Move chunk production onto a background thread.
    pub async_read: bool,
    /// Queue depth used when `async_read` is set.
    pub queue_depth: usize,
}

impl Default for JsonReadOptions {
    fn default() -> Self {
        Self {
            bigdec: false,
            double_fn: None,
            key_fn: None,
            value_fn: None,
            profile: JsonProfile::Immutable,
            eof_error: true,
            eof_value: None,
            eof_fn: None,
            chunk_size: crate::supplier::DEFAULT_CHUNK_SIZE,
            allocate_chunks: false,
            async_read: false,
            queue_depth: crate::async_supplier::DEFAULT_QUEUE_DEPTH,
        }
    }
}

/// Options for [`JsonWriter`]. The escape switches all default to on;
/// an empty or absent `indent_str` produces compact output.
#[derive(Debug, Clone)]
pub struct JsonWriteOptions {
    /// Emit `\uXXXX` for every character at or above U+0080.
    pub escape_unicode: bool,
    /// Emit `\/` for `/`.
    pub escape_slash: bool,
    /// Emit U+2028/U+2029 as escapes even when `escape_unicode` is off.
    pub escape_js_separators: bool,
    pub indent_str: Option<String>,
}

impl Default for JsonWriteOptions {
    fn default() -> Self {
        Self {
            escape_unicode: true,
            escape_slash: true,
            escape_js_separators: true,
            indent_str: None,
        }
    }
}

/// Parses one JSON value from a string with the given options.
pub fn read_str(src: &str, options: JsonReadOptions) -> Result<Value> {
    JsonReader::from_str(src, options).read()
}

/// Serializes a value to a string with the given options.
pub fn write_str(value: &Value, options: JsonWriteOptions) -> Result<String> {
    let mut out = Vec::new();
    JsonWriter::new(&mut out, options).write_value(value)?;
    String::from_utf8(out)
        .map_err(|_| crate::error::Error::Usage("writer produced invalid UTF-8"))
}
