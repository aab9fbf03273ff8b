//! Recursive JSON emitter.
//!
//! [`JsonWriter`] writes UTF-8 JSON text to any `io::Write`. String
//! escaping is assembled in a reusable scratch buffer and flushed in one
//! write per string. Values outside the neutral model implement
//! [`ToJson`], the seam by which host collections and user-defined types
//! plug into [`write_object`](JsonWriter::write_object).

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt::Write as _;
use std::io;
use std::sync::Arc;

use num_bigint::BigInt;

use crate::error::{Error, Result};
use crate::json::{JsonWriteOptions, Value};

#[inline]
fn is_js_separator(c: char) -> bool {
    c == '\u{2028}' || c == '\u{2029}'
}

pub struct JsonWriter<W> {
    w: W,
    escape_unicode: bool,
    escape_js_separators: bool,
    escape_slash: bool,
    indent_str: Option<Box<str>>,
    indent: usize,
    scratch: String,
}

impl<W: io::Write> JsonWriter<W> {
    #[must_use]
    pub fn new(w: W, options: JsonWriteOptions) -> Self {
        let indent_str = match options.indent_str {
            Some(s) if !s.is_empty() => Some(s.into_boxed_str()),
            _ => None,
        };
        Self {
            w,
            escape_unicode: options.escape_unicode,
            escape_js_separators: options.escape_js_separators,
            escape_slash: options.escape_slash,
            indent_str,
            indent: 0,
            scratch: String::new(),
        }
    }

    /// Unwraps the underlying writer.
    pub fn into_inner(self) -> W {
        self.w
    }

    pub fn flush(&mut self) -> Result<()> {
        self.w.flush()?;
        Ok(())
    }

    /// Writes a JSON string literal with the configured escape policy.
    ///
    /// Backslash, quote, and controls below U+0020 are always escaped;
    /// `escape_unicode` additionally escapes everything at or above
    /// U+0080 (as a surrogate pair beyond the BMP), and
    /// `escape_js_separators` forces U+2028/U+2029 out as escapes even when general
    /// unicode escaping is off.
    pub fn write_string(&mut self, data: &str) -> Result<()> {
        self.scratch.clear();
        self.scratch.push('"');
        for c in data.chars() {
            match c {
                '\\' | '"' => {
                    self.scratch.push('\\');
                    self.scratch.push(c);
                }
                '/' => {
                    if self.escape_slash {
                        self.scratch.push('\\');
                    }
                    self.scratch.push('/');
                }
                '\u{0008}' => self.scratch.push_str("\\b"),
                '\u{000C}' => self.scratch.push_str("\\f"),
                '\n' => self.scratch.push_str("\\n"),
                '\r' => self.scratch.push_str("\\r"),
                '\t' => self.scratch.push_str("\\t"),
                c => {
                    let code = c as u32;
                    if code < 32 || (self.escape_js_separators && is_js_separator(c)) {
                        let _ = write!(self.scratch, "\\u{code:04x}");
                    } else if self.escape_unicode && code >= 128 {
                        let mut units = [0u16; 2];
                        for unit in c.encode_utf16(&mut units) {
                            let _ = write!(self.scratch, "\\u{unit:04x}");
                        }
                    } else {
                        self.scratch.push(c);
                    }
                }
            }
        }
        self.scratch.push('"');
        self.w.write_all(self.scratch.as_bytes())?;
        Ok(())
    }

    pub fn write_null(&mut self) -> Result<()> {
        self.w.write_all(b"null")?;
        Ok(())
    }

    pub fn write_bool(&mut self, b: bool) -> Result<()> {
        self.w.write_all(if b { b"true" } else { b"false" })?;
        Ok(())
    }

    pub fn write_i64(&mut self, n: i64) -> Result<()> {
        write!(self.w, "{n}")?;
        Ok(())
    }

    /// JSON has no encoding for NaN or the infinities; they are refused.
    ///
    /// A whole-number double prints without a decimal point and would
    /// read back as an integer, so the text keeps a `.0` marker.
    pub fn write_f64(&mut self, n: f64) -> Result<()> {
        if !n.is_finite() {
            return Err(Error::NonFiniteNumber(n));
        }
        self.scratch.clear();
        let _ = write!(self.scratch, "{n}");
        if !self.scratch.contains(['.', 'e', 'E']) {
            self.scratch.push_str(".0");
        }
        self.w.write_all(self.scratch.as_bytes())?;
        Ok(())
    }

    pub fn write_f32(&mut self, n: f32) -> Result<()> {
        if !n.is_finite() {
            return Err(Error::NonFiniteNumber(f64::from(n)));
        }
        self.scratch.clear();
        let _ = write!(self.scratch, "{n}");
        if !self.scratch.contains(['.', 'e', 'E']) {
            self.scratch.push_str(".0");
        }
        self.w.write_all(self.scratch.as_bytes())?;
        Ok(())
    }

    pub fn write_bigint(&mut self, n: &BigInt) -> Result<()> {
        write!(self.w, "{n}")?;
        Ok(())
    }

    /// Writes an arbitrary-precision decimal from its literal text.
    pub fn write_big_decimal(&mut self, literal: &str) -> Result<()> {
        self.w.write_all(literal.as_bytes())?;
        Ok(())
    }

    fn write_indent(&mut self) -> Result<()> {
        if self.indent == 0 {
            return Ok(());
        }
        if let Some(s) = &self.indent_str {
            for _ in 0..self.indent {
                self.w.write_all(s.as_bytes())?;
            }
        }
        Ok(())
    }

    /// Writes the elements as a JSON array. Elements stay on one line,
    /// comma-separated, whatever the indent policy.
    pub fn write_array<T, I>(&mut self, iter: I) -> Result<()>
    where
        T: ToJson,
        I: IntoIterator<Item = T>,
    {
        self.indent += 1;
        self.w.write_all(b"[")?;
        let mut first = true;
        for item in iter {
            if !first {
                self.w.write_all(b",")?;
            }
            first = false;
            item.write_json(self)?;
        }
        self.w.write_all(b"]")?;
        self.indent -= 1;
        Ok(())
    }

    /// Writes the entries as a JSON object. With a non-empty indent
    /// string each entry lands on its own line prefixed by the indent
    /// repeated per depth; compact output has no whitespace at all.
    pub fn write_map<K, T, I>(&mut self, entries: I) -> Result<()>
    where
        K: AsRef<str>,
        T: ToJson,
        I: IntoIterator<Item = (K, T)>,
    {
        let has_indent = self.indent_str.is_some();
        if has_indent && self.indent != 0 {
            self.w.write_all(b"\n")?;
            self.write_indent()?;
        }
        self.w.write_all(b"{")?;
        self.indent += 1;
        let mut first = true;
        for (k, v) in entries {
            if !first {
                self.w.write_all(b",")?;
            }
            if has_indent {
                self.w.write_all(b"\n")?;
                self.write_indent()?;
            }
            first = false;
            self.write_string(k.as_ref())?;
            self.w
                .write_all(if has_indent { ": " } else { ":" }.as_bytes())?;
            v.write_json(self)?;
        }
        self.indent -= 1;
        if has_indent && !first {
            self.w.write_all(b"\n")?;
            self.write_indent()?;
        }
        self.w.write_all(b"}")?;
        Ok(())
    }

    /// Writes a value from the neutral model.
    pub fn write_value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Null => self.write_null(),
            Value::Boolean(b) => self.write_bool(*b),
            Value::Integer(n) => self.write_i64(*n),
            Value::BigInt(n) => self.write_bigint(n),
            Value::Double(n) => self.write_f64(*n),
            Value::BigDecimal(text) => self.write_big_decimal(text),
            Value::String(s) => self.write_string(s),
            Value::Array(items) => self.write_array(items.iter()),
            Value::Object(entries) => self.write_map(entries.iter().map(|(k, v)| (k.as_ref(), v))),
        }
    }

    /// Writes any value that knows how to describe itself as JSON.
    ///
    /// Primitives and the neutral model are handled by their [`ToJson`]
    /// impls; host collections and user-defined types supply their own,
    /// coercing keys to strings and calling back into the primitive and
    /// container methods here.
    pub fn write_object<T: ToJson + ?Sized>(&mut self, value: &T) -> Result<()> {
        value.write_json(self)
    }
}

/// Conversion seam for [`JsonWriter::write_object`].
pub trait ToJson {
    fn write_json<W: io::Write>(&self, w: &mut JsonWriter<W>) -> Result<()>;
}

impl<T: ToJson + ?Sized> ToJson for &T {
    fn write_json<W: io::Write>(&self, w: &mut JsonWriter<W>) -> Result<()> {
        (**self).write_json(w)
    }
}

impl ToJson for Value {
    fn write_json<W: io::Write>(&self, w: &mut JsonWriter<W>) -> Result<()> {
        w.write_value(self)
    }
}

impl ToJson for str {
    fn write_json<W: io::Write>(&self, w: &mut JsonWriter<W>) -> Result<()> {
        w.write_string(self)
    }
}

impl ToJson for String {
    fn write_json<W: io::Write>(&self, w: &mut JsonWriter<W>) -> Result<()> {
        w.write_string(self)
    }
}

impl ToJson for Arc<str> {
    fn write_json<W: io::Write>(&self, w: &mut JsonWriter<W>) -> Result<()> {
        w.write_string(self)
    }
}

impl ToJson for bool {
    fn write_json<W: io::Write>(&self, w: &mut JsonWriter<W>) -> Result<()> {
        w.write_bool(*self)
    }
}

impl ToJson for f64 {
    fn write_json<W: io::Write>(&self, w: &mut JsonWriter<W>) -> Result<()> {
        w.write_f64(*self)
    }
}

impl ToJson for f32 {
    fn write_json<W: io::Write>(&self, w: &mut JsonWriter<W>) -> Result<()> {
        w.write_f32(*self)
    }
}

impl ToJson for BigInt {
    fn write_json<W: io::Write>(&self, w: &mut JsonWriter<W>) -> Result<()> {
        w.write_bigint(self)
    }
}

macro_rules! to_json_int {
    ($($t:ty),*) => {$(
        impl ToJson for $t {
            fn write_json<W: io::Write>(&self, w: &mut JsonWriter<W>) -> Result<()> {
                write!(w.w, "{self}")?;
                Ok(())
            }
        }
    )*};
}

to_json_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl<T: ToJson> ToJson for Option<T> {
    fn write_json<W: io::Write>(&self, w: &mut JsonWriter<W>) -> Result<()> {
        match self {
            Some(v) => v.write_json(w),
            None => w.write_null(),
        }
    }
}

impl<T: ToJson> ToJson for Vec<T> {
    fn write_json<W: io::Write>(&self, w: &mut JsonWriter<W>) -> Result<()> {
        w.write_array(self.iter())
    }
}

impl<T: ToJson> ToJson for [T] {
    fn write_json<W: io::Write>(&self, w: &mut JsonWriter<W>) -> Result<()> {
        w.write_array(self.iter())
    }
}

impl<T: ToJson> ToJson for BTreeSet<T> {
    fn write_json<W: io::Write>(&self, w: &mut JsonWriter<W>) -> Result<()> {
        w.write_array(self.iter())
    }
}

impl<T: ToJson> ToJson for HashSet<T> {
    fn write_json<W: io::Write>(&self, w: &mut JsonWriter<W>) -> Result<()> {
        w.write_array(self.iter())
    }
}

impl<K: AsRef<str>, V: ToJson> ToJson for BTreeMap<K, V> {
    fn write_json<W: io::Write>(&self, w: &mut JsonWriter<W>) -> Result<()> {
        w.write_map(self.iter().map(|(k, v)| (k.as_ref(), v)))
    }
}

impl<K: AsRef<str>, V: ToJson> ToJson for HashMap<K, V> {
    fn write_json<W: io::Write>(&self, w: &mut JsonWriter<W>) -> Result<()> {
        w.write_map(self.iter().map(|(k, v)| (k.as_ref(), v)))
    }
}
