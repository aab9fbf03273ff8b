//! Recursive-descent JSON reader.
//!
//! [`JsonReader`] parses RFC 8259 text pulled through a
//! [`CharReader`], materializing arrays and objects through the visitor
//! hooks and canonicalizing map keys through a [`CanonicalStrings`]
//! table. One reader can be advanced repeatedly to consume several
//! whitespace-delimited top-level values from the same stream.
//!
//! The hot paths (whitespace skip, string scan, number scan) run as
//! index loops over the current chunk and only fall back to
//! character-at-a-time reads around escapes and chunk boundaries.

use std::io;
use std::sync::Arc;

use num_bigint::BigInt;

use crate::canonical::CanonicalStrings;
use crate::char_buffer::CharBuffer;
use crate::char_reader::CharReader;
use crate::error::{Error, Result, SyntaxError};
use crate::json::visitor::{ArrayVisitor, ObjectVisitor, ValueArrays, ValueObjects};
use crate::json::{JsonProfile, JsonReadOptions, Value};
use crate::line_reader::LineNumberReader;
use crate::supplier::{
    AllocatingSupplier, CharSource, ChunkSupplier, OnceSupplier, RotatingSupplier, Utf8CharSource,
};
use crate::async_supplier::AsyncChunkSupplier;

/// Outcome of one chunk-local string scan.
enum Scan {
    /// Closing quote found; the finished string and the position after it.
    Done(Arc<str>, usize),
    /// Backslash found; position after it.
    Escape(usize),
    /// Chunk exhausted mid-string.
    More,
}

pub struct JsonReader<S, A = ValueArrays, O = ValueObjects> {
    reader: CharReader<S>,
    buf: CharBuffer,
    num: String,
    table: CanonicalStrings,
    opts: JsonReadOptions,
    arrays: A,
    objects: O,
    intern_keys: bool,
    failed: bool,
    line: usize,
    column: usize,
    /// Coordinates of the token being parsed, for error messages.
    mark_line: usize,
    mark_column: usize,
}

impl JsonReader<OnceSupplier> {
    /// Reader over an in-memory string with the default visitors.
    #[must_use]
    pub fn from_str(src: &str, options: JsonReadOptions) -> Self {
        Self::from_str_with_table(src, options, CanonicalStrings::new())
    }

    /// Like [`from_str`](Self::from_str) with a caller-supplied canonical
    /// table, so interned keys are shared across many parses. Reclaim the
    /// table with [`into_table`](Self::into_table).
    #[must_use]
    pub fn from_str_with_table(
        src: &str,
        options: JsonReadOptions,
        table: CanonicalStrings,
    ) -> Self {
        Self::build(CharReader::from_str(src), options, table)
    }
}

pub type DynSupplier = Box<dyn ChunkSupplier + Send>;

impl JsonReader<DynSupplier> {
    /// Reader over a character source.
    ///
    /// Input is routed through a [`LineNumberReader`] so CR and CRLF line
    /// terminators are normalized before chunking, which keeps this
    /// reader's own line accounting exact. The options' buffering knobs
    /// select chunk size, allocating vs. rotating chunks, and the
    /// background producer thread.
    pub fn from_source<S>(source: S, options: JsonReadOptions) -> Result<Self>
    where
        S: CharSource + Send + 'static,
    {
        let normalized = LineNumberReader::new(source);
        let supplier: DynSupplier = match (options.async_read, options.allocate_chunks) {
            (false, false) => Box::new(RotatingSupplier::new(normalized, options.chunk_size)?),
            (false, true) => Box::new(AllocatingSupplier::new(normalized, options.chunk_size)?),
            (true, false) => Box::new(AsyncChunkSupplier::new(
                RotatingSupplier::new(normalized, options.chunk_size)?,
                options.queue_depth,
            )?),
            (true, true) => Box::new(AsyncChunkSupplier::new(
                AllocatingSupplier::new(normalized, options.chunk_size)?,
                options.queue_depth,
            )?),
        };
        Ok(Self::build(CharReader::new(supplier)?, options, CanonicalStrings::new()))
    }

    /// Reader over UTF-8 bytes.
    pub fn from_reader<R>(reader: R, options: JsonReadOptions) -> Result<Self>
    where
        R: io::Read + Send + 'static,
    {
        Self::from_source(Utf8CharSource::new(reader), options)
    }
}

impl<S: ChunkSupplier, A, O> JsonReader<S, A, O>
where
    A: ArrayVisitor<Value, Output = Value>,
    O: ObjectVisitor<Output = Value>,
{
    /// Reader with caller-supplied visitors in place of the defaults.
    pub fn with_visitors(
        reader: CharReader<S>,
        options: JsonReadOptions,
        table: CanonicalStrings,
        arrays: A,
        objects: O,
    ) -> Self {
        let intern_keys = options.profile != JsonProfile::Raw;
        Self {
            reader,
            buf: CharBuffer::plain(),
            num: String::new(),
            table,
            opts: options,
            arrays,
            objects,
            intern_keys,
            failed: false,
            line: 1,
            column: 1,
            mark_line: 1,
            mark_column: 1,
        }
    }

    /// Reads one value. At end of input the configured EOF policy
    /// applies: an [`Error::EndOfInput`] by default, or the configured
    /// substitute value/thunk.
    pub fn read(&mut self) -> Result<Value> {
        match self.read_next()? {
            Some(v) => Ok(v),
            None => {
                if self.opts.eof_error {
                    Err(self.end_of_input())
                } else if let Some(f) = self.opts.eof_fn {
                    Ok(f())
                } else {
                    Ok(self.opts.eof_value.clone().unwrap_or(Value::Null))
                }
            }
        }
    }

    /// Reads the next top-level value, or `None` at end of input.
    pub fn read_next(&mut self) -> Result<Option<Value>> {
        if self.failed {
            return Ok(None);
        }
        let result = match self.next_token_char()? {
            None => Ok(None),
            Some(c) => self.read_value(c).map(Some),
        };
        if result.is_err() {
            self.failed = true;
        }
        result
    }

    /// Closes the underlying chunk supplier.
    pub fn close(&mut self) -> Result<()> {
        self.reader.close()
    }

    /// Releases the canonical table for reuse by another reader.
    #[must_use]
    pub fn into_table(self) -> CanonicalStrings {
        self.table
    }

    // --------------------------------------------------------------------
    // Tokenizer
    // --------------------------------------------------------------------

    /// Skips whitespace (and a BOM) and consumes the first significant
    /// character, recording its coordinates as the token mark.
    fn next_token_char(&mut self) -> Result<Option<char>> {
        loop {
            let mut found = None;
            if let Some(chunk) = self.reader.chunk() {
                let len = chunk.len();
                let mut pos = self.reader.position();
                while pos < len {
                    let c = chunk[pos];
                    if c == '\n' {
                        self.line += 1;
                        self.column = 1;
                    } else if c.is_whitespace() || c == '\u{FEFF}' {
                        self.column += 1;
                    } else {
                        found = Some((c, pos + 1));
                        break;
                    }
                    pos += 1;
                }
            } else {
                self.mark_line = self.line;
                self.mark_column = self.column;
                return Ok(None);
            }
            if let Some((c, next)) = found {
                self.mark_line = self.line;
                self.mark_column = self.column;
                self.column += 1;
                self.reader.set_position(next);
                return Ok(Some(c));
            }
            self.reader.next_chunk()?;
        }
    }

    #[inline]
    fn read_char(&mut self) -> Result<Option<char>> {
        let c = self.reader.read()?;
        if let Some(c) = c {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        Ok(c)
    }

    /// The next character without consuming it, rolling into the next
    /// chunk as needed.
    fn peek_char(&mut self) -> Result<Option<char>> {
        loop {
            if let Some(chunk) = self.reader.chunk() {
                let pos = self.reader.position();
                if pos < chunk.len() {
                    return Ok(Some(chunk[pos]));
                }
            } else {
                return Ok(None);
            }
            self.reader.next_chunk()?;
        }
    }

    // --------------------------------------------------------------------
    // Values
    // --------------------------------------------------------------------

    fn read_value(&mut self, dispatch: char) -> Result<Value> {
        match dispatch {
            '{' => self.read_object(),
            '[' => self.read_array(),
            '"' => Ok(Value::String(self.read_string(false)?)),
            '-' | '0'..='9' => self.read_number(dispatch),
            't' => self.read_literal(&['r', 'u', 'e'], "true", Value::Boolean(true)),
            'f' => self.read_literal(&['a', 'l', 's', 'e'], "false", Value::Boolean(false)),
            'n' => self.read_literal(&['u', 'l', 'l'], "null", Value::Null),
            c => Err(self.unexpected(c)),
        }
    }

    fn read_literal(&mut self, rest: &[char], name: &'static str, value: Value) -> Result<Value> {
        let mut buf = ['\0'; 4];
        let got = &mut buf[..rest.len()];
        if !self.reader.read_exact(got)? {
            return Err(self.end_of_input());
        }
        if *got != *rest {
            return Err(self.syntax_at_mark(SyntaxError::ExpectedLiteral(name)));
        }
        self.column += rest.len();
        Ok(value)
    }

    fn read_array(&mut self) -> Result<Value> {
        let mut acc = self.arrays.new_array();
        let Some(first) = self.next_token_char()? else {
            return Err(self.end_of_input());
        };
        if first == ']' {
            return Ok(self.arrays.finish(acc));
        }
        let mut dispatch = first;
        loop {
            let v = self.read_value(dispatch)?;
            acc = self.arrays.on_value(acc, v);
            match self.next_token_char()? {
                Some(',') => match self.next_token_char()? {
                    Some(']') => return Err(self.syntax_at_mark(SyntaxError::TrailingComma)),
                    Some(',') => {
                        return Err(self.syntax_at_mark(SyntaxError::UnexpectedCharacter(',')))
                    }
                    Some(c) => dispatch = c,
                    None => return Err(self.end_of_input()),
                },
                Some(']') => return Ok(self.arrays.finish(acc)),
                Some(_) => return Err(self.syntax_at_mark(SyntaxError::ExpectedComma(']'))),
                None => return Err(self.end_of_input()),
            }
        }
    }

    fn read_object(&mut self) -> Result<Value> {
        let mut acc = self.objects.new_object();
        let Some(first) = self.next_token_char()? else {
            return Err(self.end_of_input());
        };
        if first == '}' {
            return Ok(self.objects.finish(acc));
        }
        let mut key_char = first;
        loop {
            if key_char != '"' {
                return Err(if matches!(key_char, '{' | '[' | 't' | 'f' | 'n' | '-' | '0'..='9') {
                    self.syntax_at_mark(SyntaxError::NonStringKey)
                } else {
                    self.unexpected(key_char)
                });
            }
            let key = self.read_string(self.intern_keys)?;
            match self.next_token_char()? {
                Some(':') => {}
                Some(_) => return Err(self.syntax_at_mark(SyntaxError::ExpectedColon)),
                None => return Err(self.end_of_input()),
            }
            let Some(vc) = self.next_token_char()? else {
                return Err(self.end_of_input());
            };
            let value = self.read_value(vc)?;
            acc = self.objects.on_entry(acc, key, value);
            match self.next_token_char()? {
                Some(',') => match self.next_token_char()? {
                    Some('}') => return Err(self.syntax_at_mark(SyntaxError::TrailingComma)),
                    Some(',') => {
                        return Err(self.syntax_at_mark(SyntaxError::UnexpectedCharacter(',')))
                    }
                    Some(c) => key_char = c,
                    None => return Err(self.end_of_input()),
                },
                Some('}') => return Ok(self.objects.finish(acc)),
                Some(_) => return Err(self.syntax_at_mark(SyntaxError::ExpectedComma('}'))),
                None => return Err(self.end_of_input()),
            }
        }
    }

    // --------------------------------------------------------------------
    // Strings
    // --------------------------------------------------------------------

    /// Reads the body of a string whose opening quote was consumed.
    ///
    /// A string lying within one chunk with no escapes is handed to the
    /// scratch buffer's external-range fast path without copying.
    fn read_string(&mut self, intern: bool) -> Result<Arc<str>> {
        self.buf.clear();
        loop {
            let scan = {
                let Some(chunk) = self.reader.chunk() else {
                    return Err(self.end_of_input());
                };
                let start = self.reader.position();
                let len = chunk.len();
                let mut pos = start;
                let mut scan = Scan::More;
                while pos < len {
                    let c = chunk[pos];
                    if c == '"' {
                        let table = intern.then_some(&mut self.table);
                        let built = self
                            .buf
                            .build_from(chunk, start, pos, table)
                            .unwrap_or_else(|| Arc::from(""));
                        self.column += pos - start + 1;
                        scan = Scan::Done(built, pos + 1);
                        break;
                    } else if c == '\\' {
                        self.buf.push_range(chunk, start, pos);
                        self.column += pos - start + 1;
                        scan = Scan::Escape(pos + 1);
                        break;
                    } else if (c as u32) < 0x20 {
                        self.column += pos - start;
                        return Err(self.syntax(SyntaxError::ControlCharacter(c)));
                    }
                    pos += 1;
                }
                if matches!(scan, Scan::More) {
                    self.buf.push_range(chunk, start, len);
                    self.column += len - start;
                }
                scan
            };
            match scan {
                Scan::Done(s, next) => {
                    self.reader.set_position(next);
                    return Ok(s);
                }
                Scan::Escape(next) => {
                    self.reader.set_position(next);
                    self.read_escape()?;
                }
                Scan::More => {
                    self.reader.next_chunk()?;
                }
            }
        }
    }

    /// Decodes the escape following a backslash into the scratch buffer.
    fn read_escape(&mut self) -> Result<()> {
        let Some(c) = self.read_char()? else {
            return Err(self.end_of_input());
        };
        self.apply_escape(c)
    }

    fn apply_escape(&mut self, c: char) -> Result<()> {
        match c {
            '"' | '\\' | '/' => self.buf.push(c),
            'b' => self.buf.push('\u{0008}'),
            'f' => self.buf.push('\u{000C}'),
            'n' => self.buf.push('\n'),
            'r' => self.buf.push('\r'),
            't' => self.buf.push('\t'),
            'u' => return self.read_unicode_escape(),
            c => return Err(self.syntax(SyntaxError::InvalidEscape(c))),
        }
        Ok(())
    }

    fn read_hex4(&mut self) -> Result<u32> {
        let mut v = 0;
        for _ in 0..4 {
            let Some(c) = self.read_char()? else {
                return Err(self.end_of_input());
            };
            let Some(d) = c.to_digit(16) else {
                return Err(self.syntax(SyntaxError::InvalidUnicodeEscape));
            };
            v = v * 16 + d;
        }
        Ok(v)
    }

    /// Decodes `\uXXXX`, pairing a high surrogate with an immediately
    /// following low-surrogate escape. Rust strings cannot hold unpaired
    /// surrogates, so a lone half decodes to U+FFFD.
    fn read_unicode_escape(&mut self) -> Result<()> {
        let hi = self.read_hex4()?;
        if !(0xD800..=0xDBFF).contains(&hi) {
            self.push_code_unit(hi);
            return Ok(());
        }
        if self.peek_char()? != Some('\\') {
            self.buf.push('\u{FFFD}');
            return Ok(());
        }
        self.read_char()?; // the backslash
        if self.peek_char()? == Some('u') {
            self.read_char()?;
            let lo = self.read_hex4()?;
            if (0xDC00..=0xDFFF).contains(&lo) {
                let cp = 0x10000 + ((hi - 0xD800) << 10) + (lo - 0xDC00);
                match char::from_u32(cp) {
                    Some(c) => self.buf.push(c),
                    None => return Err(self.syntax(SyntaxError::InvalidUnicodeEscape)),
                }
            } else {
                self.buf.push('\u{FFFD}');
                self.push_code_unit(lo);
            }
            Ok(())
        } else {
            // A different escape follows the lone high surrogate.
            self.buf.push('\u{FFFD}');
            self.read_escape()
        }
    }

    fn push_code_unit(&mut self, unit: u32) {
        match char::from_u32(unit) {
            Some(c) => self.buf.push(c),
            // Unpaired surrogate half.
            None => self.buf.push('\u{FFFD}'),
        }
    }

    // --------------------------------------------------------------------
    // Numbers
    // --------------------------------------------------------------------

    fn read_number(&mut self, first: char) -> Result<Value> {
        self.num.clear();
        self.num.push(first);
        loop {
            let mut terminated = false;
            let mut next_pos = 0;
            if let Some(chunk) = self.reader.chunk() {
                let start = self.reader.position();
                let len = chunk.len();
                let mut pos = start;
                while pos < len {
                    match chunk[pos] {
                        '0'..='9' | '-' | '+' | '.' | 'e' | 'E' => pos += 1,
                        _ => {
                            terminated = true;
                            break;
                        }
                    }
                }
                self.num.extend(chunk[start..pos].iter());
                self.column += pos - start;
                next_pos = pos;
            } else {
                break;
            }
            // The terminator stays unconsumed; the next token read starts
            // on it, even when it is the first character of a new chunk.
            self.reader.set_position(next_pos);
            if terminated {
                break;
            }
            self.reader.next_chunk()?;
        }
        self.decode_number()
    }

    fn decode_number(&mut self) -> Result<Value> {
        let bytes = self.num.as_bytes();
        let len = bytes.len();
        let mut real = false;
        let mut i = 0;
        if bytes[i] == b'-' {
            i += 1;
        }
        // Integer part: a lone zero or a nonzero-led digit run.
        match bytes.get(i) {
            Some(b'0') => i += 1,
            Some(b'1'..=b'9') => {
                while i < len && bytes[i].is_ascii_digit() {
                    i += 1;
                }
            }
            _ => return Err(self.invalid_number()),
        }
        if i < len && bytes[i] == b'.' {
            real = true;
            i += 1;
            let digits = i;
            while i < len && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i == digits {
                return Err(self.invalid_number());
            }
        }
        if i < len && (bytes[i] == b'e' || bytes[i] == b'E') {
            real = true;
            i += 1;
            if i < len && (bytes[i] == b'+' || bytes[i] == b'-') {
                i += 1;
            }
            let digits = i;
            while i < len && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i == digits {
                return Err(self.invalid_number());
            }
        }
        if i != len {
            return Err(self.invalid_number());
        }

        if !real {
            if let Ok(n) = self.num.parse::<i64>() {
                return Ok(Value::Integer(n));
            }
            return match BigInt::parse_bytes(bytes, 10) {
                Some(n) => Ok(Value::BigInt(n)),
                None => Err(self.invalid_number()),
            };
        }
        if self.opts.bigdec {
            return Ok(Value::BigDecimal(self.num.as_str().into()));
        }
        if let Some(f) = self.opts.double_fn {
            return f(&self.num);
        }
        match self.num.parse::<f64>() {
            Ok(d) => Ok(Value::Double(d)),
            Err(_) => Err(self.invalid_number()),
        }
    }

    // --------------------------------------------------------------------
    // Errors
    // --------------------------------------------------------------------

    fn syntax(&self, source: SyntaxError) -> Error {
        Error::Json {
            source,
            line: self.line,
            column: self.column,
        }
    }

    fn syntax_at_mark(&self, source: SyntaxError) -> Error {
        Error::Json {
            source,
            line: self.mark_line,
            column: self.mark_column,
        }
    }

    fn unexpected(&self, c: char) -> Error {
        self.syntax_at_mark(SyntaxError::UnexpectedCharacter(c))
    }

    fn end_of_input(&self) -> Error {
        Error::EndOfInput {
            line: self.line,
            column: self.column,
        }
    }

    fn invalid_number(&self) -> Error {
        self.syntax_at_mark(SyntaxError::InvalidNumber(self.num.clone()))
    }
}

impl<S: ChunkSupplier, A, O> Iterator for JsonReader<S, A, O>
where
    A: ArrayVisitor<Value, Output = Value>,
    O: ObjectVisitor<Output = Value>,
{
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_next().transpose()
    }
}

impl<S, A, O> JsonReader<S, A, O> {
    pub(crate) fn build_default(
        reader: CharReader<S>,
        options: JsonReadOptions,
        table: CanonicalStrings,
    ) -> JsonReader<S, ValueArrays, ValueObjects>
    where
        S: ChunkSupplier,
    {
        let objects = if options.profile == JsonProfile::Raw {
            ValueObjects::default()
        } else {
            ValueObjects {
                key_fn: options.key_fn,
                value_fn: options.value_fn,
            }
        };
        JsonReader::with_visitors(reader, options, table, ValueArrays, objects)
    }
}

impl<S: ChunkSupplier> JsonReader<S, ValueArrays, ValueObjects> {
    fn build(reader: CharReader<S>, options: JsonReadOptions, table: CanonicalStrings) -> Self {
        Self::build_default(reader, options, table)
    }
}

/// Retains a canonical table and options across many small parses, so
/// repeated map keys share one allocation crate-wide.
#[derive(Debug)]
pub struct JsonFactory {
    table: CanonicalStrings,
    options: JsonReadOptions,
}

impl JsonFactory {
    #[must_use]
    pub fn new(options: JsonReadOptions) -> Self {
        Self {
            table: CanonicalStrings::new(),
            options,
        }
    }

    /// Parses one value from an in-memory document.
    pub fn parse_str(&mut self, src: &str) -> Result<Value> {
        let table = std::mem::take(&mut self.table);
        let mut reader = JsonReader::from_str_with_table(src, self.options.clone(), table);
        let out = reader.read();
        self.table = reader.into_table();
        out
    }

    #[must_use]
    pub fn table(&self) -> &CanonicalStrings {
        &self.table
    }
}
