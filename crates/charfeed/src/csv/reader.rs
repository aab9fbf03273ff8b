//! CSV row reading.
//!
//! The tokenizer is state-free across rows and resumable across chunk
//! boundaries: each call scans the cached current chunk with a tight
//! index loop and returns one token (field separator, end of line, quote
//! open, comment mark, or end of input) while accumulating unquoted field
//! text into the shared [`CharBuffer`]. [`RowReader`] loops tokens into
//! rows through an [`ArrayVisitor`]; [`CsvRowIter`] adds column-filter
//! resolution against the header row and `Iterator` ergonomics.

use std::io;
use std::sync::Arc;

use crate::async_supplier::AsyncChunkSupplier;
use crate::char_buffer::CharBuffer;
use crate::char_reader::CharReader;
use crate::csv::{ColumnFilter, CsvReadOptions};
use crate::error::{Error, Result, SyntaxError};
use crate::json::visitor::{ArrayVisitor, ImmutableRows, MutableRows};
use crate::supplier::{
    AllocatingSupplier, CharSource, ChunkSupplier, OnceSupplier, RotatingSupplier, Utf8CharSource,
};

/// A materialized field: `None` only under the nil-on-empty option.
pub type Field = Option<Arc<str>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Eof,
    Eol,
    Sep,
    Quote,
    Comment,
}

/// Which columns of a row the reader emits, as a bitset over indices.
#[derive(Debug, Clone)]
pub struct ColumnPredicate {
    /// Accepted-column bits; columns past the end fall back to `beyond`.
    words: Box<[u64]>,
    beyond: bool,
}

impl ColumnPredicate {
    /// Accepts every column.
    #[must_use]
    pub fn all() -> Self {
        Self {
            words: Box::new([]),
            beyond: true,
        }
    }

    /// Accepts exactly the listed column indices.
    #[must_use]
    pub fn allow(indices: impl IntoIterator<Item = usize>) -> Self {
        Self::from_bits(indices, false)
    }

    /// Accepts everything but the listed column indices.
    #[must_use]
    pub fn block(indices: impl IntoIterator<Item = usize>) -> Self {
        let mut p = Self::from_bits(indices, true);
        for w in &mut p.words {
            *w = !*w;
        }
        p
    }

    fn from_bits(indices: impl IntoIterator<Item = usize>, beyond: bool) -> Self {
        let indices: Vec<usize> = indices.into_iter().collect();
        let words = match indices.iter().max() {
            Some(&max) => max / 64 + 1,
            None => 0,
        };
        let mut bits = vec![0u64; words];
        for idx in indices {
            bits[idx / 64] |= 1 << (idx % 64);
        }
        Self {
            words: bits.into(),
            beyond,
        }
    }

    #[inline]
    #[must_use]
    pub fn test(&self, idx: usize) -> bool {
        match self.words.get(idx / 64) {
            Some(w) => w & (1 << (idx % 64)) != 0,
            None => self.beyond,
        }
    }
}

/// Per-row tokenizer over a [`CharReader`].
struct CsvTokenizer<S> {
    reader: CharReader<S>,
    quote: char,
    sep: char,
    comment: Option<char>,
    escape: Option<char>,
}

#[derive(Clone, Copy)]
enum Hit {
    Sep(usize),
    Eol(usize),
    Cr(usize),
    Quote(usize),
    Comment(usize),
    Escape(usize),
}

impl<S: ChunkSupplier> CsvTokenizer<S> {
    fn new(reader: CharReader<S>, options: &CsvReadOptions) -> Self {
        Self {
            reader,
            quote: options.quote,
            sep: options.separator,
            comment: options.comment.filter(|&c| c != '\0'),
            escape: options.escape.filter(|&c| c != '\0'),
        }
    }

    /// Reads one token, accumulating unquoted field text into `sb`.
    ///
    /// `enable_comment` holds only while no character of the row has been
    /// consumed, so a comment char is only significant at column 0.
    /// `field_start` holds only while no character of the current field
    /// has been consumed: a quote anywhere later in the field is literal.
    fn read_token(
        &mut self,
        sb: &mut CharBuffer,
        enable_comment: bool,
        field_start: bool,
    ) -> Result<Token> {
        let sep = self.sep;
        let quote = self.quote;
        let comment = self.comment;
        let escape = self.escape;
        let mut ec = enable_comment;
        let mut fs = field_start;
        loop {
            let mut hit = None;
            if let Some(chunk) = self.reader.chunk() {
                let start = self.reader.position();
                let len = chunk.len();
                let mut pos = start;
                while pos < len {
                    let c = chunk[pos];
                    if ec && Some(c) == comment {
                        hit = Some(Hit::Comment(pos));
                        break;
                    } else if fs && c == quote {
                        hit = Some(Hit::Quote(pos));
                        break;
                    } else if c == sep {
                        hit = Some(Hit::Sep(pos));
                        break;
                    } else if c == '\n' {
                        hit = Some(Hit::Eol(pos));
                        break;
                    } else if c == '\r' {
                        hit = Some(Hit::Cr(pos));
                        break;
                    } else if Some(c) == escape {
                        hit = Some(Hit::Escape(pos));
                        break;
                    }
                    ec = false;
                    fs = false;
                    pos += 1;
                }
                match hit {
                    Some(
                        Hit::Sep(p) | Hit::Eol(p) | Hit::Cr(p) | Hit::Quote(p) | Hit::Escape(p),
                    ) => sb.push_range(chunk, start, p),
                    Some(Hit::Comment(_)) => {}
                    None => sb.push_range(chunk, start, len),
                }
            } else {
                return Ok(Token::Eof);
            }
            match hit {
                Some(Hit::Comment(p)) => {
                    self.reader.set_position(p + 1);
                    return Ok(Token::Comment);
                }
                Some(Hit::Quote(p)) => {
                    self.reader.set_position(p + 1);
                    return Ok(Token::Quote);
                }
                Some(Hit::Sep(p)) => {
                    self.reader.set_position(p + 1);
                    return Ok(Token::Sep);
                }
                Some(Hit::Eol(p)) => {
                    self.reader.set_position(p + 1);
                    return Ok(Token::Eol);
                }
                Some(Hit::Cr(p)) => {
                    // Swallow the LF of a CRLF; the lookahead may cross
                    // into the next chunk.
                    if self.reader.read_from(p + 1)? != Some('\n') && !self.reader.eof() {
                        self.reader.pushback()?;
                    }
                    return Ok(Token::Eol);
                }
                Some(Hit::Escape(p)) => {
                    // The next raw character goes into the field verbatim.
                    match self.reader.read_from(p + 1)? {
                        Some(c) => sb.push(c),
                        None => return Ok(Token::Eof),
                    }
                    ec = false;
                    fs = false;
                }
                None => {
                    self.reader.next_chunk()?;
                }
            }
        }
    }

    /// Reads quoted content after a [`Token::Quote`]. A doubled quote is
    /// an escaped literal quote; end of stream inside the section is a
    /// recoverable [`SyntaxError::UnclosedQuote`].
    fn read_quoted(&mut self, sb: &mut CharBuffer, row: usize) -> Result<()> {
        let quote = self.quote;
        loop {
            let mut hit = None;
            if let Some(chunk) = self.reader.chunk() {
                let start = self.reader.position();
                let len = chunk.len();
                let mut pos = start;
                while pos < len {
                    if chunk[pos] == quote {
                        hit = Some(pos);
                        break;
                    }
                    pos += 1;
                }
                match hit {
                    Some(p) => sb.push_range(chunk, start, p),
                    None => sb.push_range(chunk, start, len),
                }
            } else {
                return Err(Error::Csv {
                    source: SyntaxError::UnclosedQuote,
                    row,
                });
            }
            match hit {
                Some(p) => match self.reader.read_from(p + 1)? {
                    Some(c) if c == quote => sb.push(quote),
                    Some(_) => {
                        self.reader.pushback()?;
                        return Ok(());
                    }
                    // Closing quote at end of stream.
                    None => return Ok(()),
                },
                None => {
                    self.reader.next_chunk()?;
                }
            }
        }
    }

    /// Drains the rest of a comment line, including its terminator.
    fn skip_comment(&mut self) -> Result<()> {
        loop {
            let mut hit = None;
            if let Some(chunk) = self.reader.chunk() {
                let start = self.reader.position();
                let len = chunk.len();
                let mut pos = start;
                while pos < len {
                    let c = chunk[pos];
                    if c == '\n' || c == '\r' {
                        hit = Some((pos, c));
                        break;
                    }
                    pos += 1;
                }
            } else {
                // Comment ran to end of stream.
                return Ok(());
            }
            match hit {
                Some((p, '\n')) => {
                    self.reader.set_position(p + 1);
                    return Ok(());
                }
                Some((p, _)) => {
                    if self.reader.read_from(p + 1)? != Some('\n') && !self.reader.eof() {
                        self.reader.pushback()?;
                    }
                    return Ok(());
                }
                None => {
                    self.reader.next_chunk()?;
                }
            }
        }
    }
}

/// Loops tokens into rows, feeding finished fields to an
/// [`ArrayVisitor`].
pub struct RowReader<S, V: ArrayVisitor<Field>> {
    tok: CsvTokenizer<S>,
    sb: CharBuffer,
    visitor: V,
    pred: ColumnPredicate,
    row_index: usize,
}

impl<S: ChunkSupplier, V: ArrayVisitor<Field>> RowReader<S, V> {
    pub fn new(mut reader: CharReader<S>, options: &CsvReadOptions, visitor: V) -> Self {
        // A leading BOM is not data.
        if let Some(chunk) = reader.chunk() {
            if reader.position() == 0 && chunk.first() == Some(&'\u{FEFF}') {
                reader.set_position(1);
            }
        }
        Self {
            tok: CsvTokenizer::new(reader, options),
            sb: CharBuffer::new(
                options.trim_leading,
                options.trim_trailing,
                options.nil_on_empty,
            ),
            visitor,
            pred: ColumnPredicate::all(),
            row_index: 0,
        }
    }

    pub fn set_predicate(&mut self, pred: ColumnPredicate) {
        self.pred = pred;
    }

    /// Reads the next row, or `None` when the input is exhausted.
    ///
    /// Rows that materialize as nothing but a single empty field are
    /// dropped, so files of only whitespace (or a lone BOM) yield zero
    /// rows and a trailing newline adds no phantom row.
    pub fn next_row(&mut self) -> Result<Option<V::Output>> {
        loop {
            let mut acc = self.visitor.new_array();
            self.sb.clear();
            let mut colidx = 0usize;
            let mut emitted = 0usize;
            let mut lone_empty = false;
            let mut enable_comment = true;
            let mut field_start = true;
            let tag = loop {
                let tag = self
                    .tok
                    .read_token(&mut self.sb, enable_comment, field_start)?;
                enable_comment = false;
                match tag {
                    Token::Quote => {
                        self.tok.read_quoted(&mut self.sb, self.row_index)?;
                        // Content after the closing quote extends the
                        // same field; a further quote in it is literal.
                        field_start = false;
                    }
                    Token::Comment => {
                        self.tok.skip_comment()?;
                        enable_comment = true;
                        field_start = true;
                    }
                    Token::Sep | Token::Eol | Token::Eof => {
                        if self.pred.test(colidx) {
                            let field = self.sb.build(None);
                            lone_empty =
                                emitted == 0 && field.as_deref().map_or(true, str::is_empty);
                            acc = self.visitor.on_value(acc, field);
                            emitted += 1;
                        }
                        colidx += 1;
                        self.sb.clear();
                        if tag != Token::Sep {
                            break tag;
                        }
                        field_start = true;
                    }
                }
            };
            let empty_row = emitted == 0 || (emitted == 1 && lone_empty);
            let row = self.visitor.finish(acc);
            if empty_row {
                if tag == Token::Eof {
                    return Ok(None);
                }
                continue;
            }
            self.row_index += 1;
            return Ok(Some(row));
        }
    }
}

/// Iterator over CSV rows with column-filter resolution.
///
/// Name-based column filters resolve against the first row; the header
/// itself is re-emitted through the same filter.
pub struct CsvRowIter<S, V: ArrayVisitor<Field>> {
    inner: RowReader<S, V>,
    unresolved: Option<ColumnFilter>,
    done: bool,
}

pub type DynSupplier = Box<dyn ChunkSupplier + Send>;

impl<V: ArrayVisitor<Field>> CsvRowIter<OnceSupplier, V> {
    /// Rows of an in-memory document.
    #[must_use]
    pub fn from_str_with(src: &str, options: &CsvReadOptions, visitor: V) -> Self {
        Self::over(CharReader::from_str(src), options, visitor)
    }
}

impl<V: ArrayVisitor<Field>> CsvRowIter<DynSupplier, V> {
    /// Rows of a character source; the options' buffering knobs select
    /// chunk size, allocating vs. rotating chunks, and background reads.
    pub fn from_source_with<C>(source: C, options: &CsvReadOptions, visitor: V) -> Result<Self>
    where
        C: CharSource + Send + 'static,
    {
        let supplier: DynSupplier = match (options.async_read, options.allocate_chunks) {
            (false, false) => Box::new(RotatingSupplier::new(source, options.chunk_size)?),
            (false, true) => Box::new(AllocatingSupplier::new(source, options.chunk_size)?),
            (true, false) => Box::new(AsyncChunkSupplier::new(
                RotatingSupplier::new(source, options.chunk_size)?,
                options.queue_depth,
            )?),
            (true, true) => Box::new(AsyncChunkSupplier::new(
                AllocatingSupplier::new(source, options.chunk_size)?,
                options.queue_depth,
            )?),
        };
        Ok(Self::over(CharReader::new(supplier)?, options, visitor))
    }

    /// Rows of a UTF-8 byte stream.
    pub fn from_reader_with<R>(reader: R, options: &CsvReadOptions, visitor: V) -> Result<Self>
    where
        R: io::Read + Send + 'static,
    {
        Self::from_source_with(Utf8CharSource::new(reader), options, visitor)
    }
}

impl<S: ChunkSupplier, V: ArrayVisitor<Field>> CsvRowIter<S, V> {
    fn over(reader: CharReader<S>, options: &CsvReadOptions, visitor: V) -> Self {
        let mut inner = RowReader::new(reader, options, visitor);
        let unresolved = match &options.columns {
            ColumnFilter::None => None,
            ColumnFilter::AllowIndices(idx) => {
                inner.set_predicate(ColumnPredicate::allow(idx.iter().copied()));
                None
            }
            ColumnFilter::BlockIndices(idx) => {
                inner.set_predicate(ColumnPredicate::block(idx.iter().copied()));
                None
            }
            named => Some(named.clone()),
        };
        Self {
            inner,
            unresolved,
            done: false,
        }
    }

    /// Closes the underlying chunk supplier.
    pub fn close(&mut self) -> Result<()> {
        self.inner.tok.reader.close()
    }
}

impl<S: ChunkSupplier, V> Iterator for CsvRowIter<S, V>
where
    V: ArrayVisitor<Field>,
    V::Output: AsRef<[Field]> + FromIterator<Field>,
{
    type Item = Result<V::Output>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(filter) = self.unresolved.take() {
            // The header row is read with every column so names resolve,
            // then re-filtered before being handed out.
            return match self.inner.next_row() {
                Ok(Some(header)) => {
                    let pred = filter.resolve(header.as_ref());
                    let filtered: V::Output = header
                        .as_ref()
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| pred.test(*i))
                        .map(|(_, f)| f.clone())
                        .collect();
                    self.inner.set_predicate(pred);
                    Some(Ok(filtered))
                }
                Ok(None) => {
                    self.done = true;
                    None
                }
                Err(e) => {
                    self.done = true;
                    Some(Err(e))
                }
            };
        }
        match self.inner.next_row() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl ColumnFilter {
    fn resolve(&self, header: &[Field]) -> ColumnPredicate {
        let find = |names: &[String]| -> Vec<usize> {
            names
                .iter()
                .filter_map(|name| {
                    header.iter().position(|f| f.as_deref() == Some(name.as_str()))
                })
                .collect()
        };
        match self {
            ColumnFilter::AllowNames(names) => ColumnPredicate::allow(find(names)),
            ColumnFilter::BlockNames(names) => ColumnPredicate::block(find(names)),
            ColumnFilter::AllowIndices(idx) => ColumnPredicate::allow(idx.iter().copied()),
            ColumnFilter::BlockIndices(idx) => ColumnPredicate::block(idx.iter().copied()),
            ColumnFilter::None => ColumnPredicate::all(),
        }
    }
}

/// Mutable-profile rows of an in-memory document.
#[must_use]
pub fn read_str(src: &str, options: &CsvReadOptions) -> CsvRowIter<OnceSupplier, MutableRows> {
    CsvRowIter::from_str_with(src, options, MutableRows)
}

/// Immutable-profile rows of an in-memory document.
#[must_use]
pub fn read_str_immutable(
    src: &str,
    options: &CsvReadOptions,
) -> CsvRowIter<OnceSupplier, ImmutableRows> {
    CsvRowIter::from_str_with(src, options, ImmutableRows)
}

/// Mutable-profile rows of a UTF-8 byte stream.
pub fn read_reader<R>(
    reader: R,
    options: &CsvReadOptions,
) -> Result<CsvRowIter<DynSupplier, MutableRows>>
where
    R: io::Read + Send + 'static,
{
    CsvRowIter::from_reader_with(reader, options, MutableRows)
}
