//! CSV reading and writing.
//!
//! The dialect follows RFC 4180 with the common extensions: configurable
//! separator and quote, optional backslash-style escape character,
//! optional `#`-prefixed comment rows, and LF/CR/CRLF row terminators on
//! input. Row materialization profiles are selected by entry point:
//! [`read_str`] yields plain `Vec` rows (mutable profile),
//! [`read_str_immutable`] yields shared `Arc<[..]>` rows.

mod reader;
mod writer;

pub use reader::{
    read_reader, read_str, read_str_immutable, ColumnPredicate, CsvRowIter, DynSupplier, Field,
    RowReader,
};
pub use writer::{CsvField, CsvWriteOptions, CsvWriter, Newline, QuotePolicy};

use crate::error::Result;

/// Column selection, resolved against the first row when names are used.
#[derive(Debug, Clone, Default)]
pub enum ColumnFilter {
    #[default]
    None,
    /// Keep only columns whose header cell matches one of the names.
    AllowNames(Vec<String>),
    /// Drop columns whose header cell matches one of the names.
    BlockNames(Vec<String>),
    /// Keep only the listed 0-based column indices.
    AllowIndices(Vec<usize>),
    /// Drop the listed 0-based column indices.
    BlockIndices(Vec<usize>),
}

/// Options for the CSV readers.
#[derive(Debug, Clone)]
pub struct CsvReadOptions {
    pub separator: char,
    pub quote: char,
    /// Escape character; the following raw character joins the field
    /// verbatim. Disabled by default (and when NUL).
    pub escape: Option<char>,
    /// Comment character, significant at column 0 of a row. Disabled
    /// when `None` or NUL.
    pub comment: Option<char>,
    pub trim_leading: bool,
    pub trim_trailing: bool,
    /// Report fields that are empty after trimming as `None`.
    pub nil_on_empty: bool,
    pub columns: ColumnFilter,
    /// Chunk size for the source-backed constructors.
    pub chunk_size: usize,
    /// Allocate a fresh chunk per read instead of rotating storage.
    pub allocate_chunks: bool,
    /// Move chunk production onto a background thread.
    pub async_read: bool,
    /// Queue depth used when `async_read` is set.
    pub queue_depth: usize,
}

impl Default for CsvReadOptions {
    fn default() -> Self {
        Self {
            separator: ',',
            quote: '"',
            escape: None,
            comment: Some('#'),
            trim_leading: true,
            trim_trailing: true,
            nil_on_empty: false,
            columns: ColumnFilter::None,
            chunk_size: crate::supplier::DEFAULT_CHUNK_SIZE,
            allocate_chunks: false,
            async_read: false,
            queue_depth: crate::async_supplier::DEFAULT_QUEUE_DEPTH,
        }
    }
}

/// Concatenates several row streams, one CSV per input. With
/// `skip_headers` the first row of every input after the first is
/// discarded. Feed the result to [`CsvWriter::write_rows`].
pub fn concat_rows<T, I, J>(inputs: I, skip_headers: bool) -> impl Iterator<Item = Result<T>>
where
    I: IntoIterator<Item = J>,
    J: IntoIterator<Item = Result<T>>,
{
    inputs.into_iter().enumerate().flat_map(move |(i, rows)| {
        let skip = usize::from(skip_headers && i > 0);
        rows.into_iter().skip(skip)
    })
}
