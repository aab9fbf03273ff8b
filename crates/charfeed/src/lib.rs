//! High-throughput CSV and JSON reading/writing over chunked character
//! streams.
//!
//! The engine chains a lazy sequence of character chunks into one
//! logical stream ([`CharReader`]) and runs the tokenizers as tight
//! index loops over the cached current chunk. Decoded fields and string
//! literals accumulate in a reusable [`CharBuffer`]; map keys are
//! deduplicated through a [`CanonicalStrings`] table that can be shared
//! across millions of small parses. Chunk production can run inline
//! (rotating or allocating suppliers) or on a background producer
//! thread behind a bounded queue.
//!
//! # Reading CSV
//!
//! ```
//! use charfeed::csv::{self, CsvReadOptions};
//!
//! let rows: Result<Vec<_>, _> =
//!     csv::read_str("Year,Make\n1997,Ford\n", &CsvReadOptions::default()).collect();
//! let rows = rows.unwrap();
//! assert_eq!(rows[1][0].as_deref(), Some("1997"));
//! ```
//!
//! # Reading and writing JSON
//!
//! ```
//! use charfeed::json::{self, JsonReadOptions, JsonWriteOptions, Value};
//!
//! let v = json::read_str(r#"{"a": 1, "b": [true, null]}"#, JsonReadOptions::default()).unwrap();
//! assert_eq!(v.get("a"), Some(&Value::Integer(1)));
//! let text = json::write_str(&v, JsonWriteOptions::default()).unwrap();
//! assert_eq!(text, r#"{"a":1,"b":[true,null]}"#);
//! ```

mod async_supplier;
mod canonical;
mod char_buffer;
mod char_reader;
pub mod csv;
mod error;
pub mod json;
mod line_reader;
mod supplier;

pub use async_supplier::{AsyncChunkSupplier, DEFAULT_PUT_TIMEOUT, DEFAULT_QUEUE_DEPTH};
pub use canonical::CanonicalStrings;
pub use char_buffer::CharBuffer;
pub use char_reader::CharReader;
pub use error::{Error, Result, SyntaxError};
pub use line_reader::LineNumberReader;
pub use supplier::{
    AllocatingSupplier, CharSource, ChunkSupplier, OnceSupplier, RotatingSupplier,
    StringCharSource, Utf8CharSource, DEFAULT_CHUNK_SIZE, MIN_CHUNK_SIZE,
};
