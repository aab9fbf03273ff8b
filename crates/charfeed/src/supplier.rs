//! Chunk production: character sources and buffering strategies.
//!
//! A [`CharSource`] is the upstream collaborator that yields decoded
//! characters (byte decoding happens before this crate, but a UTF-8
//! [`Utf8CharSource`] adapter is provided so `io::Read` values plug in
//! directly). A [`ChunkSupplier`] turns a source into successive character
//! chunks for [`CharReader`](crate::CharReader); the rotating variant
//! recycles chunk storage returned by the consumer, the allocating variant
//! hands out a fresh buffer per call.

use std::io;
use std::str;

use crate::error::{Error, Result};

/// Minimum chunk size accepted by the suppliers; parsers need at least a
/// two-character window for their CRLF/quote lookahead to stay cheap.
pub const MIN_CHUNK_SIZE: usize = 2;

/// Default chunk size used by the convenience constructors.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// A stream of decoded characters. `Ok(0)` signals end of stream.
pub trait CharSource {
    fn read_chars(&mut self, dst: &mut [char]) -> io::Result<usize>;
}

impl<S: CharSource + ?Sized> CharSource for &mut S {
    fn read_chars(&mut self, dst: &mut [char]) -> io::Result<usize> {
        (**self).read_chars(dst)
    }
}

impl<S: CharSource + ?Sized> CharSource for Box<S> {
    fn read_chars(&mut self, dst: &mut [char]) -> io::Result<usize> {
        (**self).read_chars(dst)
    }
}

/// Characters drawn from an owned string.
#[derive(Debug)]
pub struct StringCharSource {
    chars: Vec<char>,
    pos: usize,
}

impl StringCharSource {
    #[must_use]
    pub fn new(data: impl AsRef<str>) -> Self {
        Self {
            chars: data.as_ref().chars().collect(),
            pos: 0,
        }
    }
}

impl CharSource for StringCharSource {
    fn read_chars(&mut self, dst: &mut [char]) -> io::Result<usize> {
        let avail = self.chars.len() - self.pos;
        let n = avail.min(dst.len());
        dst[..n].copy_from_slice(&self.chars[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Incremental UTF-8 decoder over any `io::Read`.
///
/// Bytes are pulled in blocks; a trailing incomplete sequence is carried
/// into the next block. Invalid UTF-8 surfaces as
/// [`io::ErrorKind::InvalidData`].
#[derive(Debug)]
pub struct Utf8CharSource<R> {
    inner: R,
    bytes: Vec<u8>,
    /// Decoded-but-undelivered characters.
    pending: Vec<char>,
    pending_pos: usize,
    /// Length of the undecoded tail carried at the front of `bytes`.
    carry: usize,
    eof: bool,
}

impl<R: io::Read> Utf8CharSource<R> {
    #[must_use]
    pub fn new(inner: R) -> Self {
        Self::with_block_size(inner, DEFAULT_CHUNK_SIZE)
    }

    #[must_use]
    pub fn with_block_size(inner: R, block_size: usize) -> Self {
        Self {
            inner,
            bytes: vec![0; block_size.max(8)],
            pending: Vec::new(),
            pending_pos: 0,
            carry: 0,
            eof: false,
        }
    }

    fn refill(&mut self) -> io::Result<()> {
        self.pending.clear();
        self.pending_pos = 0;
        let n = self.inner.read(&mut self.bytes[self.carry..])?;
        if n == 0 {
            self.eof = true;
            if self.carry != 0 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "incomplete UTF-8 sequence at end of input",
                ));
            }
            return Ok(());
        }
        let filled = self.carry + n;
        let (valid, tail) = match str::from_utf8(&self.bytes[..filled]) {
            Ok(s) => (s, 0),
            Err(e) => {
                let good = e.valid_up_to();
                if e.error_len().is_some() || filled - good > 3 {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "invalid UTF-8 in input",
                    ));
                }
                // Incomplete trailing sequence; decode the valid prefix and
                // carry the tail into the next block.
                let s = str::from_utf8(&self.bytes[..good])
                    .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "invalid UTF-8"))?;
                (s, filled - good)
            }
        };
        self.pending.extend(valid.chars());
        let start = filled - tail;
        self.bytes.copy_within(start..filled, 0);
        self.carry = tail;
        Ok(())
    }
}

impl<R: io::Read> CharSource for Utf8CharSource<R> {
    fn read_chars(&mut self, dst: &mut [char]) -> io::Result<usize> {
        loop {
            let avail = self.pending.len() - self.pending_pos;
            if avail > 0 {
                let n = avail.min(dst.len());
                dst[..n].copy_from_slice(&self.pending[self.pending_pos..self.pending_pos + n]);
                self.pending_pos += n;
                return Ok(n);
            }
            if self.eof {
                return Ok(0);
            }
            self.refill()?;
        }
    }
}

/// Produces successive character chunks; `Ok(None)` at end of stream.
///
/// `recycle` hands back the storage of a chunk the consumer has finished
/// with, so a rotating supplier can refill it instead of allocating.
pub trait ChunkSupplier {
    fn next_chunk(&mut self, recycle: Option<Vec<char>>) -> Result<Option<Vec<char>>>;

    /// Releases any resources held by the supplier. Idempotent.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: ChunkSupplier + ?Sized> ChunkSupplier for Box<S> {
    fn next_chunk(&mut self, recycle: Option<Vec<char>>) -> Result<Option<Vec<char>>> {
        (**self).next_chunk(recycle)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// Supplier over a single pre-built chunk; backs in-memory parsing.
#[derive(Debug)]
pub struct OnceSupplier {
    data: Option<Vec<char>>,
}

impl OnceSupplier {
    #[must_use]
    pub fn new(data: Vec<char>) -> Self {
        Self { data: Some(data) }
    }
}

impl From<&str> for OnceSupplier {
    fn from(s: &str) -> Self {
        Self::new(s.chars().collect())
    }
}

impl ChunkSupplier for OnceSupplier {
    fn next_chunk(&mut self, _recycle: Option<Vec<char>>) -> Result<Option<Vec<char>>> {
        Ok(self.data.take())
    }
}

fn fill_chunk<S: CharSource>(src: &mut S, buf: &mut Vec<char>, chunk_size: usize) -> Result<usize> {
    buf.clear();
    buf.resize(chunk_size, '\0');
    let mut filled = 0;
    while filled < chunk_size {
        let n = src.read_chars(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    buf.truncate(filled);
    Ok(filled)
}

/// Fixed-size chunks whose storage cycles between supplier and consumer.
///
/// A short read at end of stream yields a right-sized final chunk; after
/// the stream is exhausted the source is dropped.
#[derive(Debug)]
pub struct RotatingSupplier<S> {
    source: Option<S>,
    chunk_size: usize,
}

impl<S: CharSource> RotatingSupplier<S> {
    pub fn new(source: S, chunk_size: usize) -> Result<Self> {
        if chunk_size < MIN_CHUNK_SIZE {
            return Err(Error::Usage("chunk size below rotating supplier minimum"));
        }
        Ok(Self {
            source: Some(source),
            chunk_size,
        })
    }
}

impl<S: CharSource> ChunkSupplier for RotatingSupplier<S> {
    fn next_chunk(&mut self, recycle: Option<Vec<char>>) -> Result<Option<Vec<char>>> {
        let Some(source) = self.source.as_mut() else {
            return Ok(None);
        };
        let mut buf = recycle.unwrap_or_else(|| Vec::with_capacity(self.chunk_size));
        let filled = fill_chunk(source, &mut buf, self.chunk_size)?;
        if filled == 0 {
            self.source = None;
            return Ok(None);
        }
        Ok(Some(buf))
    }

    fn close(&mut self) -> Result<()> {
        self.source = None;
        Ok(())
    }
}

/// One fresh buffer per call; never reuses storage.
///
/// Slower in steady state than [`RotatingSupplier`] but safe when the
/// consumer retains chunks indefinitely.
#[derive(Debug)]
pub struct AllocatingSupplier<S> {
    source: Option<S>,
    chunk_size: usize,
}

impl<S: CharSource> AllocatingSupplier<S> {
    pub fn new(source: S, chunk_size: usize) -> Result<Self> {
        if chunk_size < MIN_CHUNK_SIZE {
            return Err(Error::Usage("chunk size below supplier minimum"));
        }
        Ok(Self {
            source: Some(source),
            chunk_size,
        })
    }
}

impl<S: CharSource> ChunkSupplier for AllocatingSupplier<S> {
    fn next_chunk(&mut self, _recycle: Option<Vec<char>>) -> Result<Option<Vec<char>>> {
        let Some(source) = self.source.as_mut() else {
            return Ok(None);
        };
        let mut buf = Vec::with_capacity(self.chunk_size);
        let filled = fill_chunk(source, &mut buf, self.chunk_size)?;
        if filled == 0 {
            self.source = None;
            return Ok(None);
        }
        Ok(Some(buf))
    }

    fn close(&mut self) -> Result<()> {
        self.source = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotating_reuses_storage_and_right_sizes_tail() {
        let mut sup = RotatingSupplier::new(StringCharSource::new("abcdefgh-tail"), 4).unwrap();
        let c1 = sup.next_chunk(None).unwrap().unwrap();
        assert_eq!(c1.iter().collect::<String>(), "abcd");
        let c2 = sup.next_chunk(Some(c1)).unwrap().unwrap();
        assert_eq!(c2.iter().collect::<String>(), "efgh");
        let c3 = sup.next_chunk(Some(c2)).unwrap().unwrap();
        assert_eq!(c3.iter().collect::<String>(), "-tai");
        let c4 = sup.next_chunk(Some(c3)).unwrap().unwrap();
        assert_eq!(c4.iter().collect::<String>(), "l");
        assert!(sup.next_chunk(Some(c4)).unwrap().is_none());
        assert!(sup.next_chunk(None).unwrap().is_none());
    }

    #[test]
    fn chunk_size_minimum_is_enforced() {
        assert!(matches!(
            RotatingSupplier::new(StringCharSource::new("x"), 1),
            Err(Error::Usage(_))
        ));
    }

    #[test]
    fn utf8_source_handles_split_sequences() {
        // Multi-byte characters straddle the tiny block size.
        let data = "héllo wörld ✓".as_bytes();
        let mut src = Utf8CharSource::with_block_size(data, 8);
        let mut out = Vec::new();
        let mut buf = ['\0'; 3];
        loop {
            let n = src.read_chars(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out.iter().collect::<String>(), "héllo wörld ✓");
    }

    #[test]
    fn utf8_source_rejects_invalid_bytes() {
        let data: &[u8] = &[0x61, 0xFF, 0x62];
        let mut src = Utf8CharSource::new(data);
        let mut buf = ['\0'; 8];
        assert!(src.read_chars(&mut buf).is_err());
    }

    #[test]
    fn once_supplier_yields_exactly_once() {
        let mut sup = OnceSupplier::from("abc");
        assert!(sup.next_chunk(None).unwrap().is_some());
        assert!(sup.next_chunk(None).unwrap().is_none());
    }
}
