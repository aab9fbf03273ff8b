//! Chunk-chaining character reader.
//!
//! [`CharReader`] presents a lazy sequence of character chunks as one
//! logical stream. Tokenizers cache the current chunk and run tight
//! index loops over it via [`chunk`](CharReader::chunk) /
//! [`position`](CharReader::position) / [`set_position`](CharReader::set_position);
//! the chunk reference is stable between [`next_chunk`](CharReader::next_chunk)
//! calls. Pushback is bounded to one character and must not cross a chunk
//! boundary.
#![allow(clippy::inline_always)]

use crate::error::{Error, Result};
use crate::supplier::{ChunkSupplier, OnceSupplier};

#[derive(Debug)]
pub struct CharReader<S> {
    supplier: S,
    chunk: Option<Vec<char>>,
    pos: usize,
    done: bool,
}

impl CharReader<OnceSupplier> {
    /// Reader over an in-memory string as a single chunk.
    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub fn from_str(data: &str) -> Self {
        let mut chars: Vec<char> = data.chars().collect();
        let chunk = if chars.is_empty() {
            None
        } else {
            chars.shrink_to_fit();
            Some(chars)
        };
        Self {
            supplier: OnceSupplier::new(Vec::new()),
            done: chunk.is_none(),
            chunk,
            pos: 0,
        }
    }
}

impl<S: ChunkSupplier> CharReader<S> {
    /// Pulls the first chunk eagerly, like reading ahead one buffer.
    pub fn new(mut supplier: S) -> Result<Self> {
        let chunk = supplier.next_chunk(None)?;
        Ok(Self {
            supplier,
            done: chunk.is_none(),
            chunk,
            pos: 0,
        })
    }

    /// The current chunk, or `None` at end of stream.
    #[inline(always)]
    #[must_use]
    pub fn chunk(&self) -> Option<&[char]> {
        self.chunk.as_deref()
    }

    #[inline(always)]
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Moves the read position within the current chunk.
    /// `pos == chunk.len()` is permitted transiently until the next
    /// [`next_chunk`](CharReader::next_chunk).
    #[inline(always)]
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos;
    }

    #[inline(always)]
    #[must_use]
    pub fn remaining(&self) -> usize {
        match &self.chunk {
            Some(c) => c.len() - self.pos,
            None => 0,
        }
    }

    #[inline(always)]
    #[must_use]
    pub fn eof(&self) -> bool {
        self.chunk.is_none()
    }

    /// Advances to the next chunk, recycling the spent one through the
    /// supplier. Sets end-of-stream when the supplier returns none.
    pub fn next_chunk(&mut self) -> Result<Option<&[char]>> {
        let spent = self.chunk.take();
        if self.done {
            self.pos = 0;
            return Ok(None);
        }
        match self.supplier.next_chunk(spent)? {
            Some(chunk) => {
                self.chunk = Some(chunk);
                self.pos = 0;
                Ok(self.chunk.as_deref())
            }
            None => {
                self.done = true;
                self.pos = 0;
                Ok(None)
            }
        }
    }

    /// The next character, or `None` at end of stream.
    #[inline]
    pub fn read(&mut self) -> Result<Option<char>> {
        loop {
            if let Some(chunk) = &self.chunk {
                if self.pos < chunk.len() {
                    let c = chunk[self.pos];
                    self.pos += 1;
                    return Ok(Some(c));
                }
            } else {
                return Ok(None);
            }
            self.next_chunk()?;
        }
    }

    /// Sets the position, then reads. The CRLF / escaped-quote lookahead
    /// helper: reading may roll into the next chunk.
    #[inline]
    pub fn read_from(&mut self, pos: usize) -> Result<Option<char>> {
        self.pos = pos;
        self.read()
    }

    /// Fills `dst` exactly, or returns `false` when fewer characters
    /// remain in the stream. Never delivers a short count.
    pub fn read_exact(&mut self, dst: &mut [char]) -> Result<bool> {
        let mut off = 0;
        while off < dst.len() {
            let Some(chunk) = &self.chunk else {
                return Ok(false);
            };
            let n = (chunk.len() - self.pos).min(dst.len() - off);
            if n > 0 {
                dst[off..off + n].copy_from_slice(&chunk[self.pos..self.pos + n]);
                self.pos += n;
                off += n;
            }
            if off < dst.len() {
                self.next_chunk()?;
            }
        }
        Ok(true)
    }

    /// Revokes the last single character read.
    ///
    /// Pushing back past the start of the current chunk is a programming
    /// error and reported as [`Error::Usage`].
    #[inline]
    pub fn pushback(&mut self) -> Result<()> {
        if self.pos == 0 || self.chunk.is_none() {
            return Err(Error::Usage("pushback across a chunk boundary"));
        }
        self.pos -= 1;
        Ok(())
    }

    /// Skips whitespace and returns the first non-whitespace character
    /// consumed, or `None` when the stream ends first.
    pub fn eat_whitespace(&mut self) -> Result<Option<char>> {
        loop {
            let mut found = None;
            if let Some(chunk) = &self.chunk {
                let len = chunk.len();
                let mut pos = self.pos;
                while pos < len && chunk[pos].is_whitespace() {
                    pos += 1;
                }
                if pos < len {
                    found = Some((chunk[pos], pos + 1));
                }
            } else {
                return Ok(None);
            }
            match found {
                Some((c, next)) => {
                    self.pos = next;
                    return Ok(Some(c));
                }
                None => {
                    self.next_chunk()?;
                }
            }
        }
    }

    /// Closes the underlying supplier.
    pub fn close(&mut self) -> Result<()> {
        self.done = true;
        self.chunk = None;
        self.supplier.close()
    }
}
