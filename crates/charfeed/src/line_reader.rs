//! Line-normalizing reader front-end.
//!
//! [`LineNumberReader`] sits between a [`CharSource`] and the chunk
//! suppliers, rewriting CR and CRLF line terminators to a single LF while
//! maintaining 1-based line/column coordinates. Normalization happens in
//! place during buffer refill; a lone CR at the end of a buffer peeks one
//! character ahead to decide whether a following LF must be swallowed.

use std::io;

use crate::error::{Error, Result};
use crate::supplier::CharSource;

const DEFAULT_BUFFER_LEN: usize = 2048;

#[derive(Debug)]
pub struct LineNumberReader<S> {
    source: S,
    buf: Vec<char>,
    pos: usize,
    len: usize,
    eof: bool,
    /// Non-newline character captured by the lone-CR lookahead.
    carry: Option<char>,
    line: usize,
    column: usize,
    last_column: usize,
}

impl<S: CharSource> LineNumberReader<S> {
    #[must_use]
    pub fn new(source: S) -> Self {
        Self::with_buffer_len(source, DEFAULT_BUFFER_LEN)
    }

    #[must_use]
    pub fn with_buffer_len(source: S, buffer_len: usize) -> Self {
        Self {
            source,
            buf: vec!['\0'; buffer_len.max(2)],
            pos: 0,
            len: 0,
            eof: false,
            carry: None,
            line: 1,
            column: 1,
            last_column: 0,
        }
    }

    /// 1-based line of the next character to be read.
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }

    /// 1-based column of the next character to be read.
    #[must_use]
    pub fn column(&self) -> usize {
        self.column
    }

    #[inline]
    fn update(&mut self, c: char) -> char {
        if c == '\n' {
            self.line += 1;
            self.last_column = self.column;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    /// Refills and compacts the buffer. Returns `false` at end of stream.
    fn fill(&mut self) -> Result<bool> {
        if self.eof {
            return Ok(false);
        }
        if self.pos < self.len {
            return Ok(true);
        }
        let cap = self.buf.len();
        let mut start = 0;
        if let Some(c) = self.carry.take() {
            self.buf[0] = c;
            start = 1;
        }
        // One slot is held back so the lookahead character fits.
        let n = self.source.read_chars(&mut self.buf[start..cap - 1])?;
        let total = start + n;
        if total == 0 {
            self.eof = true;
            return Ok(false);
        }
        let mut writepos = 0;
        let mut cret = false;
        for idx in 0..total {
            let c = self.buf[idx];
            match c {
                '\r' => {
                    if cret {
                        self.buf[writepos] = '\n';
                        writepos += 1;
                    }
                    cret = true;
                }
                '\n' => {
                    cret = false;
                    self.buf[writepos] = '\n';
                    writepos += 1;
                }
                _ => {
                    if cret {
                        self.buf[writepos] = '\n';
                        writepos += 1;
                        cret = false;
                    }
                    self.buf[writepos] = c;
                    writepos += 1;
                }
            }
        }
        if cret {
            self.buf[writepos] = '\n';
            writepos += 1;
            // Lone CR at the buffer end: peek the next character so a
            // following LF collapses into the newline just written.
            let mut one = ['\0'];
            if self.source.read_chars(&mut one)? > 0 && one[0] != '\n' {
                self.carry = Some(one[0]);
            }
        }
        self.len = writepos;
        self.pos = 0;
        Ok(true)
    }

    /// The next normalized character, or `None` repeatedly at end of
    /// stream.
    pub fn read(&mut self) -> Result<Option<char>> {
        if !self.fill()? {
            return Ok(None);
        }
        let c = self.buf[self.pos];
        self.pos += 1;
        Ok(Some(self.update(c)))
    }

    /// Steps back over the last character read, restoring the previous
    /// line/column (a pushed-back LF restores the prior column).
    ///
    /// Pushback after end of stream is a silent no-op; more than one step
    /// back is a usage error.
    pub fn unread(&mut self) -> Result<()> {
        if self.eof {
            return Ok(());
        }
        if self.pos == 0 || self.len == 0 {
            return Err(Error::Usage("too many unread ops"));
        }
        self.pos -= 1;
        if self.buf[self.pos] == '\n' {
            self.line -= 1;
            self.column = self.last_column;
        } else {
            self.column -= 1;
        }
        Ok(())
    }

    /// The current normalized buffer contents, refilling as needed;
    /// `None` at end of stream. Suppliers lift whole chunks out through
    /// this together with [`position`](Self::position) /
    /// [`set_position`](Self::set_position).
    pub fn buffer(&mut self) -> Result<Option<&[char]>> {
        if !self.fill()? {
            return Ok(None);
        }
        Ok(Some(&self.buf[..self.len]))
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos;
    }
}

impl<S: CharSource> CharSource for LineNumberReader<S> {
    fn read_chars(&mut self, dst: &mut [char]) -> io::Result<usize> {
        let filled = self
            .fill()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        if !filled {
            return Ok(0);
        }
        let n = (self.len - self.pos).min(dst.len());
        dst[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        for i in 0..n {
            self.update(dst[i]);
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supplier::StringCharSource;

    fn drain(input: &str, buffer_len: usize) -> String {
        let mut r = LineNumberReader::with_buffer_len(StringCharSource::new(input), buffer_len);
        let mut out = String::new();
        while let Some(c) = r.read().unwrap() {
            out.push(c);
        }
        out
    }

    #[test]
    fn normalizes_all_terminators() {
        for buflen in [2, 3, 5, 64] {
            assert_eq!(drain("a\rb\nc\r\nd", buflen), "a\nb\nc\nd");
            assert_eq!(drain("\r\r\n\n", buflen), "\n\n\n");
            assert_eq!(drain("x\r", buflen), "x\n");
        }
    }

    #[test]
    fn crlf_split_across_refills() {
        // Buffer length 2 reads one char at a time past the held-back
        // slot, so the CR lands exactly at a buffer end.
        assert_eq!(drain("ab\r\ncd", 2), "ab\ncd");
    }

    #[test]
    fn tracks_line_and_column() {
        let mut r = LineNumberReader::new(StringCharSource::new("ab\ncd"));
        assert_eq!((r.line(), r.column()), (1, 1));
        r.read().unwrap(); // a
        r.read().unwrap(); // b
        assert_eq!((r.line(), r.column()), (1, 3));
        r.read().unwrap(); // \n
        assert_eq!((r.line(), r.column()), (2, 1));
        r.read().unwrap(); // c
        assert_eq!((r.line(), r.column()), (2, 2));
    }

    #[test]
    fn unread_restores_coordinates() {
        let mut r = LineNumberReader::new(StringCharSource::new("a\nb"));
        r.read().unwrap();
        assert_eq!(r.read().unwrap(), Some('\n'));
        assert_eq!((r.line(), r.column()), (2, 1));
        r.unread().unwrap();
        assert_eq!((r.line(), r.column()), (1, 2));
        assert_eq!(r.read().unwrap(), Some('\n'));
    }

    #[test]
    fn unread_at_eos_is_noop() {
        let mut r = LineNumberReader::new(StringCharSource::new("a"));
        r.read().unwrap();
        assert_eq!(r.read().unwrap(), None);
        r.unread().unwrap();
        assert_eq!(r.read().unwrap(), None);
    }

    #[test]
    fn unread_before_any_read_is_usage_error() {
        let mut r = LineNumberReader::new(StringCharSource::new("a"));
        assert!(matches!(r.unread(), Err(Error::Usage(_))));
    }
}
