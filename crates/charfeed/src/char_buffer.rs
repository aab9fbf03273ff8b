//! Growable character scratchpad used by the tokenizers.
//!
//! A [`CharBuffer`] accumulates the decoded text of one field or string
//! literal and realizes it as a shared `Arc<str>`, optionally trimming
//! surrounding whitespace and mapping post-trim empty content to `None`.
#![allow(clippy::inline_always)]

use std::sync::Arc;

use crate::canonical::CanonicalStrings;

#[derive(Debug)]
pub struct CharBuffer {
    buf: Vec<char>,
    trim_leading: bool,
    trim_trailing: bool,
    nil_empty: bool,
}

impl CharBuffer {
    #[must_use]
    pub fn new(trim_leading: bool, trim_trailing: bool, nil_empty: bool) -> Self {
        Self {
            buf: Vec::with_capacity(32),
            trim_leading,
            trim_trailing,
            nil_empty,
        }
    }

    /// A buffer with no trimming and no empty-to-nil mapping.
    #[must_use]
    pub fn plain() -> Self {
        Self::new(false, false, false)
    }

    #[inline(always)]
    pub fn push(&mut self, c: char) {
        self.buf.push(c);
    }

    /// Appends `chunk[start..end]`.
    #[inline(always)]
    pub fn push_range(&mut self, chunk: &[char], start: usize, end: usize) {
        if start < end {
            self.buf.extend_from_slice(&chunk[start..end]);
        }
    }

    pub fn push_str(&mut self, s: &str) {
        self.buf.extend(s.chars());
    }

    /// Resets the logical length; capacity is retained.
    #[inline(always)]
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    #[inline(always)]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline(always)]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[char] {
        &self.buf
    }

    /// Realizes the accumulated content as a string.
    ///
    /// Leading/trailing whitespace is dropped per the buffer's trim flags,
    /// and `None` is returned when the post-trim content is empty and the
    /// buffer was configured nil-on-empty. When `table` is supplied the
    /// resulting string is interned through it.
    pub fn build(&self, table: Option<&mut CanonicalStrings>) -> Option<Arc<str>> {
        let mut start = 0;
        let mut end = self.buf.len();
        if self.trim_leading {
            while start < end && self.buf[start].is_whitespace() {
                start += 1;
            }
        }
        if self.trim_trailing {
            while end > start && self.buf[end - 1].is_whitespace() {
                end -= 1;
            }
        }
        if start == end {
            if self.nil_empty {
                return None;
            }
            return Some(Arc::from(""));
        }
        Some(make_str(&self.buf[start..end], table))
    }

    /// Fast path for content that lies entirely in an external chunk.
    ///
    /// When the buffer is empty the string is built (or interned) straight
    /// from `chunk[start..end]` without copying; otherwise the range is
    /// appended and the buffer realized as usual.
    pub fn build_from(
        &mut self,
        chunk: &[char],
        start: usize,
        end: usize,
        table: Option<&mut CanonicalStrings>,
    ) -> Option<Arc<str>> {
        if self.buf.is_empty() {
            Some(make_str(&chunk[start..end], table))
        } else {
            self.push_range(chunk, start, end);
            self.build(table)
        }
    }
}

#[inline]
fn make_str(chars: &[char], table: Option<&mut CanonicalStrings>) -> Arc<str> {
    match table {
        Some(t) => t.intern(chars),
        None => chars.iter().collect::<String>().into(),
    }
}
