//! CSV row writing.
//!
//! One row per call, with per-field quoting decided by a predicate. The
//! default predicate quotes only when necessary (the field contains CR,
//! LF, the separator, or the quote character) and prefilters on the
//! min/max of those four characters so fields of ordinary text skip the
//! four-way comparison entirely. Embedded quotes are escaped by
//! doubling.

use std::io;
use std::sync::Arc;

use crate::error::Result;

/// Newline style appended after each row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Newline {
    #[default]
    Lf,
    Cr,
    CrLf,
}

impl Newline {
    #[must_use]
    fn as_str(self) -> &'static str {
        match self {
            Newline::Lf => "\n",
            Newline::Cr => "\r",
            Newline::CrLf => "\r\n",
        }
    }
}

/// When to wrap a field in quotes.
#[derive(Debug, Clone, Copy, Default)]
pub enum QuotePolicy {
    /// Quote only fields containing CR, LF, the separator, or the quote.
    #[default]
    Minimal,
    /// Quote every field.
    Always,
    /// Caller-supplied predicate.
    Custom(fn(&str) -> bool),
}

#[derive(Debug, Clone)]
pub struct CsvWriteOptions {
    pub separator: char,
    pub quote: char,
    pub newline: Newline,
    pub quote_policy: QuotePolicy,
}

impl Default for CsvWriteOptions {
    fn default() -> Self {
        Self {
            separator: ',',
            quote: '"',
            newline: Newline::Lf,
            quote_policy: QuotePolicy::Minimal,
        }
    }
}

/// Anything writable as one CSV field. `None` (a nil field) writes as
/// empty.
pub trait CsvField {
    fn as_field(&self) -> Option<&str>;
}

impl CsvField for str {
    fn as_field(&self) -> Option<&str> {
        Some(self)
    }
}

impl CsvField for String {
    fn as_field(&self) -> Option<&str> {
        Some(self)
    }
}

impl CsvField for Arc<str> {
    fn as_field(&self) -> Option<&str> {
        Some(self)
    }
}

impl<T: CsvField> CsvField for Option<T> {
    fn as_field(&self) -> Option<&str> {
        self.as_ref().and_then(CsvField::as_field)
    }
}

impl<T: CsvField + ?Sized> CsvField for &T {
    fn as_field(&self) -> Option<&str> {
        (**self).as_field()
    }
}

pub struct CsvWriter<W> {
    w: W,
    opts: CsvWriteOptions,
    scratch: String,
    min_critical: char,
    max_critical: char,
}

impl<W: io::Write> CsvWriter<W> {
    #[must_use]
    pub fn new(w: W, options: CsvWriteOptions) -> Self {
        let min_critical = '\r'.min('\n').min(options.separator).min(options.quote);
        let max_critical = '\r'.max('\n').max(options.separator).max(options.quote);
        Self {
            w,
            opts: options,
            scratch: String::new(),
            min_critical,
            max_critical,
        }
    }

    fn needs_quote(&self, field: &str) -> bool {
        match self.opts.quote_policy {
            QuotePolicy::Always => true,
            QuotePolicy::Custom(pred) => pred(field),
            QuotePolicy::Minimal => {
                let (min, max) = (self.min_critical, self.max_critical);
                let (sep, quote) = (self.opts.separator, self.opts.quote);
                field.chars().any(|c| {
                    c >= min && c <= max && (c == '\r' || c == '\n' || c == sep || c == quote)
                })
            }
        }
    }

    fn write_char(&mut self, c: char) -> Result<()> {
        let mut buf = [0u8; 4];
        self.w.write_all(c.encode_utf8(&mut buf).as_bytes())?;
        Ok(())
    }

    fn write_quoted(&mut self, field: &str) -> Result<()> {
        let quote = self.opts.quote;
        self.scratch.clear();
        self.scratch.push(quote);
        for c in field.chars() {
            if c == quote {
                self.scratch.push(quote);
            }
            self.scratch.push(c);
        }
        self.scratch.push(quote);
        self.w.write_all(self.scratch.as_bytes())?;
        Ok(())
    }

    /// Writes one row followed by the configured newline.
    pub fn write_row<I>(&mut self, row: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: CsvField,
    {
        let mut first = true;
        for field in row {
            if !first {
                self.write_char(self.opts.separator)?;
            }
            first = false;
            let text = field.as_field().unwrap_or("");
            if self.needs_quote(text) {
                self.write_quoted(text)?;
            } else {
                self.w.write_all(text.as_bytes())?;
            }
        }
        self.w.write_all(self.opts.newline.as_str().as_bytes())?;
        Ok(())
    }

    /// Streaming row reduction: drains `rows` into the writer without
    /// materializing them, returning the count written. Row-level errors
    /// from an upstream reader abort the reduction.
    pub fn write_rows<R, I>(&mut self, rows: I) -> Result<usize>
    where
        I: IntoIterator<Item = Result<R>>,
        R: IntoIterator,
        R::Item: CsvField,
    {
        let mut n = 0;
        for row in rows {
            self.write_row(row?)?;
            n += 1;
        }
        Ok(n)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.w.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.w
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_one(row: &[&str], options: CsvWriteOptions) -> String {
        let mut w = CsvWriter::new(Vec::new(), options);
        w.write_row(row.iter().copied()).unwrap();
        String::from_utf8(w.into_inner()).unwrap()
    }

    #[test]
    fn quotes_only_when_necessary() {
        assert_eq!(
            write_one(&["a", "b,c", "d\"e", "f\ng", "h"], CsvWriteOptions::default()),
            "a,\"b,c\",\"d\"\"e\",\"f\ng\",h\n"
        );
    }

    #[test]
    fn in_range_noncritical_chars_do_not_quote_or_mask() {
        // '!' and '%' sit between the min and max critical characters but
        // are not critical themselves; a later LF must still trigger.
        assert_eq!(
            write_one(&["a!%b"], CsvWriteOptions::default()),
            "a!%b\n"
        );
        assert_eq!(
            write_one(&["a!%b\nc"], CsvWriteOptions::default()),
            "\"a!%b\nc\"\n"
        );
    }

    #[test]
    fn always_policy_quotes_everything() {
        let options = CsvWriteOptions {
            quote_policy: QuotePolicy::Always,
            ..Default::default()
        };
        assert_eq!(write_one(&["x", ""], options), "\"x\",\"\"\n");
    }

    #[test]
    fn newline_styles() {
        for (nl, expect) in [
            (Newline::Lf, "a\n"),
            (Newline::Cr, "a\r"),
            (Newline::CrLf, "a\r\n"),
        ] {
            let options = CsvWriteOptions {
                newline: nl,
                ..Default::default()
            };
            assert_eq!(write_one(&["a"], options), expect);
        }
    }

    #[test]
    fn custom_separator_participates_in_quoting() {
        let options = CsvWriteOptions {
            separator: ';',
            ..Default::default()
        };
        assert_eq!(write_one(&["a;b", "c,d"], options), "\"a;b\";c,d\n");
    }

    #[test]
    fn nil_fields_write_empty() {
        let mut w = CsvWriter::new(Vec::new(), CsvWriteOptions::default());
        w.write_row([Some("a"), None, Some("c")]).unwrap();
        assert_eq!(String::from_utf8(w.into_inner()).unwrap(), "a,,c\n");
    }
}
