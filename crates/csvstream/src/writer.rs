//! CSV output.
//!
//! Separators are written lazily: a field writes the newline or delimiter
//! that precedes it, so nothing trails the last field of the output.

use std::io::Write;

use crate::{
    error::{CsvError, Result},
    options::WriterOptions,
    source::UTF8_BOM,
};

/// Writes rows of fields to an [`io::Write`](std::io::Write) sink.
///
/// ```rust
/// use csvstream::{Writer, WriterOptions};
///
/// let mut writer = Writer::new(Vec::new(), WriterOptions::default());
/// writer.write_row(["id", "quote"]).unwrap();
/// writer.write_row(["1", "he said \"hi\""]).unwrap();
/// assert_eq!(writer.into_inner(), b"id,quote\n1,\"he said \"\"hi\"\"\"");
/// ```
#[derive(Debug)]
pub struct Writer<W: Write> {
    sink: W,
    delimiter: char,
    quote: char,
    newline: &'static [u8],
    bom_pending: bool,
    is_first_row: bool,
    is_first_field_in_row: bool,
    scratch: Vec<u8>,
}

impl<W: Write> Writer<W> {
    /// Creates a writer over `sink`.
    pub fn new(sink: W, options: WriterOptions) -> Self {
        Self {
            sink,
            delimiter: char::from(options.delimiter),
            quote: char::from(options.quote),
            newline: options.newline.as_bytes(),
            bom_pending: options.write_bom,
            is_first_row: true,
            is_first_field_in_row: true,
            scratch: Vec::new(),
        }
    }

    /// Starts a new row. The next field is written on a new line unless no
    /// field has been written yet.
    pub fn begin_row(&mut self) {
        self.is_first_field_in_row = true;
    }

    /// Writes one field.
    ///
    /// `quoted` forces quoting on or off; `None` quotes only when the text
    /// contains the quote, the delimiter, `CR` or `LF`, or when it opens the
    /// output with U+FEFF and no byte-order mark precedes it. Quote characters in
    /// quoted text are doubled.
    ///
    /// # Errors
    ///
    /// Returns [`CsvError::WriteFailure`] if the sink fails. The field is
    /// handed to the sink in a single `write_all` call.
    pub fn write_field(&mut self, text: impl AsRef<str>, quoted: Option<bool>) -> Result<()> {
        let text = text.as_ref();
        self.scratch.clear();
        if self.bom_pending {
            self.scratch.extend_from_slice(UTF8_BOM);
        }
        if self.is_first_field_in_row {
            if !self.is_first_row {
                self.scratch.extend_from_slice(self.newline);
            }
        } else {
            push_char(&mut self.scratch, self.delimiter);
        }

        let at_start = self.is_first_row && self.is_first_field_in_row && !self.bom_pending;
        if quoted.unwrap_or_else(|| self.needs_quotes(text, at_start)) {
            push_char(&mut self.scratch, self.quote);
            for ch in text.chars() {
                if ch == self.quote {
                    push_char(&mut self.scratch, ch);
                }
                push_char(&mut self.scratch, ch);
            }
            push_char(&mut self.scratch, self.quote);
        } else {
            self.scratch.extend_from_slice(text.as_bytes());
        }

        self.sink
            .write_all(&self.scratch)
            .map_err(CsvError::WriteFailure)?;
        self.bom_pending = false;
        self.is_first_row = false;
        self.is_first_field_in_row = false;
        Ok(())
    }

    /// Starts a row and writes `fields` into it with automatic quoting.
    ///
    /// # Errors
    ///
    /// Stops at the first field the sink rejects.
    pub fn write_row<I>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.begin_row();
        for field in fields {
            self.write_field(field, None)?;
        }
        Ok(())
    }

    /// Flushes the sink.
    ///
    /// # Errors
    ///
    /// Returns [`CsvError::WriteFailure`] if the sink fails.
    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush().map_err(CsvError::WriteFailure)
    }

    /// The sink.
    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Consumes the writer, returning the sink.
    pub fn into_inner(self) -> W {
        self.sink
    }

    /// A leading U+FEFF at the very start of the output would be read back
    /// as a byte-order mark, so it is quoted there.
    fn needs_quotes(&self, text: &str, at_start: bool) -> bool {
        (at_start && text.starts_with('\u{FEFF}'))
            || text
                .chars()
                .any(|c| c == self.quote || c == self.delimiter || c == '\r' || c == '\n')
    }
}

#[inline]
fn push_char(buf: &mut Vec<u8>, ch: char) {
    let mut tmp = [0u8; 4];
    buf.extend_from_slice(ch.encode_utf8(&mut tmp).as_bytes());
}
