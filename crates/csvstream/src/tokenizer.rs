//! Field tokenizer.
//!
//! Turns a character stream into fields, one call at a time. Each field
//! reports how it ended (delimiter, newline, end of input) so the caller can
//! tell whether the row continues.
//!
//! Grammar notes
//! - A field starting with the quote character is quoted: delimiters, `CR`
//!   and `LF` are literal inside it and a doubled quote stands for one quote.
//! - After a closing quote only a delimiter, a newline or the end of input
//!   may follow (whitespace too, when trimming).
//! - `CR`, `LF` and `CR LF` all end a row. After a `CR`, a following
//!   character other than `LF` is pushed back and starts the next field.
//! - An unterminated quoted field runs to the end of input.

use crate::{
    chars::{CharReader, Position},
    error::{CsvError, Result},
    options::ReaderOptions,
    source::ByteStream,
};

/// One field and the way it ended.
///
/// The text borrows from the tokenizer's field buffer and is valid until the
/// next call to [`Tokenizer::parse_field`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field<'a> {
    /// Followed by a delimiter; the row continues.
    ByDelimiter(&'a str),
    /// Followed by a newline; the row is complete.
    ByNewline(&'a str),
    /// Followed by the end of input; the row is complete.
    ByEndOfInput(&'a str),
    /// The input ended before a field started.
    EmptyInput,
}

impl<'a> Field<'a> {
    /// The field text, or `None` for [`Field::EmptyInput`].
    #[must_use]
    pub fn text(self) -> Option<&'a str> {
        match self {
            Field::ByDelimiter(text) | Field::ByNewline(text) | Field::ByEndOfInput(text) => {
                Some(text)
            }
            Field::EmptyInput => None,
        }
    }

    /// Whether this field closes its row.
    #[must_use]
    pub fn ends_row(self) -> bool {
        !matches!(self, Field::ByDelimiter(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    Delimiter,
    Newline,
    EndOfInput,
}

/// Splits a [`ByteStream`] into fields.
#[derive(Debug)]
pub struct Tokenizer<S> {
    chars: CharReader<S>,
    buffer: String,
    delimiter: char,
    quote: char,
    trim: bool,
    whitespace: Vec<char>,
}

impl<S: ByteStream> Tokenizer<S> {
    /// Creates a tokenizer reading from `source`.
    ///
    /// The delimiter, the quote, `CR` and `LF` are removed from the
    /// whitespace set, so trimming never swallows a field or row boundary.
    pub fn new(source: S, options: &ReaderOptions) -> Self {
        let delimiter = char::from(options.delimiter);
        let quote = char::from(options.quote);
        let mut whitespace = options.whitespace.clone();
        whitespace.retain(|&c| !matches!(c, '\r' | '\n') && c != delimiter && c != quote);
        Self {
            chars: CharReader::new(source),
            buffer: String::new(),
            delimiter,
            quote,
            trim: options.trim_fields,
            whitespace,
        }
    }

    /// Reads the next field.
    ///
    /// # Errors
    ///
    /// Propagates source and decoding errors, and returns
    /// [`CsvError::InvalidFormat`] for a character after a closing quote that
    /// cannot end the field. A partially read field is discarded.
    pub fn parse_field(&mut self) -> Result<Field<'_>> {
        self.buffer.clear();

        let Some(mut ch) = self.chars.read()? else {
            return Ok(Field::EmptyInput);
        };
        if self.trim {
            while self.is_whitespace(ch) {
                match self.chars.read()? {
                    Some(next) => ch = next,
                    None => return Ok(Field::ByEndOfInput("")),
                }
            }
        }

        let (boundary, len) = if ch == self.quote {
            (self.quoted()?, self.buffer.len())
        } else {
            self.chars.push_back(ch);
            self.unquoted()?
        };

        let text = &self.buffer[..len];
        Ok(match boundary {
            Boundary::Delimiter => Field::ByDelimiter(text),
            Boundary::Newline => Field::ByNewline(text),
            Boundary::EndOfInput => Field::ByEndOfInput(text),
        })
    }

    /// Position of the next unread character.
    pub fn position(&self) -> Position {
        self.chars.position()
    }

    /// The underlying byte source.
    pub fn source(&self) -> &S {
        self.chars.source()
    }

    #[inline]
    fn is_whitespace(&self, ch: char) -> bool {
        self.whitespace.contains(&ch)
    }

    /// Reads a quoted field body; the opening quote is already consumed.
    fn quoted(&mut self) -> Result<Boundary> {
        loop {
            let Some(ch) = self.chars.read()? else {
                return Ok(Boundary::EndOfInput);
            };
            if ch != self.quote {
                self.buffer.push(ch);
                continue;
            }

            let mut next = self.chars.read()?;
            if next == Some(self.quote) {
                self.buffer.push(ch);
                continue;
            }
            if self.trim {
                while next.is_some_and(|c| self.is_whitespace(c)) {
                    next = self.chars.read()?;
                }
            }
            return match next {
                None => Ok(Boundary::EndOfInput),
                Some('\n') => Ok(Boundary::Newline),
                Some('\r') => {
                    self.skip_lf()?;
                    Ok(Boundary::Newline)
                }
                Some(c) if c == self.delimiter => Ok(Boundary::Delimiter),
                Some(found) => {
                    let at = self.chars.last_position();
                    Err(CsvError::InvalidFormat {
                        line: at.line,
                        column: at.column,
                        found,
                    })
                }
            };
        }
    }

    /// Reads an unquoted field. Returns the boundary and the length of the
    /// text to keep, which excludes trailing whitespace when trimming.
    fn unquoted(&mut self) -> Result<(Boundary, usize)> {
        let mut keep = 0;
        loop {
            let boundary = match self.chars.read()? {
                None => Boundary::EndOfInput,
                Some('\n') => Boundary::Newline,
                Some('\r') => {
                    self.skip_lf()?;
                    Boundary::Newline
                }
                Some(c) if c == self.delimiter => Boundary::Delimiter,
                Some(c) => {
                    self.buffer.push(c);
                    if !(self.trim && self.is_whitespace(c)) {
                        keep = self.buffer.len();
                    }
                    continue;
                }
            };
            return Ok((boundary, keep));
        }
    }

    /// Consumes the `LF` of a `CR LF` pair; anything else is pushed back.
    fn skip_lf(&mut self) -> Result<()> {
        if let Some(ch) = self.chars.read()? {
            if ch != '\n' {
                self.chars.push_back(ch);
            }
        }
        Ok(())
    }
}
