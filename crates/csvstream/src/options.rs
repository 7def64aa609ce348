#![allow(clippy::struct_excessive_bools)]

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Smallest chunk size a [`ByteSource`](crate::ByteSource) will allocate.
pub const MIN_BUFFER_SIZE: usize = 8;

/// Chunk size used when none is configured.
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Configuration options for the CSV reader.
///
/// # Examples
///
/// ```rust
/// use csvstream::{Reader, ReaderOptions};
///
/// let options = ReaderOptions {
///     has_header_row: true,
///     trim_fields: true,
///     ..Default::default()
/// };
/// let mut reader = Reader::from_slice(b"id, name\n1, alice\n", options).unwrap();
/// let row = reader.next_row().unwrap().unwrap();
/// assert_eq!(row.get_by_name("name"), Some("alice"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReaderOptions {
    /// Whether the first row of the input names the columns.
    ///
    /// When `true`, the first row is consumed as the [`Header`](crate::Header)
    /// and every following row supports lookup by column name. An input with
    /// no rows at all then fails with
    /// [`CannotReadHeaderRow`](crate::CsvError::CannotReadHeaderRow).
    ///
    /// # Default
    ///
    /// `false`
    pub has_header_row: bool,

    /// Whether to strip whitespace around fields.
    ///
    /// Leading and trailing characters from [`whitespace`](Self::whitespace)
    /// are removed outside of quotes. Whitespace inside a quoted field is
    /// always kept verbatim.
    ///
    /// # Default
    ///
    /// `false`
    pub trim_fields: bool,

    /// The field separator.
    ///
    /// Must differ from [`quote`](Self::quote) and must not be `\r` or `\n`;
    /// line breaks always end a row, so such a delimiter never matches and
    /// the input is read as one field per line.
    ///
    /// # Default
    ///
    /// `b','`
    pub delimiter: u8,

    /// The quote character.
    ///
    /// Must differ from [`delimiter`](Self::delimiter). A field starting
    /// with a character equal to both is read as quoted.
    ///
    /// # Default
    ///
    /// `b'"'`
    pub quote: u8,

    /// Characters considered whitespace when trimming.
    ///
    /// The delimiter, the quote, `\r` and `\n` are never treated as
    /// whitespace, even if listed here.
    ///
    /// # Default
    ///
    /// Space, horizontal tab and no-break space (U+00A0).
    pub whitespace: Vec<char>,

    /// Size of the chunk read from the underlying source in one call.
    ///
    /// Values below [`MIN_BUFFER_SIZE`] are raised to it.
    ///
    /// # Default
    ///
    /// [`DEFAULT_BUFFER_SIZE`]
    pub buffer_size: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            has_header_row: false,
            trim_fields: false,
            delimiter: b',',
            quote: b'"',
            whitespace: vec![' ', '\t', '\u{00A0}'],
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl ReaderOptions {
    /// Options for tab-separated input.
    #[must_use]
    pub fn tsv() -> Self {
        Self {
            delimiter: b'\t',
            ..Self::default()
        }
    }

    pub(crate) fn effective_buffer_size(&self) -> usize {
        self.buffer_size.max(MIN_BUFFER_SIZE)
    }
}

/// Line terminator emitted by the [`Writer`](crate::Writer).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Newline {
    /// `\n`
    #[default]
    Lf,
    /// `\r\n`
    CrLf,
}

impl Newline {
    /// The bytes of this terminator.
    #[must_use]
    pub const fn as_bytes(self) -> &'static [u8] {
        match self {
            Newline::Lf => b"\n",
            Newline::CrLf => b"\r\n",
        }
    }
}

/// Configuration options for the CSV writer.
///
/// # Default
///
/// Comma-delimited, `"`-quoted, `\n`-terminated, no byte-order mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WriterOptions {
    /// The field separator.
    ///
    /// # Default
    ///
    /// `b','`
    pub delimiter: u8,

    /// The quote character.
    ///
    /// # Default
    ///
    /// `b'"'`
    pub quote: u8,

    /// The row separator.
    ///
    /// # Default
    ///
    /// [`Newline::Lf`]
    pub newline: Newline,

    /// Whether to start the output with a UTF-8 byte-order mark.
    ///
    /// # Default
    ///
    /// `false`
    pub write_bom: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            newline: Newline::Lf,
            write_bom: false,
        }
    }
}

impl WriterOptions {
    /// Options for tab-separated output.
    #[must_use]
    pub fn tsv() -> Self {
        Self {
            delimiter: b'\t',
            ..Self::default()
        }
    }
}
