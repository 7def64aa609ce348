//! A streaming CSV tokenizer and writer.
//!
//! The reader pulls bytes from a [`ByteStream`] (any [`std::io::Read`], a file
//! path, a byte slice or a byte iterator), decodes UTF-8, skips a leading
//! byte-order mark and splits the text into rows of fields:
//!
//! - Fields are separated by a configurable delimiter and may be quoted;
//!   quoted fields can hold delimiters, line breaks and doubled quotes.
//! - Rows end at `LF`, `CR` or `CR LF`.
//! - Whitespace around fields can be trimmed outside of quotes.
//! - An optional header row enables lookup by column name.
//!
//! The [`Writer`] is the mirror image: it quotes a field exactly when the
//! grammar requires it, so its output reads back to the same fields.
//!
//! ```rust
//! use csvstream::{Reader, ReaderOptions, Writer, WriterOptions};
//!
//! let options = ReaderOptions {
//!     has_header_row: true,
//!     ..Default::default()
//! };
//! let mut reader = Reader::from_slice(b"id,name\n001,hoge\n002,fuga", options).unwrap();
//! let mut writer = Writer::new(Vec::new(), WriterOptions::default());
//! for row in reader.by_ref() {
//!     let row = row.unwrap();
//!     writer.write_row([row.get_by_name("name").unwrap(), &row[0]]).unwrap();
//! }
//! assert_eq!(writer.into_inner(), b"hoge,001\nfuga,002");
//! ```
//!
//! Sessions are single-threaded and pull-based: nothing is read until a row
//! is requested, and dropping a reader releases its source.

mod chars;
mod error;
mod options;
mod reader;
mod row;
mod source;
mod tokenizer;
mod writer;

#[cfg(test)]
mod tests;

pub use chars::Position;
pub use error::{CsvError, Result};
pub use options::{DEFAULT_BUFFER_SIZE, MIN_BUFFER_SIZE, Newline, ReaderOptions, WriterOptions};
pub use reader::Reader;
pub use row::{Header, Row};
pub use source::{ByteSource, ByteStream, IterSource, SliceSource, UTF8_BOM};
pub use tokenizer::{Field, Tokenizer};
pub use writer::Writer;
