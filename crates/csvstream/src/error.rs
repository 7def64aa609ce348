use std::{io, path::PathBuf};

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = CsvError> = core::result::Result<T, E>;

/// Errors produced while reading or writing CSV.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CsvError {
    /// The file backing a source could not be opened.
    #[error("cannot open {}: {source}", path.display())]
    CannotOpenSource {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
    /// The underlying reader failed. The source is closed afterwards.
    #[error("read failure: {0}")]
    ReadFailure(#[source] io::Error),
    /// The input is not valid UTF-8.
    #[error("invalid UTF-8 sequence at byte {offset}")]
    InvalidUtf8 {
        /// Byte offset of the first byte of the malformed sequence.
        offset: u64,
    },
    /// A header row was requested but the input holds no rows.
    #[error("cannot read header row: input is empty")]
    CannotReadHeaderRow,
    /// Content after a closing quote that is neither a delimiter, a newline
    /// nor the end of input.
    #[error("invalid character {found:?} after closing quote at {line}:{column}")]
    InvalidFormat {
        /// 1-based line of the offending character.
        line: u64,
        /// 1-based column of the offending character.
        column: u64,
        /// The offending character.
        found: char,
    },
    /// The sink rejected a write.
    #[error("write failure: {0}")]
    WriteFailure(#[source] io::Error),
}
