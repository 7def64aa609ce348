//! Row assembly on top of the [`Tokenizer`].

use std::{
    fs::File,
    io::Read,
    iter::FusedIterator,
    path::Path,
    sync::Arc,
};

use log::{debug, trace};

use crate::{
    chars::Position,
    error::{CsvError, Result},
    options::ReaderOptions,
    row::{Header, Row},
    source::{ByteSource, ByteStream, IterSource, SliceSource},
    tokenizer::Tokenizer,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Active,
    Done,
    Failed,
}

/// A lazy, forward-only sequence of [`Row`]s.
///
/// Rows are read one at a time as they are requested. The first error ends
/// the session: it is returned once and no further rows are produced.
///
/// ```rust
/// use csvstream::{Reader, ReaderOptions};
///
/// let input = "abab,\"cd,cd\",efef\nzxcv,asdf,qwer";
/// let rows = Reader::from_slice(input.as_bytes(), ReaderOptions::default())
///     .unwrap()
///     .map(|row| row.unwrap().into_vec())
///     .collect::<Vec<_>>();
/// assert_eq!(rows, vec![vec!["abab", "cd,cd", "efef"], vec!["zxcv", "asdf", "qwer"]]);
/// ```
#[derive(Debug)]
pub struct Reader<S> {
    tokenizer: Tokenizer<S>,
    header: Option<Arc<Header>>,
    state: State,
    rows_read: u64,
}

impl<S: ByteStream> Reader<S> {
    /// Starts a session over `source`.
    ///
    /// # Errors
    ///
    /// With [`ReaderOptions::has_header_row`], the header is read immediately:
    /// an empty source fails with [`CsvError::CannotReadHeaderRow`], and any
    /// error reading the first row is returned as is.
    pub fn new(source: S, options: ReaderOptions) -> Result<Self> {
        let mut reader = Self {
            tokenizer: Tokenizer::new(source, &options),
            header: None,
            state: State::Active,
            rows_read: 0,
        };
        if options.has_header_row {
            let mut names = Vec::new();
            if !reader.pull(&mut names)? {
                return Err(CsvError::CannotReadHeaderRow);
            }
            debug!("read header row with {} columns", names.len());
            reader.header = Some(Arc::new(Header::new(names)));
        }
        Ok(reader)
    }

    /// Reads the next row.
    ///
    /// # Errors
    ///
    /// Returns the first error hit while reading; later calls return
    /// `Ok(None)`.
    pub fn next_row(&mut self) -> Result<Option<Row>> {
        let mut fields = Vec::new();
        if !self.read_fields(&mut fields)? {
            return Ok(None);
        }
        Ok(Some(Row::new(fields, self.header.clone())))
    }

    /// Reads the next row into `fields`, replacing its contents. Returns
    /// `false` once the input is exhausted.
    ///
    /// # Errors
    ///
    /// As [`next_row`](Self::next_row). `fields` is left empty on error.
    pub fn read_fields(&mut self, fields: &mut Vec<String>) -> Result<bool> {
        let more = self.pull(fields)?;
        if more {
            self.rows_read += 1;
            trace!("row {}: {} fields", self.rows_read, fields.len());
        }
        Ok(more)
    }

    /// The header row, if the session has one.
    #[must_use]
    pub fn header(&self) -> Option<&Arc<Header>> {
        self.header.as_ref()
    }

    /// Number of data rows produced so far, header excluded.
    #[must_use]
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Position of the next unread character.
    #[must_use]
    pub fn position(&self) -> Position {
        self.tokenizer.position()
    }

    /// Whether the input started with a UTF-8 byte-order mark.
    #[must_use]
    pub fn bom_detected(&self) -> bool {
        self.tokenizer.source().bom_detected()
    }

    fn pull(&mut self, fields: &mut Vec<String>) -> Result<bool> {
        fields.clear();
        if self.state != State::Active {
            return Ok(false);
        }
        match self.assemble(fields) {
            Ok(true) => Ok(true),
            Ok(false) => {
                debug!("input exhausted after {} rows", self.rows_read);
                self.state = State::Done;
                Ok(false)
            }
            Err(err) => {
                debug!("stopping after error: {err}");
                self.state = State::Failed;
                fields.clear();
                Err(err)
            }
        }
    }

    fn assemble(&mut self, fields: &mut Vec<String>) -> Result<bool> {
        loop {
            let field = self.tokenizer.parse_field()?;
            let Some(text) = field.text() else {
                if fields.is_empty() {
                    return Ok(false);
                }
                // A delimiter right before the end of input.
                fields.push(String::new());
                return Ok(true);
            };
            fields.push(text.to_owned());
            if field.ends_row() {
                return Ok(true);
            }
        }
    }
}

impl<R: Read> Reader<ByteSource<R>> {
    /// Starts a session over any reader.
    ///
    /// # Errors
    ///
    /// See [`Reader::new`].
    pub fn from_reader(reader: R, options: ReaderOptions) -> Result<Self> {
        let source = ByteSource::with_capacity(reader, options.effective_buffer_size());
        Self::new(source, options)
    }
}

impl Reader<ByteSource<File>> {
    /// Starts a session over the file at `path`. The file is opened on the
    /// first read, which happens here if a header row is expected.
    ///
    /// # Errors
    ///
    /// See [`Reader::new`]; a file that cannot be opened is
    /// [`CsvError::CannotOpenSource`].
    pub fn from_path(path: impl AsRef<Path>, options: ReaderOptions) -> Result<Self> {
        let source = ByteSource::from_path(path.as_ref(), options.effective_buffer_size());
        Self::new(source, options)
    }
}

impl<'a> Reader<SliceSource<'a>> {
    /// Starts a session over an in-memory buffer.
    ///
    /// # Errors
    ///
    /// See [`Reader::new`].
    pub fn from_slice(bytes: &'a [u8], options: ReaderOptions) -> Result<Self> {
        Self::new(SliceSource::new(bytes), options)
    }
}

impl<I: Iterator<Item = u8>> Reader<IterSource<I>> {
    /// Starts a session over a byte iterator.
    ///
    /// # Errors
    ///
    /// See [`Reader::new`].
    pub fn from_byte_iter(
        bytes: impl IntoIterator<IntoIter = I>,
        options: ReaderOptions,
    ) -> Result<Self> {
        Self::new(IterSource::new(bytes), options)
    }
}

impl<S: ByteStream> Iterator for Reader<S> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().transpose()
    }
}

impl<S: ByteStream> FusedIterator for Reader<S> {}
