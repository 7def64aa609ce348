//! Byte sources: pull-based, chunked access to raw input.
//!
//! Every source implements [`ByteStream`], the one capability the tokenizer
//! needs: "next byte, end of input, or error". Three adapters are provided:
//!
//! - [`ByteSource`] over any [`io::Read`], refilling a fixed-size chunk with a
//!   single `read` call whenever the chunk is drained. Path-backed sources
//!   open their file on the first pull.
//! - [`SliceSource`] over an in-memory byte slice.
//! - [`IterSource`] over an arbitrary byte iterator.
//!
//! All three skip a leading UTF-8 byte-order mark (`EF BB BF`).
//!
//! Invariants
//! - `pos <= len <= buf.len()` for [`ByteSource`].
//! - A source that reported an error never touches its reader again; every
//!   later pull is end of input.

use std::{
    fmt,
    fs::File,
    io::{self, Read},
    iter::Fuse,
    mem,
    path::PathBuf,
};

use log::debug;

use crate::{
    error::{CsvError, Result},
    options::{DEFAULT_BUFFER_SIZE, MIN_BUFFER_SIZE},
};

/// The UTF-8 encoding of U+FEFF.
pub const UTF8_BOM: &[u8; 3] = b"\xEF\xBB\xBF";

/// A forward-only producer of bytes.
pub trait ByteStream {
    /// Returns the next byte, `Ok(None)` at end of input, or the error that
    /// stopped the source.
    ///
    /// # Errors
    ///
    /// Returns [`CsvError::CannotOpenSource`] or [`CsvError::ReadFailure`]
    /// once; the source behaves as exhausted afterwards.
    fn next_byte(&mut self) -> Result<Option<u8>>;

    /// Offset of the next byte in the raw input, byte-order mark included.
    fn offset(&self) -> u64;

    /// Whether a byte-order mark was found and skipped.
    fn bom_detected(&self) -> bool;
}

impl<S: ByteStream + ?Sized> ByteStream for &mut S {
    fn next_byte(&mut self) -> Result<Option<u8>> {
        (**self).next_byte()
    }

    fn offset(&self) -> u64 {
        (**self).offset()
    }

    fn bom_detected(&self) -> bool {
        (**self).bom_detected()
    }
}

type Opener<R> = Box<dyn FnOnce() -> Result<R> + Send>;

enum Handle<R> {
    Unopened(Opener<R>),
    Open(R),
    Exhausted,
    Failed,
}

impl<R> fmt::Debug for Handle<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Handle::Unopened(_) => "Unopened",
            Handle::Open(_) => "Open",
            Handle::Exhausted => "Exhausted",
            Handle::Failed => "Failed",
        })
    }
}

/// A chunked [`ByteStream`] over an [`io::Read`].
///
/// The underlying reader is dropped as soon as it reports end of input or an
/// error, and otherwise when the source itself is dropped.
#[derive(Debug)]
pub struct ByteSource<R> {
    handle: Handle<R>,
    buf: Vec<u8>,
    pos: usize,
    len: usize,
    offset: u64,
    bom_checked: bool,
    bom: bool,
}

impl<R: Read> ByteSource<R> {
    /// Wraps `reader` with the default chunk size.
    pub fn new(reader: R) -> Self {
        Self::with_capacity(reader, DEFAULT_BUFFER_SIZE)
    }

    /// Wraps `reader`, reading `capacity` bytes at a time (at least
    /// [`MIN_BUFFER_SIZE`]).
    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        Self::from_handle(Handle::Open(reader), capacity)
    }

    fn from_handle(handle: Handle<R>, capacity: usize) -> Self {
        Self {
            handle,
            buf: vec![0; capacity.max(MIN_BUFFER_SIZE)],
            pos: 0,
            len: 0,
            offset: 0,
            bom_checked: false,
            bom: false,
        }
    }

    /// Size of the chunk buffer.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    fn open(&mut self) -> Result<()> {
        if let Handle::Unopened(open) = mem::replace(&mut self.handle, Handle::Failed) {
            // On error the handle stays `Failed`.
            self.handle = Handle::Open(open()?);
        }
        Ok(())
    }

    /// Reads once into `buf[start..]`. Zero means end of input or a latched
    /// source.
    fn read_into(&mut self, start: usize) -> Result<usize> {
        if matches!(self.handle, Handle::Unopened(_)) {
            self.open()?;
        }
        loop {
            let Handle::Open(reader) = &mut self.handle else {
                return Ok(0);
            };
            match reader.read(&mut self.buf[start..]) {
                Ok(0) => {
                    debug!("byte source exhausted after {} bytes", self.offset);
                    self.handle = Handle::Exhausted;
                    return Ok(0);
                }
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => {
                    debug!("byte source failed at byte {}: {err}", self.offset);
                    self.handle = Handle::Failed;
                    self.pos = 0;
                    self.len = 0;
                    return Err(CsvError::ReadFailure(err));
                }
            }
        }
    }

    fn detect_bom(&mut self) -> Result<()> {
        self.bom_checked = true;
        // Stop as soon as the bytes seen so far cannot start a BOM.
        while self.len < UTF8_BOM.len() && UTF8_BOM.starts_with(&self.buf[..self.len]) {
            let n = self.read_into(self.len)?;
            if n == 0 {
                break;
            }
            self.len += n;
        }
        if self.buf[..self.len].starts_with(UTF8_BOM) {
            debug!("skipping UTF-8 byte-order mark");
            self.pos = UTF8_BOM.len();
            self.offset = UTF8_BOM.len() as u64;
            self.bom = true;
        }
        Ok(())
    }
}

impl ByteSource<File> {
    /// A source over the file at `path`, opened on the first pull.
    pub fn from_path(path: impl Into<PathBuf>, capacity: usize) -> Self {
        let path = path.into();
        let open: Opener<File> = Box::new(move || {
            debug!("opening {}", path.display());
            File::open(&path).map_err(|source| CsvError::CannotOpenSource { path, source })
        });
        Self::from_handle(Handle::Unopened(open), capacity)
    }
}

impl<R: Read> ByteStream for ByteSource<R> {
    fn next_byte(&mut self) -> Result<Option<u8>> {
        if !self.bom_checked {
            self.detect_bom()?;
        }
        if self.pos == self.len {
            self.pos = 0;
            self.len = 0;
            self.len = self.read_into(0)?;
            if self.len == 0 {
                return Ok(None);
            }
        }
        let byte = self.buf[self.pos];
        self.pos += 1;
        self.offset += 1;
        Ok(Some(byte))
    }

    fn offset(&self) -> u64 {
        self.offset
    }

    fn bom_detected(&self) -> bool {
        self.bom
    }
}

/// A [`ByteStream`] over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct SliceSource<'a> {
    bytes: &'a [u8],
    pos: usize,
    bom: bool,
}

impl<'a> SliceSource<'a> {
    /// Wraps `bytes`, skipping a leading byte-order mark.
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        let bom = bytes.starts_with(UTF8_BOM);
        if bom {
            debug!("skipping UTF-8 byte-order mark");
        }
        Self {
            bytes,
            pos: if bom { UTF8_BOM.len() } else { 0 },
            bom,
        }
    }

    /// The bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        &self.bytes[self.pos..]
    }
}

impl ByteStream for SliceSource<'_> {
    fn next_byte(&mut self) -> Result<Option<u8>> {
        let byte = self.bytes.get(self.pos).copied();
        if byte.is_some() {
            self.pos += 1;
        }
        Ok(byte)
    }

    fn offset(&self) -> u64 {
        self.pos as u64
    }

    fn bom_detected(&self) -> bool {
        self.bom
    }
}

/// A [`ByteStream`] over any byte iterator.
#[derive(Debug, Clone)]
pub struct IterSource<I> {
    iter: Fuse<I>,
    head: [u8; 3],
    head_pos: usize,
    head_len: usize,
    offset: u64,
    bom_checked: bool,
    bom: bool,
}

impl<I: Iterator<Item = u8>> IterSource<I> {
    /// Wraps `iter`, skipping a leading byte-order mark.
    pub fn new(iter: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            iter: iter.into_iter().fuse(),
            head: [0; 3],
            head_pos: 0,
            head_len: 0,
            offset: 0,
            bom_checked: false,
            bom: false,
        }
    }

    fn detect_bom(&mut self) {
        self.bom_checked = true;
        while self.head_len < self.head.len() {
            let Some(byte) = self.iter.next() else {
                break;
            };
            self.head[self.head_len] = byte;
            self.head_len += 1;
        }
        if &self.head[..self.head_len] == UTF8_BOM {
            debug!("skipping UTF-8 byte-order mark");
            self.head_pos = self.head_len;
            self.offset = UTF8_BOM.len() as u64;
            self.bom = true;
        }
    }
}

impl<I: Iterator<Item = u8>> ByteStream for IterSource<I> {
    fn next_byte(&mut self) -> Result<Option<u8>> {
        if !self.bom_checked {
            self.detect_bom();
        }
        let byte = if self.head_pos < self.head_len {
            self.head_pos += 1;
            Some(self.head[self.head_pos - 1])
        } else {
            self.iter.next()
        };
        if byte.is_some() {
            self.offset += 1;
        }
        Ok(byte)
    }

    fn offset(&self) -> u64 {
        self.offset
    }

    fn bom_detected(&self) -> bool {
        self.bom
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, io::Cursor, rc::Rc};

    use super::*;
    use crate::tests::utils::Tracked;

    fn drain(source: &mut impl ByteStream) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(b) = source.next_byte().unwrap() {
            out.push(b);
        }
        out
    }

    /// Hands out at most `step` bytes per `read` call.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    /// Yields `ok` bytes, then fails every call.
    struct Failing {
        ok: Vec<u8>,
    }

    impl Read for Failing {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.ok.is_empty() {
                return Err(io::Error::other("disk on fire"));
            }
            let n = buf.len().min(self.ok.len());
            buf[..n].copy_from_slice(&self.ok[..n]);
            self.ok.drain(..n);
            Ok(n)
        }
    }

    #[test]
    fn byte_source_skips_bom() {
        let mut source = ByteSource::new(Cursor::new(b"\xEF\xBB\xBFabc".to_vec()));
        assert_eq!(drain(&mut source), b"abc");
        assert!(source.bom_detected());
        assert_eq!(source.offset(), 6);
    }

    #[test]
    fn byte_source_keeps_partial_bom() {
        let mut source = ByteSource::new(Cursor::new(b"\xEF\xBBx".to_vec()));
        assert_eq!(drain(&mut source), b"\xEF\xBBx");
        assert!(!source.bom_detected());
    }

    #[test]
    fn byte_source_detects_bom_split_across_reads() {
        let reader = Trickle {
            data: b"\xEF\xBB\xBFa,b",
            step: 1,
        };
        let mut source = ByteSource::new(reader);
        assert_eq!(drain(&mut source), b"a,b");
        assert!(source.bom_detected());
    }

    /// Counts `read` calls through a shared cell so the count survives the
    /// reader being released.
    struct Counting {
        inner: Cursor<Vec<u8>>,
        calls: Rc<Cell<usize>>,
    }

    impl Read for Counting {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.calls.set(self.calls.get() + 1);
            self.inner.read(buf)
        }
    }

    #[test]
    fn byte_source_refills_once_per_chunk() {
        let calls = Rc::new(Cell::new(0));
        let reader = Counting {
            inner: Cursor::new(vec![b'x'; 20]),
            calls: Rc::clone(&calls),
        };
        let mut source = ByteSource::with_capacity(reader, 8);
        assert_eq!(drain(&mut source).len(), 20);
        // 8 + 8 + 4 bytes, then the zero-length read.
        assert_eq!(calls.get(), 4);
        assert!(matches!(source.handle, Handle::Exhausted));
        assert_eq!(source.next_byte().unwrap(), None);
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn byte_source_releases_reader_at_end_of_input() {
        let (reader, drops) = Tracked::new(Cursor::new(b"a,b\nc".to_vec()));
        let mut source = ByteSource::with_capacity(reader, 8);
        assert_eq!(source.next_byte().unwrap(), Some(b'a'));
        assert_eq!(drops.get(), 0);
        assert_eq!(drain(&mut source), b",b\nc");
        assert_eq!(drops.get(), 1);
        drop(source);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn byte_source_releases_reader_on_failure() {
        let (reader, drops) = Tracked::new(Failing {
            ok: b"ab".to_vec(),
        });
        let mut source = ByteSource::with_capacity(reader, 8);
        assert_eq!(drain_until_error(&mut source), b"ab");
        assert_eq!(drops.get(), 1);
        assert_eq!(source.next_byte().unwrap(), None);
        drop(source);
        assert_eq!(drops.get(), 1);
    }

    fn drain_until_error(source: &mut impl ByteStream) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            match source.next_byte() {
                Ok(Some(b)) => out.push(b),
                Ok(None) => panic!("expected a read failure"),
                Err(CsvError::ReadFailure(_)) => return out,
                Err(err) => panic!("unexpected error {err}"),
            }
        }
    }

    #[test]
    fn byte_source_short_first_read_does_not_wait_for_bom() {
        // The second `read` fails, so any wait for a third byte would surface
        // the error before the first two bytes.
        let mut source = ByteSource::new(Failing {
            ok: b"a\n".to_vec(),
        });
        assert_eq!(source.next_byte().unwrap(), Some(b'a'));
        assert_eq!(source.next_byte().unwrap(), Some(b'\n'));
        assert!(!source.bom_detected());
        assert!(matches!(
            source.next_byte(),
            Err(CsvError::ReadFailure(_))
        ));
    }

    #[test]
    fn byte_source_minimum_capacity() {
        let source = ByteSource::with_capacity(Cursor::new(Vec::new()), 1);
        assert_eq!(source.capacity(), MIN_BUFFER_SIZE);
    }

    #[test]
    fn byte_source_latches_on_failure() {
        let mut source = ByteSource::with_capacity(
            Failing {
                ok: b"abcd".to_vec(),
            },
            8,
        );
        assert_eq!(source.next_byte().unwrap(), Some(b'a'));
        for expected in b"bcd" {
            assert_eq!(source.next_byte().unwrap(), Some(*expected));
        }
        assert!(matches!(
            source.next_byte(),
            Err(CsvError::ReadFailure(_))
        ));
        assert!(matches!(source.handle, Handle::Failed));
        assert_eq!(source.next_byte().unwrap(), None);
        assert_eq!(source.next_byte().unwrap(), None);
    }

    #[test]
    fn byte_source_failure_during_bom_check() {
        let mut source = ByteSource::new(Failing {
            ok: b"\xEF".to_vec(),
        });
        assert!(matches!(
            source.next_byte(),
            Err(CsvError::ReadFailure(_))
        ));
        assert_eq!(source.next_byte().unwrap(), None);
    }

    #[test]
    fn byte_source_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.csv");
        let mut source = ByteSource::from_path(&path, 64);
        match source.next_byte() {
            Err(CsvError::CannotOpenSource { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected CannotOpenSource, got {other:?}"),
        }
        assert_eq!(source.next_byte().unwrap(), None);
    }

    #[test]
    fn byte_source_opens_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("late.csv");
        let mut source = ByteSource::from_path(&path, 64);
        std::fs::write(&path, "a,b\n").unwrap();
        assert_eq!(drain(&mut source), b"a,b\n");
    }

    #[test]
    fn slice_source_skips_bom() {
        let mut source = SliceSource::new(b"\xEF\xBB\xBFhi");
        assert!(source.bom_detected());
        assert_eq!(source.remaining(), b"hi");
        assert_eq!(drain(&mut source), b"hi");
        assert_eq!(source.offset(), 5);
    }

    #[test]
    fn iter_source_replays_non_bom_head() {
        let mut source = IterSource::new(b"ab".iter().copied());
        assert_eq!(drain(&mut source), b"ab");
        assert!(!source.bom_detected());

        let mut source = IterSource::new(b"\xEF\xBB\xBF".iter().copied());
        assert_eq!(drain(&mut source), b"");
        assert!(source.bom_detected());
    }
}
