use std::{
    cell::Cell,
    io::{self, Read},
    rc::Rc,
};

use crate::{Reader, ReaderOptions, Writer, WriterOptions};

/// Parses `input` and returns every row's fields, panicking on errors.
pub(crate) fn read_all(input: &str, options: ReaderOptions) -> Vec<Vec<String>> {
    Reader::from_slice(input.as_bytes(), options)
        .unwrap()
        .map(|row| row.unwrap().into_vec())
        .collect()
}

/// Writes `rows`, forcing quoting on or off for every field when `quoted` is
/// set.
pub(crate) fn write_all(
    rows: &[Vec<String>],
    options: WriterOptions,
    quoted: Option<bool>,
) -> String {
    let mut writer = Writer::new(Vec::new(), options);
    for row in rows {
        writer.begin_row();
        for field in row {
            writer.write_field(field, quoted).unwrap();
        }
    }
    String::from_utf8(writer.into_inner()).unwrap()
}

pub(crate) fn quickcheck_tests() -> u64 {
    #[cfg(not(any(miri, feature = "test-fast")))]
    let tests = if is_ci::cached() { 10_000 } else { 1_000 };
    #[cfg(any(miri, feature = "test-fast"))]
    let tests = 10;
    tests
}

/// Wraps a reader and counts how many times it is dropped.
pub(crate) struct Tracked<R> {
    inner: R,
    drops: Rc<Cell<usize>>,
}

impl<R> Tracked<R> {
    pub(crate) fn new(inner: R) -> (Self, Rc<Cell<usize>>) {
        let drops = Rc::new(Cell::new(0));
        let tracked = Self {
            inner,
            drops: Rc::clone(&drops),
        };
        (tracked, drops)
    }
}

impl<R: Read> Read for Tracked<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R> Drop for Tracked<R> {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}
