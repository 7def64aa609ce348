#![no_main]
use std::{cell::RefCell, io::Read};

use arbitrary::{Arbitrary, Unstructured};
use csvstream::{Newline, Reader, ReaderOptions, Writer, WriterOptions};
use libfuzzer_sys::{fuzz_mutator, fuzz_target, fuzzer_mutate};
use rand::rngs::SmallRng; // faster than StdRng
use rand::{Rng, RngCore, SeedableRng};

const HEADER: usize = 5; // 1 flag + 4-byte seed

thread_local! {
    // One SmallRng per thread, seeded once from the host OS
    static RNG: RefCell<SmallRng> =
        RefCell::new(SmallRng::from_os_rng());
}

/// Fragments that exercise the interesting corners of the grammar.
static TOKEN_TABLE: &[&[u8]] = &[
    b",",
    b";",
    b"\"",
    b"\"\"",
    b"\r",
    b"\n",
    b"\r\n",
    b" ",
    b"\t",
    "\u{00A0}".as_bytes(),
    "\u{FEFF}".as_bytes(),
    b"a",
    b"xyz",
    "é".as_bytes(),
    "日本".as_bytes(),
    b"\xFF",
];

/// Helper: borrow the thread-local RNG and run a closure with it.
fn with_rng<F, R>(f: F) -> R
where
    F: FnOnce(&mut SmallRng) -> R,
{
    RNG.with(|cell| f(&mut cell.borrow_mut()))
}

fn mutator(data: &mut [u8], size: usize, max_size: usize, seed: u32) -> usize {
    if size < HEADER || seed.is_multiple_of(10) {
        data[0] = with_rng(|rng| rng.next_u32() as u8 & 0x1F); // 5 bits

        // 2) split-seed
        data[1..5].copy_from_slice(&with_rng(|rng| rng.next_u32().to_le_bytes()));

        let mut prefix = HEADER;
        while prefix < size.max(HEADER + 1) && prefix < max_size {
            let written = append_token(&mut data[prefix..max_size]);
            if written == 0 {
                break;
            }
            prefix += written;
        }
        prefix
    } else {
        fuzzer_mutate(data, size, max_size)
    }
}

/// Append one fragment from [`TOKEN_TABLE`] if it fits. Returns the number of
/// bytes written.
fn append_token(buf: &mut [u8]) -> usize {
    with_rng(|rng| {
        let token = TOKEN_TABLE[rng.random_range(0..TOKEN_TABLE.len())];
        if token.len() > buf.len() {
            return 0;
        }
        buf[..token.len()].copy_from_slice(token);
        token.len()
    })
}

fuzz_mutator!(|data: &mut [u8], size: usize, max_size: usize, seed: u32| {
    mutator(data, size, max_size, seed)
});

/// Hands out at most `step` bytes per `read` call.
struct Trickle<'a> {
    data: &'a [u8],
    step: usize,
}

impl Read for Trickle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.step.min(buf.len()).min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }
}

#[derive(Debug, Arbitrary)]
struct Rows(Vec<Vec<String>>);

fn reader_options(flags: u8, split_seed: u32) -> ReaderOptions {
    ReaderOptions {
        trim_fields: flags & 1 != 0,
        has_header_row: flags & 2 != 0,
        delimiter: if flags & 4 != 0 { b';' } else { b',' },
        buffer_size: (split_seed % 128) as usize,
        ..ReaderOptions::default()
    }
}

/// Raw input: any bytes must parse or fail cleanly, identically whether read
/// from a slice or in short chunks.
fn parse_raw(data: &[u8], flags: u8, split_seed: u32) {
    let options = reader_options(flags, split_seed);
    let whole = Reader::from_slice(data, options.clone())
        .map(|reader| reader.collect::<Result<Vec<_>, _>>());
    let trickled = Reader::from_reader(
        Trickle {
            data,
            step: 1 + (split_seed >> 8) as usize % 16,
        },
        options,
    )
    .map(|reader| reader.collect::<Result<Vec<_>, _>>());

    match (whole, trickled) {
        (Ok(Ok(a)), Ok(Ok(b))) => assert_eq!(a, b),
        (Ok(Err(a)), Ok(Err(b))) | (Err(a), Err(b)) => assert_eq!(a.to_string(), b.to_string()),
        (a, b) => panic!("slice and chunked reads disagree: {a:?} vs {b:?}"),
    }
}

/// Structured input: rows written with forced quoting always read back
/// unchanged.
fn roundtrip(data: &[u8], flags: u8) {
    let Ok(Rows(mut rows)) = Rows::arbitrary(&mut Unstructured::new(data)) else {
        return;
    };
    rows.retain(|row| !row.is_empty());

    let delimiter = if flags & 4 != 0 { b';' } else { b',' };
    let mut writer = Writer::new(
        Vec::new(),
        WriterOptions {
            delimiter,
            newline: if flags & 8 != 0 { Newline::CrLf } else { Newline::Lf },
            ..WriterOptions::default()
        },
    );
    for row in &rows {
        writer.begin_row();
        for field in row {
            writer.write_field(field, Some(true)).expect("Vec sink");
        }
    }
    let written = writer.into_inner();

    let options = ReaderOptions {
        delimiter,
        ..ReaderOptions::default()
    };
    let read: Vec<Vec<String>> = Reader::from_slice(&written, options)
        .expect("no header requested")
        .map(|row| row.expect("writer output parses").into_vec())
        .collect();
    assert_eq!(read, rows);
}

fuzz_target!(|data: &[u8]| {
    if data.len() < HEADER {
        return;
    }

    let flags = data[0];
    let split_seed = u32::from_le_bytes([data[1], data[2], data[3], data[4]]);
    let data = &data[HEADER..];

    if flags & 0x10 != 0 {
        roundtrip(data, flags);
    } else {
        parse_raw(data, flags, split_seed);
    }
});
