//! Benchmark – `csvstream::Reader` and `csvstream::Writer`
#![allow(missing_docs)]

use std::{io::Cursor, time::Duration};

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use csvstream::{Reader, ReaderOptions, Writer, WriterOptions};

/// Produce a *deterministic* CSV document of `rows` rows. Every third field
/// is quoted and holds a delimiter, an escaped quote and a line break so the
/// quoted path of the tokenizer is exercised as much as the plain one.
fn make_csv_payload(rows: usize) -> String {
    let mut writer = Writer::new(Vec::new(), WriterOptions::default());
    for i in 0..rows {
        writer
            .write_row([
                format!("{i:08}"),
                format!("name {i}"),
                format!("note, \"{i}\"\nsecond line"),
                "  padded  ".to_owned(),
            ])
            .expect("writing to a Vec cannot fail");
    }
    String::from_utf8(writer.into_inner()).expect("writer emits UTF-8")
}

fn count_fields(payload: &str, buffer_size: usize, trim_fields: bool) -> usize {
    let options = ReaderOptions {
        trim_fields,
        buffer_size,
        ..ReaderOptions::default()
    };
    let mut reader = Reader::from_reader(Cursor::new(payload.as_bytes()), options)
        .expect("no header requested");
    let mut fields = Vec::new();
    let mut total = 0;
    while reader.read_fields(&mut fields).expect("payload is valid") {
        total += fields.len();
    }
    total
}

fn bench_reader(c: &mut Criterion) {
    let payload = make_csv_payload(10_000);

    let mut group = c.benchmark_group("reader");
    group.throughput(Throughput::Bytes(payload.len() as u64));

    for &buffer_size in &[64usize, 4096, 65_536] {
        for &trim in &[false, true] {
            let name = if trim { "trim" } else { "plain" };
            group.bench_with_input(
                BenchmarkId::new(buffer_size.to_string(), name),
                &trim,
                |b, &t| {
                    b.iter(|| black_box(count_fields(black_box(&payload), buffer_size, t)));
                },
            );
        }
    }
    group.finish();
}

fn bench_writer(c: &mut Criterion) {
    let mut group = c.benchmark_group("writer");
    group.bench_function("10k_rows", |b| {
        b.iter(|| black_box(make_csv_payload(black_box(10_000)).len()));
    });
    group.finish();
}

fn criterion() -> Criterion {
    let mut c = Criterion::default();
    if cfg!(feature = "bench-fast") {
        c = c
            .warm_up_time(Duration::from_millis(10))
            .measurement_time(Duration::from_millis(100))
            .sample_size(10);
    } else {
        c = c
            .warm_up_time(Duration::from_secs(5))
            .measurement_time(Duration::from_secs(10));
    }
    c
}

criterion_group! { name = benches; config = criterion(); targets = bench_reader, bench_writer }
criterion_main!(benches);
