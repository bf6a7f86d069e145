use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use jemallocator::Jemalloc;

use csv_sieve::processor::{memory, parts, sequential, RunConfig};

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

const ROWS: u64 = 200_000;

fn generate_input(dir: &Path) -> PathBuf {
    let path = dir.join("bench.csv");
    let mut writer = BufWriter::new(File::create(&path).unwrap());
    writeln!(writer, "id,value,category").unwrap();
    for i in 0..ROWS {
        let category = ["A", "B", "C", "D"][(i % 4) as usize];
        writeln!(writer, "{i},{},{category}", i % 1000).unwrap();
    }
    writer.flush().unwrap();
    path
}

fn engines(c: &mut Criterion) {
    let dir = tempfile::TempDir::new().unwrap();
    let input = generate_input(dir.path());

    let mut group = c.benchmark_group("engines");
    group.sample_size(10);
    group.throughput(Throughput::Elements(ROWS));

    group.bench_function("sequential", |b| {
        let config = RunConfig::new(&input, dir.path().join("out_seq.csv"))
            .columns("1,2")
            .filter("value >= 500");
        b.iter(|| sequential::process_sequential(&config).unwrap())
    });

    group.bench_function("file_parts", |b| {
        let config = RunConfig::new(&input, dir.path().join("out_parts.csv"))
            .columns("1,2")
            .filter("value >= 500");
        b.iter(|| parts::process_in_parts(&config).unwrap())
    });

    group.bench_function("in_memory", |b| {
        let config = RunConfig::new(&input, dir.path().join("out_mem.csv"))
            .columns("1,2")
            .filter("value >= 500");
        b.iter(|| memory::process_in_memory(&config).unwrap())
    });

    group.finish();
}

criterion_group!(benches, engines);
criterion_main!(benches);
