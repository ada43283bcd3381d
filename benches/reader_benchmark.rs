use std::io::Write;

use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::Rng;
use tempfile::NamedTempFile;

use alertdex::core::config::Config;
use alertdex::reader::log_file::{LogFile, ReadOptions};
use alertdex::store::store::AlertStore;

/// Helper to create an NDJSON fixture with n alerts, timestamp-ascending.
fn create_log_fixture(n: usize) -> NamedTempFile {
    let mut rng = rand::thread_rng();
    let mut file = NamedTempFile::new().unwrap();
    let base = Utc::now() - Duration::hours(12);

    for i in 0..n {
        let ts = (base + Duration::seconds(i as i64)).format("%Y-%m-%dT%H:%M:%SZ");
        let agent = rng.gen_range(0..50);
        let rule = rng.gen_range(100..200);
        let level = rng.gen_range(0..16);
        writeln!(
            file,
            r#"{{"timestamp":"{ts}","agent":{{"id":"{agent:03}","name":"host-{agent:03}"}},"rule":{{"id":"{rule}","level":{level},"description":"benchmark alert {i}"}}}}"#
        )
        .unwrap();
    }
    file.flush().unwrap();
    file
}

/// Benchmark forward streaming over the full file
fn bench_forward_read(c: &mut Criterion) {
    let file = create_log_fixture(10_000);
    let log = LogFile::open(file.path()).unwrap();

    c.bench_function("forward_read_10k", |b| {
        b.iter(|| {
            let count = log.forward(ReadOptions::default()).unwrap().count();
            black_box(count);
        });
    });
}

/// Benchmark reverse streaming at different chunk sizes
fn bench_reverse_read(c: &mut Criterion) {
    let file = create_log_fixture(10_000);
    let mut group = c.benchmark_group("reverse_read_10k");

    for chunk_size in [512usize, 8192, 65536].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(chunk_size),
            chunk_size,
            |b, &chunk_size| {
                let log = LogFile::open(file.path())
                    .unwrap()
                    .with_chunk_size(chunk_size);
                b.iter(|| {
                    let count = log.reverse(ReadOptions::default()).unwrap().count();
                    black_box(count);
                });
            },
        );
    }
    group.finish();
}

/// Benchmark a full load (reverse stream + normalize + index build)
fn bench_store_load(c: &mut Criterion) {
    let file = create_log_fixture(10_000);
    let config = Config {
        alerts_path: file.path().to_path_buf(),
        cache_capacity: 20_000,
        ..Default::default()
    };
    let store = AlertStore::new(&config).unwrap();

    c.bench_function("store_load_10k", |b| {
        b.iter(|| {
            let loaded = store.load(Duration::hours(24)).unwrap();
            black_box(loaded);
        });
    });
}

criterion_group!(benches, bench_forward_read, bench_reverse_read, bench_store_load);
criterion_main!(benches);
