use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use subblock_codecs::Algorithm;
use subblock_core::{Compression, CompressionOptions};

const SIZE: usize = 4 * 1024 * 1024;

/// Slowly varying f32 samples: compressible after shuffling, noisy before.
fn float_data(len: usize) -> Vec<u8> {
    (0..len / 4)
        .flat_map(|i| ((i as f32) * 0.001).sin().to_le_bytes())
        .collect()
}

fn options(threads: u32) -> CompressionOptions {
    CompressionOptions::default()
        .with_subblock_size(64 * 1024)
        .with_item_size(4)
        .with_parallel(threads > 1, threads)
}

fn bench_compress(c: &mut Criterion) {
    let data = float_data(SIZE);
    let mut group = c.benchmark_group("compress");
    group.sample_size(10);
    group.throughput(Throughput::Bytes(data.len() as u64));

    for algorithm in Algorithm::ALL {
        for threads in [1u32, 4] {
            let engine = Compression::new(algorithm, options(threads));
            group.bench_with_input(
                BenchmarkId::new(algorithm.to_string(), threads),
                &data,
                |b, data| b.iter(|| engine.compress(data).unwrap()),
            );
        }
    }
    group.finish();
}

fn bench_uncompress(c: &mut Criterion) {
    let data = float_data(SIZE);
    let mut group = c.benchmark_group("uncompress");
    group.sample_size(10);
    group.throughput(Throughput::Bytes(data.len() as u64));

    for algorithm in Algorithm::ALL {
        for threads in [1u32, 4] {
            let engine = Compression::new(algorithm, options(threads));
            let subblocks = engine.compress(&data).unwrap();
            if subblocks.is_empty() {
                continue;
            }
            let mut out = vec![0u8; data.len()];
            group.bench_function(BenchmarkId::new(algorithm.to_string(), threads), |b| {
                b.iter(|| engine.uncompress_into(&subblocks, &mut out).unwrap());
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_compress, bench_uncompress);
criterion_main!(benches);
