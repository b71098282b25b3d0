//! Block convolution performance benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lib_conv::reference::convolve;
use lib_conv::{OverlapAdd, OverlapSave};

fn bench_convolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("convolution");

    for signal_len in [1024, 4096, 16384, 65536].iter() {
        let signal: Vec<f64> = (0..*signal_len).map(|i| (i as f64 * 0.01).sin()).collect();
        let kernel: Vec<f64> = (0..256).map(|i| (-i as f64 * 0.1).exp()).collect();

        // Direct convolution is quadratic; skip the long inputs
        if *signal_len <= 4096 {
            group.bench_with_input(BenchmarkId::new("direct", signal_len), &signal, |b, s| {
                b.iter(|| convolve(black_box(s), &kernel));
            });
        }

        let mut add = OverlapAdd::spectral(&kernel, 768).unwrap();
        group.bench_with_input(
            BenchmarkId::new("overlap_add_spectral", signal_len),
            &signal,
            |b, s| {
                b.iter(|| add.convolve(black_box(s)));
            },
        );

        let mut save = OverlapSave::spectral(&kernel, 1024).unwrap();
        group.bench_with_input(
            BenchmarkId::new("overlap_save_spectral", signal_len),
            &signal,
            |b, s| {
                b.iter(|| save.convolve(black_box(s)));
            },
        );

        if *signal_len <= 4096 {
            let mut add_direct = OverlapAdd::new(&kernel, 256).unwrap();
            group.bench_with_input(
                BenchmarkId::new("overlap_add_direct", signal_len),
                &signal,
                |b, s| {
                    b.iter(|| add_direct.convolve(black_box(s)));
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_convolution);
criterion_main!(benches);
