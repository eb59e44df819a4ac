use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use pqc_keybridge::{GeneratorConfig, KemAlgorithm, KeyPairGenerator};

fn benchmark_public_key_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_public_key");

    for algorithm in KemAlgorithm::supported() {
        let generator =
            KeyPairGenerator::new(GeneratorConfig::default().with_algorithm(algorithm)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(algorithm), &generator, |b, g| {
            b.iter(|| black_box(g.generate_public_key().unwrap()));
        });
    }

    group.finish();
}

fn benchmark_memory_locking(c: &mut Criterion) {
    let mut group = c.benchmark_group("secret_memory_locking");

    for lock in [false, true] {
        let generator =
            KeyPairGenerator::new(GeneratorConfig::default().with_memory_locking(lock)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(lock), &generator, |b, g| {
            b.iter(|| black_box(g.generate_public_key().unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_public_key_generation, benchmark_memory_locking);
criterion_main!(benches);
