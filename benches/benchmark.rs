// Performance benchmarks for index search, rebuild and label resolution
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use facelabel_core::{
    EngineConfig, FlatL2Index, HashingTextEncoder, LabelEngine, MemoryStore, ReferenceEmbeddings,
    Strategy, VerifiedRecord,
};
use facelabel_core::vocabulary::{AGE_LABELS, GENDER_LABELS, RACE_LABELS};
use rand::prelude::*;
use std::sync::Arc;

const DIM: usize = 768;

fn generate_random_vector(rng: &mut impl Rng, dim: usize) -> Vec<f32> {
    (0..dim).map(|_| rng.random_range(-1.0f32..1.0f32)).collect()
}

fn generate_records(count: usize, dim: usize) -> Vec<VerifiedRecord> {
    let mut rng = rand::rng();
    (0..count)
        .map(|i| {
            let labels = [
                AGE_LABELS[rng.random_range(0..AGE_LABELS.len())],
                GENDER_LABELS[rng.random_range(0..GENDER_LABELS.len())],
                RACE_LABELS[rng.random_range(0..RACE_LABELS.len())],
            ];
            VerifiedRecord::new(format!("img-{}", i), generate_random_vector(&mut rng, dim))
                .with_verified(labels)
        })
        .collect()
}

fn engine_with(size: usize) -> LabelEngine {
    let reference = ReferenceEmbeddings::build(&HashingTextEncoder::new(DIM)).unwrap();
    let store = Arc::new(MemoryStore::with_records(generate_records(size, DIM)));
    let engine = LabelEngine::new(EngineConfig::default(), Arc::new(reference), store).unwrap();
    engine.rebuild_index().unwrap();
    engine
}

fn benchmark_flat_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("flat_search");
    let mut rng = rand::rng();

    for size in [1000, 10000].iter() {
        let mut index = FlatL2Index::with_capacity(DIM, *size);
        for _ in 0..*size {
            index.add(&generate_random_vector(&mut rng, DIM)).unwrap();
        }
        let query = generate_random_vector(&mut rng, DIM);

        group.bench_with_input(BenchmarkId::new("k3", size), size, |b, _| {
            b.iter(|| black_box(index.search(black_box(&query), 3).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("k_all", size), size, |b, &size| {
            b.iter(|| black_box(index.search(black_box(&query), size).unwrap()));
        });
    }

    group.finish();
}

fn benchmark_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("rebuild");
    group.sample_size(20);

    for size in [1000, 10000].iter() {
        let engine = engine_with(0);
        let store = MemoryStore::with_records(generate_records(*size, DIM));
        group.bench_with_input(BenchmarkId::new("verified_index", size), size, |b, _| {
            b.iter(|| black_box(engine.index().rebuild(&store).unwrap()));
        });
    }

    group.finish();
}

fn benchmark_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");
    let engine = engine_with(5000);
    let query = generate_random_vector(&mut rand::rng(), DIM);

    for strategy in Strategy::ALL {
        group.bench_function(strategy.as_str(), |b| {
            b.iter(|| black_box(engine.resolve_labels(black_box(&query), strategy)));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_flat_search, benchmark_rebuild, benchmark_resolve);
criterion_main!(benches);
