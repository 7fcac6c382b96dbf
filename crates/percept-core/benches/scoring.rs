//! Benchmarks for catalog scoring and tag selection.
//!
//! Run with: cargo bench -p percept-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use percept_core::catalog::{Concept, ConceptCatalog};
use percept_core::config::TaggingConfig;
use percept_core::tagging::{score_catalog, select_tags};

/// Deterministic pseudo-embedding, normalized.
fn synthetic_embedding(seed: u64, dimension: usize) -> Vec<f32> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let mut v: Vec<f32> = (0..dimension)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((state >> 33) as f32 / u32::MAX as f32) - 0.5
        })
        .collect();
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    for x in v.iter_mut() {
        *x /= norm;
    }
    v
}

fn synthetic_catalog(size: usize, dimension: usize) -> ConceptCatalog {
    ConceptCatalog::new(
        (0..size)
            .map(|i| {
                Concept::new(
                    format!("concept-{i:05}"),
                    format!("concept {i}"),
                    synthetic_embedding(i as u64 + 1, dimension),
                )
            })
            .collect(),
    )
}

fn benchmark_score_catalog(c: &mut Criterion) {
    let catalog = synthetic_catalog(10_000, 512);
    let embedding = synthetic_embedding(0, 512);

    c.bench_function("score_catalog_10k_x_512", |b| {
        b.iter(|| {
            let _ = score_catalog(black_box(&embedding), black_box(&catalog));
        })
    });
}

fn benchmark_select_tags(c: &mut Criterion) {
    let catalog = synthetic_catalog(10_000, 512);
    let embedding = synthetic_embedding(0, 512);
    let ranked = score_catalog(&embedding, &catalog);
    let config = TaggingConfig::default();

    c.bench_function("select_tags_from_10k", |b| {
        b.iter(|| {
            let _ = select_tags(black_box(&ranked), black_box(&config));
        })
    });
}

criterion_group!(benches, benchmark_score_catalog, benchmark_select_tags);
criterion_main!(benches);
