use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use ont_console::model::{Cto, LatLon};
use ont_console::search::search_ctos;

fn build_corpus(count: usize) -> Vec<Cto> {
    (0..count)
        .map(|i| Cto {
            uuid: format!("cto-{i:05}-{:x}", i.wrapping_mul(2654435761)),
            name: format!("CTO Calle {} n{}", i % 97, i),
            position: LatLon::new(40.0 + (i as f64) * 1e-5, -3.7 + (i as f64) * 1e-5),
        })
        .collect()
}

fn bench_scorer(c: &mut Criterion) {
    let corpus = build_corpus(5_000);

    c.bench_function("cto_scorer_prefix_5k", |b| {
        b.iter(|| search_ctos(black_box(corpus.iter()), black_box("cto-01")))
    });

    c.bench_function("cto_scorer_name_substring_5k", |b| {
        b.iter(|| search_ctos(black_box(corpus.iter()), black_box("calle 42")))
    });

    c.bench_function("cto_scorer_no_match_5k", |b| {
        b.iter(|| search_ctos(black_box(corpus.iter()), black_box("zzzzzz")))
    });
}

criterion_group!(benches, bench_scorer);
criterion_main!(benches);
