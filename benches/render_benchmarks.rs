//! Rendering and generation benchmarks.
//!
//! Compares the sequential and parallel render strategies across image sizes, and measures
//! a cold (encode + render) against a warm (cache hit) `generate` call.
//!
//! Run with: cargo bench --bench render_benchmarks

use aztecqr::{
    GenerationRequest, Generator, GeneratorConfig, PixelRenderer, RenderStrategy, SymbolGrid,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn bench_render_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_strategy");
    let renderer = PixelRenderer::default();

    for side in [64u32, 100, 300, 1000, 2000] {
        let grid = SymbolGrid::from_fn(side, side, |x, y| (x / 7 + y / 7) % 2 == 0);
        group.throughput(Throughput::Elements(u64::from(side) * u64::from(side)));

        for strategy in [RenderStrategy::Sequential, RenderStrategy::Parallel] {
            group.bench_with_input(
                BenchmarkId::new(format!("{strategy:?}"), side),
                &grid,
                |b, grid| b.iter(|| renderer.render_with(black_box(grid), strategy).unwrap()),
            );
        }
    }
    group.finish();
}

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");
    let request = GenerationRequest::new("https://example.com/benchmark", 2, 300);

    let mut config = GeneratorConfig::default();
    config.cache.enabled = false;
    let uncached = Generator::new(config);
    group.bench_function("cold_300", |b| {
        b.iter(|| uncached.generate(black_box(&request)).unwrap())
    });

    let cached = Generator::default();
    cached.generate(&request).unwrap();
    group.bench_function("cache_hit_300", |b| {
        b.iter(|| cached.generate(black_box(&request)).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_render_strategies, bench_generate);
criterion_main!(benches);
