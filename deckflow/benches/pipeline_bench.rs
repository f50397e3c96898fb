//! Benchmarks for cache key derivation and pipeline execution.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;

use deckflow::cache::{CacheKey, ResultCache};
use deckflow::config::Settings;
use deckflow::events::NoOpEventSink;
use deckflow::pipeline::{run_pipeline, PipelineRequest, PipelineRunner, RetryPolicy};
use deckflow::state::{Depth, OutlineItem};
use deckflow::testing::stub_ports;

fn cache_key_benchmark(c: &mut Criterion) {
    let outline: Vec<OutlineItem> = (0..10)
        .map(|i| OutlineItem::new(format!("Slide {i}"), format!("Point {i}")))
        .collect();

    c.bench_function("cache_key_derive", |b| {
        b.iter(|| CacheKey::derive(black_box("write_content"), black_box(&outline)));
    });
}

fn pipeline_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let dir = std::env::temp_dir().join("deckflow-bench");
    let settings = Settings {
        output_dir: dir.join("outputs"),
        retry: RetryPolicy::no_retry(),
        ..Settings::default()
    };
    let ports = stub_ports(dir.join("deck.pptx").display().to_string());
    let request = PipelineRequest::new("Benchmarking Rust")
        .with_slide_count(5)
        .with_depth(Depth::Detailed);

    c.bench_function("pipeline_cold_cache", |b| {
        b.iter(|| {
            let cache = Arc::new(ResultCache::in_memory());
            let runner = PipelineRunner::presentation(&ports, &settings, &cache, Arc::new(NoOpEventSink))
                .expect("pipeline builds");
            runtime.block_on(run_pipeline(&runner, black_box(&request)))
        });
    });

    let cache = Arc::new(ResultCache::in_memory());
    let warm = PipelineRunner::presentation(&ports, &settings, &cache, Arc::new(NoOpEventSink))
        .expect("pipeline builds");
    c.bench_function("pipeline_warm_cache", |b| {
        b.iter(|| runtime.block_on(run_pipeline(&warm, black_box(&request))));
    });
}

criterion_group!(benches, cache_key_benchmark, pipeline_benchmark);
criterion_main!(benches);
