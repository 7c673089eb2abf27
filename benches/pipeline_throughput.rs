use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;

use drumline::config::DetectorConfig;
use drumline::dsp::DetectorPipeline;

fn chunk_48k_50ms() -> Vec<f32> {
    (0..2400)
        .map(|i| (2.0 * std::f64::consts::PI * 150.0 * i as f64 / 48000.0).sin() as f32 * 0.5)
        .collect()
}

fn bench_pipeline(c: &mut Criterion) {
    let chunk = chunk_48k_50ms();

    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Elements(chunk.len() as u64));

    group.bench_function("process_chunk_48k", |b| {
        let mut pipeline = DetectorPipeline::new(DetectorConfig::default()).unwrap();
        pipeline.process_chunk(&chunk, 48000.0, 1).unwrap();
        b.iter(|| {
            let result = pipeline.process_chunk(black_box(&chunk), 48000.0, 1).unwrap();
            black_box(result.hits.len())
        });
    });

    group.bench_function("process_chunk_16k_no_decimation", |b| {
        let mut pipeline = DetectorPipeline::new(DetectorConfig::default()).unwrap();
        let chunk: Vec<f32> = chunk.iter().step_by(3).copied().collect();
        pipeline.process_chunk(&chunk, 16000.0, 1).unwrap();
        b.iter(|| {
            let result = pipeline.process_chunk(black_box(&chunk), 16000.0, 1).unwrap();
            black_box(result.hits.len())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
