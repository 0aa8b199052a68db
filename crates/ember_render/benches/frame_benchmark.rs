//! # Frame Benchmark
//!
//! Full update+render cycles on the headless backend at several worker
//! counts, plus the recorder on its own.

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ember_render::{
    synthetic_workload, CommandRecorder, EngineConfig, Extent, FrameContext, FramePipeline,
    HeadlessBackend, RecorderConfig,
};

const ITEMS: usize = 20_000;

fn bench_frame_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_cycle_20k_items");

    for threads in [2usize, 4, 8, 16] {
        let config = EngineConfig::new(threads, 1920, 1080);
        let mut engine = FramePipeline::<HeadlessBackend>::initialize(&config).unwrap();
        engine.set_workload(synthetic_workload(ITEMS, 42)).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, _| {
            b.iter(|| {
                engine.update().unwrap();
                black_box(engine.render().unwrap())
            });
        });

        engine.shutdown();
    }

    group.finish();
}

fn bench_recorder(c: &mut Criterion) {
    let items = synthetic_workload(ITEMS, 7);
    let frame = FrameContext {
        frame_index: 0,
        slot: 0,
        extent: Extent::new(1920, 1080),
        anisotropy: 8,
    };
    let mut recorder = CommandRecorder::new(0, RecorderConfig::default());

    c.bench_function("record_20k_items_single_worker", |b| {
        b.iter(|| black_box(recorder.record(&frame, &items)));
    });
}

criterion_group!(benches, bench_frame_cycle, bench_recorder);
criterion_main!(benches);
