//! Criterion benchmarks for parsing and the full import pipeline.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use boardstack_wasm::config::{DrillAlgorithm, ImportSettings};
use boardstack_wasm::pipeline::{run_to_completion, InputFile};
use boardstack_wasm::{excellon, gerber};

const OUTLINE: &[u8] = include_bytes!("../tests/fixtures/minimal/board.gm1");
const TOP_COPPER: &[u8] = include_bytes!("../tests/fixtures/minimal/board.gtl");
const BOTTOM_COPPER: &[u8] = include_bytes!("../tests/fixtures/minimal/board.gbl");
const TOP_SILK: &[u8] = include_bytes!("../tests/fixtures/minimal/board.gto");
const BOTTOM_SILK: &[u8] = include_bytes!("../tests/fixtures/minimal/board.gbo");
const DRILL: &[u8] = include_bytes!("../tests/fixtures/minimal/board_drill.txt");

fn files() -> Vec<InputFile> {
    vec![
        InputFile::new("board.gm1", OUTLINE),
        InputFile::new("board.gtl", TOP_COPPER),
        InputFile::new("board.gbl", BOTTOM_COPPER),
        InputFile::new("board.gto", TOP_SILK),
        InputFile::new("board.gbo", BOTTOM_SILK),
        InputFile::new("board_drill.txt", DRILL),
    ]
}

fn parse_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    group.bench_function("gerber_top_copper", |b| {
        b.iter(|| black_box(gerber::parse(black_box(TOP_COPPER))));
    });
    group.bench_function("excellon_drill", |b| {
        b.iter(|| black_box(excellon::parse(black_box(DRILL))));
    });
    group.finish();
}

fn pipeline_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(10);
    for (name, algorithm) in [
        ("per_pair", DrillAlgorithm::PerPair),
        ("batched", DrillAlgorithm::Batched),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| {
                let settings = ImportSettings::default().with_drill_algorithm(algorithm);
                black_box(run_to_completion(files(), settings))
            });
        });
    }
    group.finish();
}

criterion_group!(benches, parse_bench, pipeline_bench);
criterion_main!(benches);
