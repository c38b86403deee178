//! Analyzer benchmarks.
//!
//! Measures the cost of one full resolve-and-check run over the fixture
//! catalog, and of parsing the SELECT subset.
//!
//! ```bash
//! cargo bench
//! ```

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use sql_analyzer::harness::AnalysisFixture;
use sql_analyzer::parser::parse;

fn bench_analysis(c: &mut Criterion) {
    let fixture = AnalysisFixture::new();
    let simple = parse("SELECT * FROM orders").unwrap();
    let filtered = parse("SELECT id, amount AS total FROM orders WHERE amount > 10.5").unwrap();

    c.bench_function("analyze_select_star", |b| {
        b.iter(|| fixture.analyze(black_box(&simple), true).unwrap())
    });
    c.bench_function("analyze_select_filtered", |b| {
        b.iter(|| fixture.analyze(black_box(&filtered), true).unwrap())
    });
}

fn bench_parsing(c: &mut Criterion) {
    c.bench_function("parse_select", |b| {
        b.iter(|| parse(black_box("SELECT id, amount AS total FROM orders WHERE amount > 10.5")))
    });
}

criterion_group!(benches, bench_analysis, bench_parsing);
criterion_main!(benches);
