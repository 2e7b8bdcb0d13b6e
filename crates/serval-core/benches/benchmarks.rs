use criterion::{black_box, criterion_group, criterion_main, Criterion};

use serval_core::analysis::AnalysisEngine;
use serval_core::cfg::CfgBuilder;
use serval_core::parser::ParsedFile;
use serval_core::taint::TaintAnalyzer;

fn fixture(functions: usize) -> String {
    let mut source = String::new();
    for i in 0..functions {
        source.push_str(&format!(
            r#"
            int process_{i}(int count) {{
                char buf[256];
                char out[256];
                int total = 0;
                while (count) {{
                    if (count > 1) {{
                        scanf("%s", buf);
                    }} else {{
                        total = total + count;
                    }}
                    count = count - 1;
                }}
                strcpy(out, buf);
                return total;
            }}
            "#
        ));
    }
    source
}

fn bench_parse(c: &mut Criterion) {
    let source = fixture(20);
    c.bench_function("parse_20_functions", |b| {
        b.iter(|| ParsedFile::from_source("bench.c", black_box(&source)))
    });
}

fn bench_cfg_build(c: &mut Criterion) {
    let source = fixture(20);
    let parsed = ParsedFile::from_source("bench.c", &source);
    c.bench_function("cfg_build_20_functions", |b| {
        b.iter(|| {
            for index in 0..parsed.ast().functions.len() {
                black_box(CfgBuilder::build(parsed.ast(), index));
            }
        })
    });
}

fn bench_taint(c: &mut Criterion) {
    let source = fixture(20);
    let parsed = ParsedFile::from_source("bench.c", &source);
    let cfgs: Vec<_> = (0..parsed.ast().functions.len())
        .map(|index| CfgBuilder::build(parsed.ast(), index))
        .collect();
    let analyzer = TaintAnalyzer::new();
    c.bench_function("taint_20_functions", |b| {
        b.iter(|| {
            for cfg in &cfgs {
                black_box(analyzer.analyze(parsed.ast(), cfg));
            }
        })
    });
}

fn bench_full_analysis(c: &mut Criterion) {
    let source = fixture(20);
    let engine = AnalysisEngine::new();
    c.bench_function("analyze_20_functions", |b| {
        b.iter(|| {
            let parsed = ParsedFile::from_source("bench.c", black_box(&source));
            black_box(engine.analyze(&parsed))
        })
    });
}

criterion_group!(
    benches,
    bench_parse,
    bench_cfg_build,
    bench_taint,
    bench_full_analysis
);
criterion_main!(benches);
