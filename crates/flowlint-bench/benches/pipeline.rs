//! Parse, evaluate, repair and full-pipeline benchmarks.
#![allow(clippy::expect_used)]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use flowlint_bench::{SizeTier, generate_workflow};
use flowlint_core::{Pipeline, RuleSet, apply, evaluate, load_bytes, parse, plan};

const TIERS: [(&str, SizeTier); 3] = [
    ("S", SizeTier::Small),
    ("M", SizeTier::Medium),
    ("L", SizeTier::Large),
];

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for (name, tier) in TIERS {
        let doc = load_bytes("bench.yml", generate_workflow(&tier.config(42)));
        group.throughput(Throughput::Bytes(doc.text().len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &doc, |b, doc| {
            b.iter(|| parse(doc));
        });
    }
    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let rules = RuleSet::workflow();
    let mut group = c.benchmark_group("evaluate");
    for (name, tier) in TIERS {
        let doc = load_bytes("bench.yml", generate_workflow(&tier.defective_config(42)));
        let root = parse(&doc).root.expect("generated document parses");
        group.bench_with_input(BenchmarkId::from_parameter(name), &root, |b, root| {
            b.iter(|| evaluate(Some(root), rules.rules()));
        });
    }
    group.finish();
}

fn bench_repair(c: &mut Criterion) {
    let rules = RuleSet::workflow();
    let mut group = c.benchmark_group("repair");
    for (name, tier) in TIERS {
        let doc = load_bytes("bench.yml", generate_workflow(&tier.defective_config(42)));
        let parsed = parse(&doc);
        let diags = evaluate(parsed.root.as_ref(), rules.rules());

        group.bench_with_input(BenchmarkId::new("plan", name), &doc, |b, doc| {
            b.iter(|| plan(doc, parsed.root.as_ref(), &diags));
        });

        let actions = plan(&doc, parsed.root.as_ref(), &diags).actions;
        group.bench_with_input(BenchmarkId::new("apply", name), &doc, |b, doc| {
            b.iter(|| apply(doc, &actions).expect("planned repairs apply"));
        });
    }
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    for (name, tier) in TIERS {
        let doc = load_bytes("bench.yml", generate_workflow(&tier.defective_config(42)));
        group.throughput(Throughput::Bytes(doc.text().len() as u64));

        let check = Pipeline::new(RuleSet::workflow());
        group.bench_with_input(BenchmarkId::new("check", name), &doc, |b, doc| {
            b.iter(|| check.run(doc));
        });

        let fix = Pipeline::new(RuleSet::workflow()).with_fix(true);
        group.bench_with_input(BenchmarkId::new("fix", name), &doc, |b, doc| {
            b.iter(|| fix.run(doc));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_evaluate, bench_repair, bench_pipeline);
criterion_main!(benches);
