//! Tests that generated documents parse, validate, and repair across all size
//! tiers and seeds.
#![allow(clippy::expect_used)]

use flowlint_bench::{GeneratorConfig, SizeTier, generate_workflow};
use flowlint_core::{Pipeline, RuleSet, load_bytes, parse};
use proptest::prelude::*;

fn assert_clean(config: &GeneratorConfig, label: &str) {
    let doc = load_bytes("gen.yml", generate_workflow(config));
    let outcome = Pipeline::new(RuleSet::workflow()).run(&doc);
    assert!(
        outcome.report.diagnostics.is_empty(),
        "{label}: {} diagnostics: {:?}",
        outcome.report.diagnostics.len(),
        outcome
            .report
            .diagnostics
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
    );
}

#[test]
fn generated_small_is_clean() {
    for seed in [42, 123, 999, 7777, 54321] {
        assert_clean(&SizeTier::Small.config(seed), &format!("Small/seed={seed}"));
    }
}

#[test]
fn generated_medium_is_clean() {
    for seed in [42, 123, 999] {
        assert_clean(&SizeTier::Medium.config(seed), &format!("Medium/seed={seed}"));
    }
}

#[test]
fn generated_large_is_clean() {
    assert_clean(&SizeTier::Large.config(42), "Large/seed=42");
}

#[test]
fn defective_documents_are_fully_repaired() {
    for tier in [SizeTier::Small, SizeTier::Medium] {
        let doc = load_bytes("gen.yml", generate_workflow(&tier.defective_config(7)));
        let outcome = Pipeline::new(RuleSet::workflow()).with_fix(true).run(&doc);
        assert!(
            outcome.report.diagnostics.is_empty(),
            "{tier:?}: {:?}",
            outcome.report.diagnostics
        );
        assert!(!outcome.report.applied_repairs.is_empty());
        let repaired = outcome.repaired.expect("repaired text");
        assert!(parse(&repaired).is_clean());
    }
}

#[test]
fn generation_is_deterministic() {
    let a = generate_workflow(&SizeTier::Medium.config(42));
    let b = generate_workflow(&SizeTier::Medium.config(42));
    assert_eq!(a, b, "same seed must produce identical output");
    assert_ne!(a, generate_workflow(&SizeTier::Medium.config(43)));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Any seed and shape yields a document that parses without errors.
    #[test]
    fn any_config_parses(
        seed in any::<u64>(),
        num_jobs in 1usize..20,
        steps_per_job in 1usize..6,
        missing_runner_rate in 0.0f64..=1.0,
        omit_trigger in any::<bool>(),
    ) {
        let config = GeneratorConfig { seed, num_jobs, steps_per_job, missing_runner_rate, omit_trigger };
        let doc = load_bytes("gen.yml", generate_workflow(&config));
        let parsed = parse(&doc);
        prop_assert!(parsed.is_clean(), "{:?}", parsed.parse_errors);
    }
}
