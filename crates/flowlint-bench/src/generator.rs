//! Workflow document generator.
//!
//! Produces block-style workflow documents with a configurable number of
//! jobs and steps. Defects (a missing trigger, jobs without a runner) can be
//! injected at a controlled rate so the repair path has work to do.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const RUNNERS: &[&str] = &["ubuntu-latest", "ubuntu-22.04", "macos-14", "windows-2022"];

const ACTIONS: &[&str] = &[
    "actions/checkout@v4",
    "actions/cache@v4",
    "actions/setup-node@v4",
    "actions/upload-artifact@v4",
    "dtolnay/rust-toolchain@stable",
];

const COMMANDS: &[&str] = &[
    "cargo build --release",
    "cargo test --workspace",
    "cargo clippy -- -D warnings",
    "npm ci",
    "npm test",
    "make dist",
    "./scripts/publish.sh",
];

const TRIGGERS: &[&str] = &[
    "push:\n    branches: [main]",
    "pull_request:\n    branches: [main]",
    "workflow_dispatch:",
    "schedule:\n    - cron: \"0 3 * * *\"",
];

/// Configuration for the workflow generator.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Seed for the random number generator (deterministic).
    pub seed: u64,
    /// Number of jobs.
    pub num_jobs: usize,
    /// Steps per job.
    pub steps_per_job: usize,
    /// Fraction of jobs generated without `runs-on` (0.0-1.0).
    pub missing_runner_rate: f64,
    /// Omit the top-level trigger.
    pub omit_trigger: bool,
}

/// Predefined size tiers for benchmarking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeTier {
    /// 5 jobs, ~2KB
    Small,
    /// 100 jobs, ~40KB
    Medium,
    /// 1000 jobs, ~500KB
    Large,
}

impl SizeTier {
    /// Returns a defect-free `GeneratorConfig` for this size tier.
    pub fn config(self, seed: u64) -> GeneratorConfig {
        let (num_jobs, steps_per_job) = match self {
            SizeTier::Small => (5, 4),
            SizeTier::Medium => (100, 5),
            SizeTier::Large => (1000, 6),
        };
        GeneratorConfig {
            seed,
            num_jobs,
            steps_per_job,
            missing_runner_rate: 0.0,
            omit_trigger: false,
        }
    }

    /// Like [`SizeTier::config`], with the trigger and a quarter of the
    /// runners missing.
    pub fn defective_config(self, seed: u64) -> GeneratorConfig {
        GeneratorConfig {
            missing_runner_rate: 0.25,
            omit_trigger: true,
            ..self.config(seed)
        }
    }
}

/// Generates a workflow document from the given configuration.
///
/// All randomness is deterministic, seeded from `config.seed`.
pub fn generate_workflow(config: &GeneratorConfig) -> String {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut out = String::new();

    out.push_str(&format!("name: generated-{}\n", config.seed));
    if !config.omit_trigger {
        let count = rng.gen_range(1..=TRIGGERS.len());
        out.push_str("on:\n");
        for trigger in TRIGGERS.choose_multiple(&mut rng, count) {
            out.push_str(&format!("  {trigger}\n"));
        }
    }
    out.push_str("\njobs:\n");
    for job in 0..config.num_jobs {
        push_job(&mut out, &mut rng, job, config);
    }
    out
}

fn push_job(out: &mut String, rng: &mut StdRng, index: usize, config: &GeneratorConfig) {
    out.push_str(&format!("  job-{index}:\n"));
    if index > 0 && rng.gen_bool(0.3) {
        out.push_str(&format!("    needs: [job-{}]\n", rng.gen_range(0..index)));
    }
    if !rng.gen_bool(config.missing_runner_rate.clamp(0.0, 1.0)) {
        let runner = RUNNERS.choose(rng).copied().unwrap_or("ubuntu-latest");
        out.push_str(&format!("    runs-on: {runner}\n"));
    }
    out.push_str("    steps:\n");
    for step in 0..config.steps_per_job.max(1) {
        if step == 0 || rng.gen_bool(0.3) {
            let action = ACTIONS.choose(rng).copied().unwrap_or("actions/checkout@v4");
            out.push_str(&format!("      - uses: {action}\n"));
        } else if rng.gen_bool(0.2) {
            out.push_str(&format!("      - name: Step {step}\n        run: |\n"));
            for _ in 0..rng.gen_range(2..4) {
                let command = COMMANDS.choose(rng).copied().unwrap_or("true");
                out.push_str(&format!("          {command}\n"));
            }
        } else {
            let command = COMMANDS.choose(rng).copied().unwrap_or("true");
            out.push_str(&format!("      - name: Step {step}\n        run: {command}\n"));
        }
    }
}
