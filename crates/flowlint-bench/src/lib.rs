//! Workflow document generator and benchmark utilities for flowlint.
//!
//! This crate provides deterministic generation of realistic workflow
//! documents for benchmarking and property-based testing of `flowlint-core`.

pub mod generator;

pub use generator::{GeneratorConfig, SizeTier, generate_workflow};
