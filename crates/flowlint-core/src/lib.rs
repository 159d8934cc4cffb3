#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod document;
pub mod node;
pub mod parser;
pub mod path;
pub mod pipeline;
pub mod repair;
pub mod report;
pub mod rules;
pub mod validation;

pub use document::{LoadError, Position, SourceDocument, Span, load_bytes, load_path};
pub use node::{
    CollectionStyle, Entry, Node, NodeKind, NodeType, Scalar, ScalarStyle, ScalarValue,
};
pub use parser::{MAX_DEPTH, ParseResult, parse};
pub use path::{NodePath, PathSegment};
pub use pipeline::{Pipeline, PipelineOutcome, failed_load};
pub use repair::{ApplyError, RepairAction, RepairPlan, TextEdit, apply, plan};
pub use report::{ReportFormatter, ReportStyle, ValidationReport, format, format_batch};
pub use rules::{PROFILES, Rule, RuleKind, RuleSet, RuleSetError};
pub use validation::{Diagnostic, DiagnosticCode, Severity, evaluate};

/// Returns the current version of the flowlint-core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
