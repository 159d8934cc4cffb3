/// CLI error types with associated exit codes.
///
/// [`CliError`] is the top-level error type for the `flowlint` binary. Every
/// variant maps to a stable exit code via [`CliError::exit_code`]:
///
/// - Exit code **2**: the run could not be configured or its results could
///   not be written (bad rules file, unknown profile, failed write-back).
/// - Exit code **1**: the run completed and at least one document is invalid.
///
/// Problems with individual documents are not errors here; they become
/// diagnostics in that document's report.
use std::fmt;
use std::path::PathBuf;

/// All error conditions that the `flowlint` CLI can produce.
#[derive(Debug)]
pub enum CliError {
    // --- Exit code 2 ---
    /// The rules file could not be read.
    RulesUnreadable {
        /// The rules file.
        path: PathBuf,
        /// The underlying I/O error message.
        detail: String,
    },

    /// The rules file was read but is not a valid rule set.
    InvalidRules {
        /// The rules file.
        path: PathBuf,
        /// What is wrong with it.
        detail: String,
    },

    /// No built-in profile has this name.
    UnknownProfile {
        /// The requested name.
        name: String,
    },

    /// A repaired document or its backup could not be written.
    WriteFailed {
        /// The file being written.
        path: PathBuf,
        /// The underlying I/O error message.
        detail: String,
    },

    /// Reports could not be written to stdout.
    OutputFailed {
        /// The underlying I/O or serialization error message.
        detail: String,
    },

    // --- Exit code 1 ---
    /// At least one document still has errors. Its report has already been
    /// printed.
    ValidationFailed,
}

impl CliError {
    /// Returns the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::RulesUnreadable { .. }
            | Self::InvalidRules { .. }
            | Self::UnknownProfile { .. }
            | Self::WriteFailed { .. }
            | Self::OutputFailed { .. } => 2,

            Self::ValidationFailed => 1,
        }
    }

    /// Returns a human-readable error message suitable for printing to stderr.
    pub fn message(&self) -> String {
        match self {
            Self::RulesUnreadable { path, detail } => {
                format!("error: cannot read rules file {}: {detail}", path.display())
            }
            Self::InvalidRules { path, detail } => {
                format!("error: invalid rules file {}: {detail}", path.display())
            }
            Self::UnknownProfile { name } => {
                format!(
                    "error: unknown profile \"{name}\" (available: {})",
                    flowlint_core::PROFILES.join(", ")
                )
            }
            Self::WriteFailed { path, detail } => {
                format!("error: cannot write {}: {detail}", path.display())
            }
            Self::OutputFailed { detail } => {
                format!("error: cannot write output: {detail}")
            }
            Self::ValidationFailed => "error: one or more documents failed validation".to_owned(),
        }
    }

    /// Returns `true` when the failure is already visible in the printed
    /// reports.
    pub fn is_reported(&self) -> bool {
        matches!(self, Self::ValidationFailed)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for CliError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(CliError::ValidationFailed.exit_code(), 1);
        assert_eq!(
            CliError::UnknownProfile {
                name: "x".to_owned()
            }
            .exit_code(),
            2
        );
        assert_eq!(
            CliError::WriteFailed {
                path: PathBuf::from("a.yml"),
                detail: "read-only".to_owned(),
            }
            .exit_code(),
            2
        );
    }

    #[test]
    fn unknown_profile_lists_the_available_ones() {
        let err = CliError::UnknownProfile {
            name: "nope".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "error: unknown profile \"nope\" (available: workflow, minimal)"
        );
        assert!(!err.is_reported());
        assert!(CliError::ValidationFailed.is_reported());
    }
}
