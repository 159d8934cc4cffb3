//! Clap CLI definition: root struct, subcommands, and shared argument types.
use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use flowlint_core::ReportStyle;

/// Default for `--max-file-size`: 16 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Report layout for `validate`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Style {
    /// PASS/FAIL summary per document with indented details (default).
    Human,
    /// Tab-separated `severity path line:col message` lines.
    Machine,
}

impl From<Style> for ReportStyle {
    fn from(style: Style) -> Self {
        match style {
            Style::Human => ReportStyle::Human,
            Style::Machine => ReportStyle::Machine,
        }
    }
}

/// Root command.
#[derive(Parser)]
#[command(
    name = "flowlint",
    version,
    about = "Validate and repair CI workflow definition files",
    propagate_version = true
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable ANSI colors in human output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Skip documents larger than this many bytes.
    #[arg(
        long,
        global = true,
        env = "FLOWLINT_MAX_FILE_SIZE",
        default_value_t = DEFAULT_MAX_FILE_SIZE,
        value_name = "BYTES"
    )]
    pub max_file_size: u64,

    #[command(subcommand)]
    pub command: Command,
}

/// All subcommands exposed by the `flowlint` binary.
#[derive(Subcommand)]
pub enum Command {
    /// Validate workflow documents, optionally repairing what can be fixed.
    Validate {
        /// Documents to check.
        #[arg(value_name = "FILE", required = true)]
        paths: Vec<PathBuf>,
        /// Apply verified repairs and write the documents back.
        #[arg(long)]
        fix: bool,
        /// Report layout.
        #[arg(long, value_enum, default_value = "human")]
        style: Style,
        /// JSON rules file to use instead of a built-in profile.
        #[arg(long, value_name = "FILE", conflicts_with = "profile")]
        rules: Option<PathBuf>,
        /// Built-in rule profile.
        #[arg(long, value_name = "NAME", default_value = "workflow")]
        profile: String,
        /// Do not save `<FILE>.bak` before writing repairs.
        #[arg(long, requires = "fix")]
        no_backup: bool,
    },

    /// Print a built-in rule profile as a JSON rules file.
    Rules {
        /// Profile to print.
        #[arg(long, value_name = "NAME", default_value = "workflow")]
        profile: String,
    },
}
