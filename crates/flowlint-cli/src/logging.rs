//! Tracing subscriber setup.
//!
//! Logs go to stderr so they never mix with reports on stdout. `RUST_LOG`
//! takes precedence over the verbosity flags.
use tracing_subscriber::{EnvFilter, fmt};

/// The default filter directive for the given flags.
pub fn level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Installs the global subscriber. Does nothing if one is already set.
pub fn init(verbose: u8, quiet: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level(verbose, quiet)));
    let installed = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
    if installed.is_err() {
        tracing::debug!("a tracing subscriber was already installed");
    }
}
