/// Command modules for the `flowlint` CLI.
///
/// Each submodule implements one subcommand. Its `run` function takes the
/// parsed arguments and returns `Ok(())` on success or a
/// [`crate::error::CliError`] on failure.
pub mod rules;
pub mod validate;

use std::io::Write as _;

use crate::error::CliError;

/// Writes `text` to stdout in one go.
pub(crate) fn emit(text: &str) -> Result<(), CliError> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    out.write_all(text.as_bytes())
        .and_then(|()| out.flush())
        .map_err(|e| CliError::OutputFailed {
            detail: e.to_string(),
        })
}
