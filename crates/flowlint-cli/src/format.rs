/// Color detection for human-readable reports.
///
/// Reports are written to stdout, so colors follow stdout: they are disabled
/// when `--no-color` is set, when the `NO_COLOR` environment variable is
/// present (per <https://no-color.org>), or when stdout is not a TTY.
use std::io::IsTerminal as _;

/// Returns `true` if ANSI color codes should be emitted in reports.
pub fn colors_enabled(no_color_flag: bool) -> bool {
    if no_color_flag {
        return false;
    }
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    std::io::stdout().is_terminal()
}
