//! Implementation of `flowlint rules [--profile NAME]`.
//!
//! Prints a built-in profile in the rules-file format, as a starting point
//! for a custom `--rules` file.
use std::fmt;
use std::path::Path;

use flowlint_core::RuleSet;

use crate::cmd::emit;
use crate::error::CliError;

/// Runs the `rules` command.
///
/// # Errors
///
/// - [`CliError::UnknownProfile`]: no built-in profile has that name.
/// - [`CliError::OutputFailed`]: stdout could not be written.
pub fn run(profile: &str) -> Result<(), CliError> {
    let rules = profile_rules(profile)?;
    emit(&render(&rules)?)
}

/// Renders `rules` in the rules-file format, newline-terminated.
fn render(rules: &RuleSet) -> Result<String, CliError> {
    let json = rules.to_json_pretty().map_err(|e| output_failed(&e))?;
    Ok(format!("{json}\n"))
}

fn output_failed(error: &impl fmt::Display) -> CliError {
    CliError::OutputFailed {
        detail: error.to_string(),
    }
}

/// Looks up a built-in profile.
///
/// # Errors
///
/// Returns [`CliError::UnknownProfile`] for names not in
/// [`flowlint_core::PROFILES`].
pub fn profile_rules(name: &str) -> Result<RuleSet, CliError> {
    RuleSet::profile(name).ok_or_else(|| CliError::UnknownProfile {
        name: name.to_owned(),
    })
}

/// Loads and validates a JSON rules file.
///
/// # Errors
///
/// - [`CliError::RulesUnreadable`]: the file cannot be read.
/// - [`CliError::InvalidRules`]: the file is not a valid rule set.
pub fn load_rules_file(path: &Path) -> Result<RuleSet, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| CliError::RulesUnreadable {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    RuleSet::from_json(&text).map_err(|e| CliError::InvalidRules {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::wildcard_enum_match_arm)]

    use super::*;

    #[test]
    fn known_profiles_resolve() {
        for name in flowlint_core::PROFILES {
            let rules = profile_rules(name).expect("built-in profile");
            assert_eq!(rules.name(), *name);
        }
    }

    #[test]
    fn unknown_profile_is_a_config_error() {
        let err = profile_rules("strict").expect_err("no such profile");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn printed_profile_loads_back() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("rules.json");
        std::fs::write(&path, render(&RuleSet::workflow()).expect("render")).expect("write");
        let loaded = load_rules_file(&path).expect("load");
        assert_eq!(loaded, RuleSet::workflow());
    }

    #[test]
    fn render_ends_with_a_newline() {
        let text = render(&RuleSet::minimal()).expect("render");
        assert!(text.ends_with("}\n"), "{text}");
        assert!(text.contains("\"name\": \"minimal\""), "{text}");
    }

    #[test]
    fn serialization_failure_is_an_output_error() {
        let cause = serde_json::from_str::<serde_json::Value>("{").expect_err("truncated JSON");
        let err = output_failed(&cause);
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().starts_with("error: cannot write output: "), "{}", err.message());
        assert!(err.message().contains(&cause.to_string()));
    }

    #[test]
    fn invalid_rules_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("rules.json");
        std::fs::write(&path, r#"{"name": "x", "rules": [{"id": "a", "path": [], "kind": "non_empty"}]}"#)
            .expect("write");
        match load_rules_file(&path) {
            Err(CliError::InvalidRules { detail, .. }) => {
                assert!(detail.contains("path must not be empty"), "{detail}");
            }
            other => panic!("expected InvalidRules, got {other:?}"),
        }
    }

    #[test]
    fn missing_rules_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        match load_rules_file(&dir.path().join("none.json")) {
            Err(CliError::RulesUnreadable { .. }) => {}
            other => panic!("expected RulesUnreadable, got {other:?}"),
        }
    }
}
