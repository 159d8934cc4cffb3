//! Integration tests for `flowlint rules`.
#![allow(clippy::expect_used)]

use std::path::PathBuf;
use std::process::Command;

/// Path to the compiled `flowlint` binary.
fn flowlint_bin() -> PathBuf {
    let mut path = std::env::current_exe().expect("current exe");
    path.pop();
    if path.ends_with("deps") {
        path.pop();
    }
    path.push("flowlint");
    path
}

#[test]
fn prints_the_default_profile_as_json() {
    let out = Command::new(flowlint_bin())
        .arg("rules")
        .output()
        .expect("run flowlint rules");
    assert_eq!(out.status.code(), Some(0));
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).expect("stdout is JSON");
    assert_eq!(value["name"], "workflow");
    let rules = value["rules"].as_array().expect("rules array");
    assert_eq!(rules.len(), 11);
    assert_eq!(rules[0]["id"], "trigger-required");
    assert_eq!(rules[0]["kind"], "required_key");
    assert_eq!(rules[0]["insert_after"], "name");
    assert_eq!(rules[6]["path"], serde_json::json!(["jobs", "*"]));
}

#[test]
fn prints_the_minimal_profile() {
    let out = Command::new(flowlint_bin())
        .args(["rules", "--profile", "minimal"])
        .output()
        .expect("run flowlint rules");
    assert_eq!(out.status.code(), Some(0));
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).expect("stdout is JSON");
    assert_eq!(value["rules"].as_array().map(Vec::len), Some(2));
}

#[test]
fn printed_profile_is_a_valid_rules_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let rules = dir.path().join("rules.json");
    let out = Command::new(flowlint_bin())
        .args(["rules", "--profile", "minimal"])
        .output()
        .expect("run flowlint rules");
    std::fs::write(&rules, &out.stdout).expect("write rules");

    let doc = dir.path().join("ci.yml");
    std::fs::write(&doc, "on: push\njobs: {}\n").expect("write doc");
    let check = Command::new(flowlint_bin())
        .args([
            "validate",
            doc.to_str().expect("path"),
            "--rules",
            rules.to_str().expect("path"),
        ])
        .output()
        .expect("run flowlint validate");
    assert_eq!(
        check.status.code(),
        Some(0),
        "{}",
        String::from_utf8_lossy(&check.stdout)
    );
}

#[test]
fn unknown_profile_exits_2() {
    let out = Command::new(flowlint_bin())
        .args(["rules", "--profile", "strict"])
        .output()
        .expect("run flowlint rules");
    assert_eq!(out.status.code(), Some(2));
    assert!(out.stdout.is_empty());
}
