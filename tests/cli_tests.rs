//! CLI integration tests
//!
//! These run the built binary; they are skipped when it was built without
//! the `cli` feature.

use std::path::PathBuf;
use std::process::{Command, Output};

fn xmlmodel_bin() -> Option<PathBuf> {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("target");
    path.push("debug");
    path.push("xmlmodel");
    path.exists().then_some(path)
}

fn run(args: &[&str]) -> Option<Output> {
    let bin = xmlmodel_bin()?;
    Some(
        Command::new(bin)
            .args(args)
            .output()
            .expect("Failed to execute command"),
    )
}

// ============================================================================
// Compile Command Tests
// ============================================================================

#[test]
fn test_cli_compile_summary() {
    let Some(output) = run(&["compile", "(a, b+)"]) else {
        return;
    };
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "compile should succeed");
    assert!(stdout.contains("Content model:"));
    assert!(stdout.contains("Mixed: false"));
    assert!(stdout.contains("Empty content valid: false"));
    assert!(stdout.contains("States:"));
    assert!(stdout.contains("Transitions:"));
}

#[test]
fn test_cli_compile_json() {
    let Some(output) = run(&["compile", "--json", "(#PCDATA | em)*"]) else {
        return;
    };
    assert!(output.status.success());

    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("compile --json should print JSON");
    assert_eq!(json["mixed"], serde_json::Value::Bool(true));
    assert_eq!(json["empty_content_is_valid"], serde_json::Value::Bool(true));
}

#[test]
fn test_cli_compile_reports_syntax_errors() {
    let Some(output) = run(&["compile", "(a, b"]) else {
        return;
    };
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));
}

// ============================================================================
// Check Command Tests
// ============================================================================

#[test]
fn test_cli_check_valid() {
    let Some(output) = run(&["check", "(a, b+)", "a", "b", "b"]) else {
        return;
    };
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "valid");
}

#[test]
fn test_cli_check_invalid() {
    let Some(output) = run(&["check", "(a, b+)", "b"]) else {
        return;
    };
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "invalid at 0");
}

#[test]
fn test_cli_check_incomplete() {
    let Some(output) = run(&["check", "(a, b+)", "a"]) else {
        return;
    };
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "incomplete at 1");
}

#[test]
fn test_cli_check_text_child() {
    let Some(output) = run(&["check", "(#PCDATA | b)*", "#text", "b", "#text"]) else {
        return;
    };
    assert!(output.status.success());
}

// ============================================================================
// Validate Command Tests
// ============================================================================

const VALID_DOC: &str = r#"<?xml version="1.0"?>
<!DOCTYPE list [
  <!ELEMENT list (item*)>
  <!ELEMENT item (#PCDATA)>
]>
<list><item>one</item><item>two</item></list>
"#;

#[test]
fn test_cli_validate_valid_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("valid.xml");
    std::fs::write(&path, VALID_DOC).unwrap();

    let Some(output) = run(&["validate", path.to_str().unwrap()]) else {
        return;
    };
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Document is valid"));
}

#[test]
fn test_cli_validate_invalid_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("invalid.xml");
    std::fs::write(&path, VALID_DOC.replace("<item>two</item>", "<other/>")).unwrap();

    let Some(output) = run(&["validate", path.to_str().unwrap()]) else {
        return;
    };
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout.contains("Document is invalid"));
    assert!(stdout.contains("Path: /list"));
}

#[test]
fn test_cli_validate_missing_file() {
    let Some(output) = run(&["validate", "does-not-exist.xml"]) else {
        return;
    };
    assert!(!output.status.success());
}
