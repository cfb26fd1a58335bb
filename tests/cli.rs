//! Exit status and error reporting of the one-shot `doc2json` binary.
//!
//! Generation never reaches a real provider here: the base URL points at a
//! closed local port, or no key is given at all.

#![cfg(feature = "cli")]

use std::path::Path;
use std::process::{Command, Output};

fn run(dir: &Path, extra: &[&str]) -> Output {
    std::fs::write(dir.join("invoice.txt"), "Invoice #123, total $45.00").unwrap();
    std::fs::write(dir.join("schema.json"), r#"{"invoice_number": ""}"#).unwrap();

    Command::new(env!("CARGO_BIN_EXE_doc2json"))
        .current_dir(dir)
        .args(["invoice.txt", "--schema", "schema.json", "--no-progress", "--quiet"])
        .args(extra)
        .env_remove("GROQ_API_KEY")
        .env_remove("DOC2JSON_BASE_URL")
        .env_remove("DOC2JSON_MODEL")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

#[test]
fn generation_error_is_reported_once() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(
        dir.path(),
        &["--api-key", "gsk_local", "--base-url", "http://127.0.0.1:1/openai/v1"],
    );
    let stderr = String::from_utf8_lossy(&out.stderr);

    assert_eq!(out.status.code(), Some(1), "stderr: {stderr}");
    assert_eq!(
        stderr
            .matches("An unexpected error occurred during generation")
            .count(),
        1,
        "stderr: {stderr}"
    );
    assert!(!stderr.contains("Generation failed"), "stderr: {stderr}");
    assert!(out.stdout.is_empty());
}

#[test]
fn missing_key_is_a_warning_exit() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(dir.path(), &[]);
    let stderr = String::from_utf8_lossy(&out.stderr);

    assert_eq!(out.status.code(), Some(2), "stderr: {stderr}");
    assert_eq!(stderr.matches("Please enter your API key").count(), 1);
}
