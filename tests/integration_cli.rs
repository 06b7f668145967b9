//! Runs the `pdf-compare` binary against real directories.

mod common;

use assert_fs::prelude::*;
use assert_fs::TempDir;
use common::write_text_pdf;
use predicates::prelude::*;
use std::process::{Command, Output};

fn pdf_compare(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pdf-compare"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

/// Input directories with one changed and one identical pair, plus an
/// empty settings file so no user config leaks in
fn workspace() -> TempDir {
    let temp = TempDir::new().unwrap();
    write_text_pdf(temp.child("from").path(), "a.pdf", &[&["alpha beta"]]);
    write_text_pdf(temp.child("to").path(), "a.pdf", &[&["alpha gamma"]]);
    write_text_pdf(temp.child("from").path(), "b.pdf", &[&["same"]]);
    write_text_pdf(temp.child("to").path(), "b.pdf", &[&["same"]]);
    temp.child("settings.json").write_str("{}").unwrap();
    temp
}

fn path(temp: &TempDir, name: &str) -> String {
    temp.child(name).path().display().to_string()
}

#[test]
fn json_output_summarizes_the_run() {
    let temp = workspace();

    let output = pdf_compare(&[
        "compare",
        &path(&temp, "from"),
        &path(&temp, "to"),
        &path(&temp, "out"),
        "--config",
        &path(&temp, "settings.json"),
        "--only-diff-text",
        "--sort",
        "--output",
        "json",
    ]);

    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["total_pairs"], 2);
    assert_eq!(summary["failed"], 0);
    assert_eq!(summary["results"][0]["pair_id"], "a.pdf");

    temp.child("out/results.csv").assert(predicate::path::exists());
    temp.child("out/report.json").assert(predicate::str::contains("\"rows\": 2"));
    temp.child("out/diff/a.pdf.patch")
        .assert(predicate::str::contains("+alpha gamma"));
}

#[test]
fn minimal_output_lists_pairs_that_differ() {
    let temp = workspace();

    let output = pdf_compare(&[
        "compare",
        &path(&temp, "from"),
        &path(&temp, "to"),
        &path(&temp, "out"),
        "--config",
        &path(&temp, "settings.json"),
        "--output",
        "minimal",
    ]);

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "a.pdf\n");
}

#[test]
fn settings_file_supplies_directories() {
    let temp = workspace();
    let settings = serde_json::json!({
        "from": temp.child("from").path(),
        "to": temp.child("to").path(),
        "result": temp.child("report").path(),
        "onlyDiffText": true,
        "html": true,
    });
    temp.child("run.json").write_str(&settings.to_string()).unwrap();

    let output = pdf_compare(&[
        "compare",
        "--config",
        &path(&temp, "run.json"),
        "--output",
        "json",
    ]);

    assert!(output.status.success());
    temp.child("report/a.pdf.html").assert(predicate::path::exists());
}

#[test]
fn incompatible_strategies_fail_before_running() {
    let temp = workspace();

    let output = pdf_compare(&[
        "compare",
        &path(&temp, "from"),
        &path(&temp, "to"),
        &path(&temp, "out"),
        "--config",
        &path(&temp, "settings.json"),
        "--extractor",
        "raster",
        "--comparator",
        "char-diff",
    ]);

    assert!(!output.status.success());
    assert!(predicate::str::contains("Configuration error")
        .eval(&String::from_utf8_lossy(&output.stderr)));
    temp.child("out").assert(predicate::path::missing());
}

#[test]
fn missing_input_directory_fails() {
    let temp = workspace();

    let output = pdf_compare(&[
        "compare",
        &path(&temp, "nowhere"),
        &path(&temp, "to"),
        &path(&temp, "out"),
        "--config",
        &path(&temp, "settings.json"),
        "--output",
        "minimal",
    ]);

    assert!(!output.status.success());
    assert!(predicate::str::contains("Directory not found")
        .eval(&String::from_utf8_lossy(&output.stderr)));
}
