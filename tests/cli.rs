//! Binary-level smoke tests for the pipeline commands.

mod common;

use assert_cmd::Command;
use common::{RawRow, TestWorkspace, extract_csv};
use predicates::prelude::*;

fn binary() -> Command {
    Command::cargo_bin("medallion-managed").expect("binary under test")
}

#[test]
fn help_lists_the_pipeline_stages() {
    binary()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("ingest")
                .and(predicate::str::contains("standardize"))
                .and(predicate::str::contains("star"))
                .and(predicate::str::contains("validate")),
        );
}

#[test]
fn run_executes_the_whole_pipeline_and_validate_emits_json() {
    let workspace = TestWorkspace::new();
    let rows = (0..20).map(|i| RawRow::new(i + 1)).collect::<Vec<_>>();
    let input = workspace.write("extract.csv", &extract_csv(&rows));

    binary()
        .arg("run")
        .arg("--input")
        .arg(&input)
        .arg("--warehouse")
        .arg(workspace.warehouse())
        .arg("--batch-id")
        .arg("day1_initial")
        .assert()
        .success();

    binary()
        .arg("validate")
        .arg("--warehouse")
        .arg(workspace.warehouse())
        .arg("--json")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"row_counts\"")
                .and(predicate::str::contains("\"silver_v3\": 20"))
                .and(predicate::str::contains("\"fact_rows\": 20")),
        );
}

#[test]
fn fixes_upsert_then_list_shows_the_entry() {
    let workspace = TestWorkspace::new();
    binary()
        .arg("fixes")
        .arg("--warehouse")
        .arg(workspace.warehouse())
        .arg("--upsert")
        .arg("country:Espa\u{fffd}a=Espana")
        .assert()
        .success();

    binary()
        .arg("fixes")
        .arg("--warehouse")
        .arg(workspace.warehouse())
        .arg("--list")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("country")
                .and(predicate::str::contains("Espana")),
        );
}

#[test]
fn clean_before_audit_fails_with_a_missing_table_error() {
    let workspace = TestWorkspace::new();
    binary()
        .arg("clean")
        .arg("--warehouse")
        .arg(workspace.warehouse())
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}
