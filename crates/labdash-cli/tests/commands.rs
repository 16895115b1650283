//! End-to-end tests running the `labdash` binary
//!
//! ## Exit Code Contract
//!
//! | Exit Code | Meaning |
//! |-----------|---------|
//! | 0 | Success, including a filter that matches no rows |
//! | 1 | Source unreachable or malformed, invalid config or arguments |

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::tempdir;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/registro.csv")
}

fn labdash() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_labdash"));
    cmd.env_remove("LABDASH_CONFIG")
        .env_remove("LABDASH_SECRET")
        .env_remove("RUST_LOG");
    cmd
}

/// Run a view command against the fixture with a fixed reference date
fn run_view(command: &str, args: &[&str]) -> Output {
    labdash()
        .arg(command)
        .arg("--source")
        .arg(fixture())
        .args(["--today", "01/03/2024"])
        .args(args)
        .output()
        .expect("failed to execute labdash")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

// =============================================================================
// show
// =============================================================================

#[test]
fn show_prints_metrics_and_detail() {
    let output = run_view("show", &[]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("Samples shown: 4 of 4"));
    assert!(out.contains("Total quantity: 10"));
    assert!(out.contains("Ensaios Química: 2"));
    assert!(out.contains("Ensaios Física: 1"));
    assert!(out.contains("Milho, safrinha"));
}

#[test]
fn show_with_filters() {
    let output = run_view("show", &["--filter", "Matriz=Solo", "--filter", "Técnico=Carla"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Samples shown: 1 of 4"));

    let output = run_view("show", &["-f", "Matriz=Solo", "-f", "Matriz=Água"]);
    assert!(stdout(&output).contains("Samples shown: 3 of 4"));
}

#[test]
fn show_no_match_is_not_an_error() {
    let output = run_view("show", &["--filter", "Demandante=Ninguém"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("No rows match the selected filters."));
}

#[test]
fn show_json_is_parseable() {
    let output = run_view("show", &["--format", "json"]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["total_rows"], 4);
    assert_eq!(json["role"], "viewer");
    let columns = json["detail"]["columns"].as_array().unwrap();
    assert!(columns.iter().any(|c| c == "Boletim"));
    assert!(!columns.iter().any(|c| c == "Observação"));
}

#[test]
fn viewer_json_excludes_hidden_columns() {
    let output = run_view("show", &["--format", "json"]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let visible = json["visible_columns"].as_array().unwrap();
    assert!(!visible.iter().any(|c| c == "Física"));
    assert!(json.get("filtered").is_none());
    // only cell of the hidden Física column
    assert!(!stdout(&output).contains("Turbidez"));
}

#[test]
fn malformed_filter_fails() {
    let output = run_view("show", &["--filter", "Matriz"]);
    assert_eq!(output.status.code(), Some(1));
}

// =============================================================================
// facets / metrics
// =============================================================================

#[test]
fn facets_lists_options_from_unfiltered_table() {
    let output = run_view("facets", &["--filter", "Matriz=Solo"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("Matriz (3 options)"));
    assert!(out.contains("Técnico (3 options)"));
    assert!(out.contains("  Planta"));
}

#[test]
fn metrics_json() {
    let output = run_view("metrics", &["--format", "json", "--filter", "Demandante=CPAO"]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["displayed_row_count"], 2);
}

// =============================================================================
// timeline / export
// =============================================================================

#[test]
fn timeline_text_excludes_rows_without_deadline() {
    let output = run_view("timeline", &[]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("B-01"));
    assert!(out.contains("B-04"));
    assert!(out.contains("Overdue"));
    assert!(!out.contains("B-03"));
}

#[test]
fn timeline_mermaid_to_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("timeline.mmd");
    let output = run_view("timeline", &["--format", "mermaid", "-o", path.to_str().unwrap()]);
    assert!(output.status.success());
    let content = fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("gantt"));
    assert!(content.contains("B-01 :done"));
}

#[test]
fn export_writes_workbook() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("amostras.xlsx");
    let output = run_view("export", &["-o", path.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Exported 4 rows"));
    let bytes = fs::read(&path).unwrap();
    assert_eq!(&bytes[0..2], b"PK");
}

// =============================================================================
// access
// =============================================================================

#[test]
fn editor_secret_unlocks_columns() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("labdash.toml");
    fs::write(&config, "[access]\neditor_secret = \"s3cret\"\n").unwrap();

    let output = run_view("show", &["--config", config.to_str().unwrap(), "--columns", "Boletim"]);
    // viewer: --columns ignored, defaults shown
    assert!(stdout(&output).contains("Demandante"));

    let output = labdash()
        .env("LABDASH_SECRET", "s3cret")
        .args(["show", "--config", config.to_str().unwrap(), "--source"])
        .arg(fixture())
        .args(["--columns", "Boletim"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("Boletim"));
    assert!(!out.contains("Demandante"));
}

// =============================================================================
// failures / init
// =============================================================================

#[test]
fn unreachable_source_exits_1() {
    let dir = tempdir().unwrap();
    let output = labdash()
        .args(["show", "--source"])
        .arg(dir.path().join("missing.csv"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Could not load the sample register"));
    assert!(output.stdout.is_empty());
}

#[test]
fn invalid_config_exits_1() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("bad.toml");
    fs::write(&config, "[source]\ncache_ttl_secs = 0\n").unwrap();
    let output = run_view("show", &["--config", config.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn init_creates_config_and_refuses_overwrite() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("labdash.toml");

    let output = labdash().args(["init", "-o"]).arg(&path).output().unwrap();
    assert!(output.status.success());
    assert!(stdout(&output).contains("Created:"));
    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("[source]"));
    assert!(content.contains("REGISTRO"));

    let output = labdash().args(["init", "-o"]).arg(&path).output().unwrap();
    assert_eq!(output.status.code(), Some(1));

    let output = labdash().args(["init", "--force", "-o"]).arg(&path).output().unwrap();
    assert!(output.status.success());

    // the written file is accepted as a config
    let output = run_view("metrics", &["--config", path.to_str().unwrap()]);
    assert!(output.status.success());
}
