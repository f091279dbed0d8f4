use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

fn write_config(dir: &Path, settings: serde_json::Value) -> std::path::PathBuf {
    let path = dir.join("maintenance-config.json");
    fs::write(
        &path,
        serde_json::json!({ "settings": settings }).to_string(),
    )
    .unwrap();
    path
}

fn workspace(dir: &TempDir) -> std::path::PathBuf {
    let ws = dir.path().join("workspaces").join("main");
    fs::create_dir_all(ws.join(".metadata/.plugins")).unwrap();
    fs::write(ws.join(".metadata/.log"), "old log").unwrap();
    ws
}

fn reports(dir: &Path) -> Vec<std::path::PathBuf> {
    fs::read_dir(dir)
        .map(|rd| rd.flatten().map(|e| e.path()).collect())
        .unwrap_or_default()
}

#[test]
fn test_run_writes_report_and_exits_zero() {
    let dir = tempdir().unwrap();
    let ws = workspace(&dir);
    let reports_dir = dir.path().join("reports");
    let config = write_config(
        dir.path(),
        serde_json::json!({
            "edt": {
                "searchPaths": [dir.path().join("workspaces")],
                "sizeThresholdGB": 0,
                "processNames": ["no-such-ide-7d0a"]
            },
            "general": {"reportsPath": reports_dir}
        }),
    );

    Command::cargo_bin("sweeper")
        .unwrap()
        .args(["run", "--silent", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    assert!(!ws.join(".metadata/.log").exists());

    let written = reports(&reports_dir);
    assert_eq!(written.len(), 1);
    let name = written[0].file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("report_") && name.ends_with(".json"), "{name}");

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&written[0]).unwrap()).unwrap();
    assert_eq!(report["summary"]["workspacesProcessed"], 1);
    assert_eq!(report["summary"]["workspacesSuccess"], 1);
    assert_eq!(report["edtWorkspaces"][0]["actions"][0], "clear_logs");
    assert_eq!(report["edtWorkspaces"][0]["filesDeleted"], 1);
    assert!(report.get("gitRepositories").is_none());
}

#[test]
fn test_run_prints_summary_when_not_silent() {
    let dir = tempdir().unwrap();
    workspace(&dir);
    let config = write_config(
        dir.path(),
        serde_json::json!({
            "edt": {
                "explicitPaths": [dir.path().join("workspaces/main")],
                "sizeThresholdGB": 5,
                "processNames": []
            },
            "database": {
                "searchPaths": [dir.path().join("no-bases")],
                "platformRoots": [dir.path().join("no-platform")]
            },
            "general": {"reportsPath": dir.path().join("reports")}
        }),
    );

    Command::cargo_bin("sweeper")
        .unwrap()
        .args(["run", "-c"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Summary"))
        .stdout(predicate::str::contains("Skipped"))
        .stdout(predicate::str::contains("1C platform not found (version mask: any)"))
        .stderr(predicate::str::contains("1C platform not found"));
}

#[test]
fn test_silent_mode_from_config() {
    let dir = tempdir().unwrap();
    let config = write_config(
        dir.path(),
        serde_json::json!({
            "edt": {"explicitPaths": [], "processNames": []},
            "general": {"reportsPath": dir.path().join("reports"), "silentMode": true}
        }),
    );

    Command::cargo_bin("sweeper")
        .unwrap()
        .args(["run", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_missing_config_exits_one() {
    let dir = tempdir().unwrap();

    Command::cargo_bin("sweeper")
        .unwrap()
        .args(["run", "--config"])
        .arg(dir.path().join("absent.json"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration error"));

    assert!(reports(&dir.path().join("reports")).is_empty());
}

#[test]
fn test_malformed_config_exits_one() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("broken.json");
    fs::write(&config, "{ invalid json }").unwrap();

    Command::cargo_bin("sweeper")
        .unwrap()
        .args(["run", "-s", "-c"])
        .arg(&config)
        .assert()
        .code(1);
}

#[test]
fn test_encode_password() {
    Command::cargo_bin("sweeper")
        .unwrap()
        .args(["encode-password", "secret"])
        .assert()
        .success()
        .stdout("c2VjcmV0\n");
}

#[test]
fn test_locate_lists_candidates_without_touching_them() {
    let dir = tempdir().unwrap();
    let ws = workspace(&dir);
    let config = write_config(
        dir.path(),
        serde_json::json!({
            "edt": {"searchPaths": [dir.path().join("workspaces")]},
            "general": {"reportsPath": dir.path().join("reports")}
        }),
    );

    Command::cargo_bin("sweeper")
        .unwrap()
        .args(["locate", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("main"));

    assert!(ws.join(".metadata/.log").exists());
    assert!(reports(&dir.path().join("reports")).is_empty());
}
