// ABOUTME: Integration tests for config-driven entry points.
// ABOUTME: Covers worker listing and status file lookup through the config file.

use botswarm::{list_workers, load_config, read_status, GroupState, StatusSnapshot};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", content).unwrap();
    file
}

#[test]
fn test_list_workers_from_config() {
    let file = write_config(
        r#"
        command = ["python3", "main.py"]

        [[workers]]
        tag = "BTCUSDT"
        working_dir = "/srv/bots/btc"

        [[workers]]
        tag = "ETHUSDT"
        working_dir = "/srv/bots/eth"
    "#,
    );

    let specs = list_workers(Some(file.path().to_path_buf())).unwrap();
    let tags: Vec<&str> = specs.iter().map(|s| s.tag()).collect();
    assert_eq!(tags, vec!["BTCUSDT", "ETHUSDT"]);
}

#[test]
fn test_load_config_missing_file() {
    let err = load_config(Some("/nonexistent/botswarm.toml".into())).unwrap_err();
    assert!(err.to_string().contains("Failed to read config"));
}

#[test]
fn test_read_status_via_config() {
    let dir = tempfile::tempdir().unwrap();
    let status_path = dir.path().join("status.json");
    let status = r#"{
        "timestamp": "2026-01-01T00:00:00Z",
        "state": "running",
        "total_workers": 1,
        "running_workers": 1,
        "workers": [
            {"tag": "BTCUSDT", "working_dir": "/srv/btc", "pid": 42, "running": true, "exit_code": null, "signal": null}
        ]
    }"#;
    std::fs::write(&status_path, status).unwrap();

    let file = write_config(&format!(
        "command = [\"./bot\"]\nstatus_file = \"{}\"",
        status_path.display()
    ));

    let snapshot: StatusSnapshot = read_status(None, Some(file.path().to_path_buf())).unwrap();
    assert_eq!(snapshot.state, GroupState::Running);
    assert_eq!(snapshot.workers[0].pid, Some(42));
}

#[test]
fn test_read_status_without_status_file() {
    let file = write_config(r#"command = ["./bot"]"#);
    let err = read_status(None, Some(file.path().to_path_buf())).unwrap_err();
    assert!(err.to_string().contains("No status_file set"));
}
