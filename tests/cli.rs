use std::process::Command;

use tempfile::TempDir;

#[test]
fn fatal_error_exits_non_zero_with_one_message() {
    let dir = TempDir::new().expect("temp dir");
    let output = Command::new(env!("CARGO_BIN_EXE_jira-harvest"))
        .arg("--projects")
        .arg("PROJ")
        .arg("--output")
        .arg(dir.path().join("out.jsonl"))
        .arg("--config")
        .arg(dir.path().join("missing.toml"))
        .output()
        .expect("run binary");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("config file not found").count(), 1, "{stderr}");
    assert!(stderr.contains("[ERROR] aborting run: config file not found"), "{stderr}");
    assert!(!stderr.contains("MissingConfigFile"), "{stderr}");
    assert!(!dir.path().join("out.jsonl").exists());
}
