#![allow(deprecated)] // cargo_bin! macro doesn't exist yet in assert_cmd 2.1

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

/// `mountctl` isolated from the user's config directory
fn mountctl(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("mountctl").unwrap();
    cmd.env("MOUNTCTL_CONFIG_DIR", config_dir.path());
    cmd.env_remove("RUST_LOG");
    cmd
}

fn serve(config_dir: &TempDir, input: &str) -> Vec<Value> {
    let output = mountctl(config_dir)
        .arg("serve")
        .write_stdin(input.to_string())
        .output()
        .expect("failed to run mountctl serve");
    assert!(output.status.success(), "serve failed: {output:?}");

    String::from_utf8(output.stdout)
        .expect("stdout is UTF-8")
        .lines()
        .map(|line| serde_json::from_str(line).expect("response is JSON"))
        .collect()
}

#[test]
fn help_lists_subcommands() {
    let config = TempDir::new().unwrap();
    mountctl(&config)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("types"))
        .stdout(predicate::str::contains("calls"));
}

#[test]
fn calls_lists_every_path() {
    let config = TempDir::new().unwrap();
    mountctl(&config)
        .arg("calls")
        .assert()
        .success()
        .stdout(predicate::str::contains("mount/mount"))
        .stdout(predicate::str::contains("mount/unmount"))
        .stdout(predicate::str::contains("mount/types"))
        .stdout(predicate::str::contains("mount/listmounts"));
}

#[test]
fn calls_json_includes_help() {
    let config = TempDir::new().unwrap();
    let output = mountctl(&config).args(["calls", "--json"]).output().unwrap();
    assert!(output.status.success());

    let calls: Vec<Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(calls.len(), 4);
    assert!(calls.iter().all(|c| c["authRequired"] == true));
    assert!(calls[0]["help"].as_str().unwrap().contains("mountPoint"));
}

#[cfg(target_os = "linux")]
#[test]
fn types_json_reports_bind() {
    let config = TempDir::new().unwrap();
    let output = mountctl(&config).args(["types", "--json"]).output().unwrap();
    assert!(output.status.success());

    let types: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(types["types"], serde_json::json!(["bind"]));
    // bind is not in the default priority list
    assert_eq!(types["default"], Value::Null);
    assert_eq!(types["priority"], serde_json::json!(["mount", "cmount", "mount2"]));
}

#[cfg(target_os = "linux")]
#[test]
fn config_priority_selects_default_backend() {
    let config = TempDir::new().unwrap();
    std::fs::write(
        config.path().join("config.toml"),
        "[control]\nbackend_priority = [\"mount\", \"bind\"]\n",
    )
    .unwrap();

    let output = mountctl(&config).args(["types", "--json"]).output().unwrap();
    assert!(output.status.success());
    let types: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(types["default"], "bind");
}

#[test]
fn explicit_config_must_exist() {
    let config = TempDir::new().unwrap();
    mountctl(&config)
        .args(["--config"])
        .arg(config.path().join("missing.toml"))
        .arg("types")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config"));
}

#[test]
fn malformed_config_is_reported() {
    let config = TempDir::new().unwrap();
    std::fs::write(config.path().join("config.toml"), "[control\n").unwrap();

    mountctl(&config)
        .arg("types")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid config"));
}

#[test]
fn serve_answers_list_calls_on_empty_state() {
    let config = TempDir::new().unwrap();
    let responses = serve(
        &config,
        "{\"id\": 1, \"path\": \"mount/listmounts\"}\n{\"id\": 2, \"path\": \"mount/types\"}\n",
    );

    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["id"], 1);
    assert_eq!(responses[0]["ok"], true);
    assert_eq!(responses[0]["result"]["mounts"], serde_json::json!([]));
    assert_eq!(responses[1]["ok"], true);
    assert!(responses[1]["result"]["types"].is_array());
}

#[test]
fn serve_rejects_bad_mount_requests() {
    let config = TempDir::new().unwrap();
    let source = TempDir::new().unwrap();
    let source_path = source.path().to_str().unwrap();

    let input = format!(
        r#"{{"id": 1, "path": "mount/mount", "params": {{"source": "{source_path}", "mountPoint": "/mnt/x", "backendName": "bogus"}}}}
{{"id": 2, "path": "mount/mount", "params": {{"source": "/does/not/exist", "mountPoint": "/mnt/x", "backendName": "bogus"}}}}
{{"id": 3, "path": "mount/mount", "params": {{"source": "{source_path}"}}}}
{{"id": 4, "path": "mount/mount", "params": {{"source": "{source_path}", "mountPoint": "/mnt/x"}}}}
{{"id": 5, "path": "mount/listmounts"}}
"#
    );
    let responses = serve(&config, &input);
    assert_eq!(responses.len(), 5);

    assert_eq!(responses[0]["error"]["kind"], "InvalidBackend");
    assert_eq!(responses[1]["error"]["kind"], "SourceResolutionFailed");
    assert!(
        responses[1]["error"]["message"]
            .as_str()
            .unwrap()
            .contains("/does/not/exist")
    );
    assert_eq!(responses[2]["error"]["kind"], "MissingParameter");
    // No priority backend is compiled in, so auto-selection finds nothing.
    assert_eq!(responses[3]["error"]["kind"], "InvalidBackend");
    assert_eq!(responses[4]["result"]["mounts"], serde_json::json!([]));
}

#[test]
fn serve_reports_not_found_and_unknown_calls() {
    let config = TempDir::new().unwrap();
    let responses = serve(
        &config,
        "{\"id\": \"a\", \"path\": \"mount/unmount\", \"params\": {\"mountPoint\": \"/mnt/none\"}}\n\
         {\"id\": \"b\", \"path\": \"mount/unmountall\"}\n\
         this is not json\n",
    );

    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0]["id"], "a");
    assert_eq!(responses[0]["error"]["kind"], "NotFound");
    assert_eq!(responses[1]["error"]["kind"], "UnknownCall");
    assert_eq!(responses[2]["error"]["kind"], "InvalidRequest");
}

#[cfg(target_os = "linux")]
#[test]
fn serve_bind_to_missing_mount_point_fails_cleanly() {
    let config = TempDir::new().unwrap();
    let source = TempDir::new().unwrap();
    let source_path = source.path().to_str().unwrap();
    let target = source.path().join("absent");
    let target_path = target.to_str().unwrap();

    let input = format!(
        r#"{{"id": 1, "path": "mount/mount", "params": {{"source": "{source_path}", "mountPoint": "{target_path}", "backendName": "bind"}}}}
{{"id": 2, "path": "mount/listmounts"}}
"#
    );
    let responses = serve(&config, &input);

    assert_eq!(responses[0]["error"]["kind"], "MountFailed");
    assert!(
        responses[0]["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Mount point does not exist")
    );
    assert_eq!(responses[1]["result"]["mounts"], serde_json::json!([]));
}
