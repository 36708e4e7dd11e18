//! Integration tests for lpuctl
//!
//! Every command runs against the in-memory reader or recorded responses,
//! so no hardware is needed.

use assert_cmd::Command;
use insta::assert_snapshot;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Custom predicate to check if output is valid JSON
fn is_json() -> impl predicates::Predicate<[u8]> {
    predicates::function::function(|s: &[u8]| {
        if let Ok(text) = std::str::from_utf8(s) {
            serde_json::from_str::<Value>(text).is_ok()
        } else {
            false
        }
    })
}

/// Test helper to create an lpuctl command
fn lpuctl() -> Result<Command, Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("lpuctl")?;
    cmd.env_remove("LPUCTL_CONFIG").env_remove("RUST_LOG");
    Ok(cmd)
}

fn write_file(dir: &TempDir, name: &str, contents: &str) -> Result<PathBuf, std::io::Error> {
    let path = dir.path().join(name);
    fs::write(&path, contents)?;
    Ok(path)
}

fn stdout_json(output: &std::process::Output) -> Result<Value, Box<dyn std::error::Error>> {
    Ok(serde_json::from_slice(&output.stdout)?)
}

const SETTINGS: &str = r#"<lpu237>
  <common interface="rs232"/>
</lpu237>"#;

/// Answers for a system-info sequence from a 5.20 reader named LPU237.
const SYSTEM_INFO_RESPONSES: &str = "\
# enter config
52ff00
# version, structure version
52ff0405140000
52ff0404000000
# is-standard, is-ibutton-only
52ff00
528000
# name
52ff104c505532333700000000000000000000
# leave config
52ff00
";

#[test]
fn test_cli_help() -> TestResult {
    lpuctl()?
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("LPU237"));
    Ok(())
}

#[test]
fn test_cli_version() -> TestResult {
    lpuctl()?
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("lpuctl"));
    Ok(())
}

#[test]
fn test_completion_generation() -> TestResult {
    lpuctl()?
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lpuctl"));
    Ok(())
}

#[test]
fn test_plan_system_info_json() -> TestResult {
    let output = lpuctl()?
        .args(["--json", "plan", "system-info"])
        .assert()
        .success()
        .stdout(is_json())
        .get_output()
        .clone();
    let json = stdout_json(&output)?;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["sequence"], "system-info");
    let wires: Vec<&str> = json["data"]["requests"]
        .as_array()
        .ok_or("requests should be an array")?
        .iter()
        .filter_map(|r| r["wire"].as_str())
        .collect();
    assert_eq!(
        wires,
        [
            "580000",
            "41c9081c00000004000000",
            "41c9080800000004000000",
            "440000",
            "570000",
            "41c9080c00000010000000",
            "590000"
        ]
    );
    Ok(())
}

#[test]
fn test_snapshot_plan_bootloader() -> TestResult {
    let output = lpuctl()?
        .args(["--json", "plan", "bootloader"])
        .assert()
        .success()
        .get_output()
        .clone();
    let json = stdout_json(&output)?;
    let wires: Vec<&str> = json["data"]["requests"]
        .as_array()
        .ok_or("requests should be an array")?
        .iter()
        .filter_map(|r| r["wire"].as_str())
        .collect();
    assert_snapshot!(wires.join(" "), @"580000 470000");
    Ok(())
}

#[test]
fn test_plan_with_settings_writes_interface() -> TestResult {
    let dir = TempDir::new()?;
    let settings = write_file(&dir, "lpu237.xml", SETTINGS)?;
    lpuctl()?
        .args(["plan", "set-parameters", "--settings"])
        .arg(&settings)
        .assert()
        .success()
        .stdout(predicate::str::contains("41c8092a000000010000000a"))
        .stdout(predicate::str::contains("420000"));
    Ok(())
}

#[test]
fn test_plan_clean_model_sends_nothing() -> TestResult {
    lpuctl()?
        .args(["plan", "set-parameters"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to send"));
    Ok(())
}

#[test]
fn test_plan_missing_settings_file_fails() -> TestResult {
    lpuctl()?
        .args(["plan", "set-parameters", "--settings", "/nonexistent/lpu237.xml"])
        .assert()
        .failure()
        .code(4)
        .stderr(predicate::str::contains("Error:"));
    Ok(())
}

#[test]
fn test_decode_response() -> TestResult {
    let output = lpuctl()?
        .args(["--json", "decode", "response", "52ff0405140000"])
        .assert()
        .success()
        .get_output()
        .clone();
    let json = stdout_json(&output)?;
    assert_eq!(json["data"]["result"], 255);
    assert_eq!(json["data"]["strictly_good"], true);
    assert_eq!(json["data"]["payload"], "05140000");
    Ok(())
}

#[test]
fn test_decode_invalid_response_exit_code() -> TestResult {
    lpuctl()?
        .args(["decode", "response", "41ff00"])
        .assert()
        .failure()
        .code(4)
        .stderr(predicate::str::contains("not an LPU237 response"));
    Ok(())
}

#[test]
fn test_decode_invalid_response_json_error() -> TestResult {
    lpuctl()?
        .args(["--json", "decode", "response", "zz"])
        .assert()
        .failure()
        .stdout(is_json())
        .stdout(predicate::str::contains("\"success\": false"));
    Ok(())
}

#[test]
fn test_decode_swipe_frame() -> TestResult {
    let output = lpuctl()?
        .args(["--json", "decode", "frame", "02ff002122"])
        .assert()
        .success()
        .get_output()
        .clone();
    let json = stdout_json(&output)?;
    assert_eq!(json["data"]["kind"], "msr");
    assert_eq!(json["data"]["tracks"][0]["data"], "AB");
    assert_eq!(json["data"]["tracks"][1]["error"], -1);
    Ok(())
}

#[test]
fn test_simulate_settings_round_trip() -> TestResult {
    let dir = TempDir::new()?;
    let settings = write_file(&dir, "lpu237.xml", SETTINGS)?;
    let output = lpuctl()?
        .args(["--format", "json", "simulate", "-q", "set-parameters", "--settings"])
        .arg(&settings)
        .assert()
        .success()
        .get_output()
        .clone();
    let json = stdout_json(&output)?;
    let data = &json["data"];
    assert_eq!(data["import"]["changed"], 1);
    assert_eq!(data["runs"][0]["sequence"], "set-parameters");
    assert_eq!(data["runs"][0]["rejected"], 0);
    assert_eq!(data["applies"], 1);
    assert_eq!(data["config"]["interface"], "rs232");
    assert_eq!(data["config"]["version"], "5.20.0.0");
    Ok(())
}

#[test]
fn test_simulate_uses_config_profile() -> TestResult {
    let dir = TempDir::new()?;
    let config = write_file(
        &dir,
        "lpuctl.yaml",
        "device:\n  ibutton_only: true\noutput:\n  format: json\n",
    )?;
    let output = lpuctl()?
        .arg("--config")
        .arg(&config)
        .args(["simulate", "-q", "enable-read"])
        .assert()
        .success()
        .stdout(is_json())
        .get_output()
        .clone();
    let json = stdout_json(&output)?;
    assert_eq!(json["data"]["config"]["function"], "i_button_only");
    Ok(())
}

#[test]
fn test_simulate_yaml_output() -> TestResult {
    lpuctl()?
        .args(["--format", "yaml", "simulate", "-q", "disable-read"])
        .assert()
        .success()
        .stdout(predicate::str::contains("success: true"));
    Ok(())
}

#[test]
fn test_invalid_config_file_exit_code() -> TestResult {
    let dir = TempDir::new()?;
    let config = write_file(&dir, "lpuctl.yaml", "device:\n  uid: \"0102\"\n")?;
    lpuctl()?
        .arg("--config")
        .arg(&config)
        .args(["simulate"])
        .assert()
        .failure()
        .code(3);
    Ok(())
}

#[test]
fn test_replay_system_info() -> TestResult {
    let dir = TempDir::new()?;
    let responses = write_file(&dir, "session.txt", SYSTEM_INFO_RESPONSES)?;
    let output = lpuctl()?
        .arg("--json")
        .arg("replay")
        .arg(&responses)
        .assert()
        .success()
        .get_output()
        .clone();
    let json = stdout_json(&output)?;
    let data = &json["data"];
    assert_eq!(data["runs"][0]["sent"], 7);
    assert_eq!(data["unused_responses"], 0);
    assert_eq!(data["config"]["name"], "LPU237");
    assert_eq!(data["config"]["version"], "5.20.0.0");
    assert_eq!(data["config"]["function"], "msr_and_i_button");
    assert_eq!(data["sent"][0], "580000");
    Ok(())
}

#[test]
fn test_replay_runs_out_of_responses() -> TestResult {
    let dir = TempDir::new()?;
    let responses = write_file(&dir, "short.txt", "52ff00\n52ff0405140000\n")?;
    lpuctl()?
        .arg("replay")
        .arg(&responses)
        .assert()
        .failure()
        .code(5);
    Ok(())
}

#[test]
fn test_replay_empty_file_rejected() -> TestResult {
    let dir = TempDir::new()?;
    let responses = write_file(&dir, "empty.txt", "# nothing recorded\n")?;
    lpuctl()?
        .arg("replay")
        .arg(&responses)
        .assert()
        .failure()
        .code(4)
        .stderr(predicate::str::contains("holds no responses"));
    Ok(())
}
