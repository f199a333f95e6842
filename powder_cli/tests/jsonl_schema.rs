use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use assert_cmd::Command;
use tempfile::tempdir;

fn write_config(dir: &Path) -> PathBuf {
    let toml = format!(
        r#"
[storage]
dir = "{}"

[network]
mode = "station"
ip = "10.0.0.7"
rssi = -48
"#,
        dir.join("data").display().to_string().replace('\\', "/")
    );
    let path = dir.join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn json_lines(bytes: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(bytes)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap_or_else(|e| panic!("not JSON ({e}): {l}")))
        .collect()
}

/// Every stdout line of a JSON run is a JSON document; snapshots carry the
/// full state schema and the run ends with a summary line.
#[rstest]
fn snapshot_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path());

    let out = Command::cargo_bin("powdersense")
        .unwrap()
        .env_remove("RUST_LOG")
        .arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--ticks", "30", "--no-delay"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let lines = json_lines(&out);

    let snap = lines
        .iter()
        .find(|v| v.get("currentWeight").is_some())
        .expect("no snapshot line");
    for key in [
        "currentWeight",
        "currentAdc",
        "lowThreshold",
        "highThreshold",
        "rssi",
        "uptime",
        "calibrationState",
        "currentConfigIndex",
    ] {
        assert!(snap[key].is_number(), "{key} should be a number: {snap}");
    }
    for key in ["alarmActive", "alarmEnabled", "wifiConnected", "isCalibrated", "isStable"] {
        assert!(snap[key].is_boolean(), "{key} should be a bool");
    }
    assert_eq!(snap["ipAddress"], "10.0.0.7");
    assert!(snap["powderConfigs"].is_array());
    assert!(snap["recentMeasurements"].is_array());
    assert!(snap["sessionLogs"].is_array());
    for key in [
        "averageWeight",
        "standardDeviation",
        "minWeight",
        "maxWeight",
        "totalMeasurements",
        "sessionMeasurements",
    ] {
        assert!(snap["stats"][key].is_number(), "stats.{key} missing");
    }
    // no active profile
    assert!(snap.get("currentConfig").is_none());

    let summary = &lines.last().unwrap()["runSummary"];
    assert_eq!(summary["ticks"], 30);
    assert_eq!(summary["end"], "tickLimit");
}

/// Replies to stdin queries are wrapped with status and content type.
#[rstest]
fn reply_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path());

    let out = Command::cargo_bin("powdersense")
        .unwrap()
        .env_remove("RUST_LOG")
        .arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--ticks", "200"])
        .write_stdin("?export\n?session\n")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let replies: Vec<serde_json::Value> = json_lines(&out)
        .into_iter()
        .filter_map(|v| v.get("reply").cloned())
        .collect();
    assert_eq!(replies.len(), 2, "replies: {replies:?}");

    assert_eq!(replies[0]["status"], 200);
    assert_eq!(replies[0]["contentType"], "text/csv");
    assert!(
        replies[0]["body"]
            .as_str()
            .unwrap()
            .starts_with("Timestamp,Weight(grains),Config Name")
    );
    assert_eq!(replies[1]["status"], 400);
    assert_eq!(replies[1]["client"], 0);
}

/// With --json, failures are reported on stderr as a JSON object.
#[rstest]
fn error_schema() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[capacity]\nprofiles = 0\n").unwrap();

    let out = Command::cargo_bin("powdersense")
        .unwrap()
        .env_remove("RUST_LOG")
        .arg("--json")
        .arg("--config")
        .arg(&path)
        .arg("self-check")
        .assert()
        .code(1)
        .get_output()
        .stderr
        .clone();
    let err = json_lines(&out)
        .into_iter()
        .find(|v| v.get("exitCode").is_some())
        .expect("no JSON error object on stderr");
    assert_eq!(err["reason"], "Error");
    assert_eq!(err["exitCode"], 1);
    assert!(err["message"].as_str().unwrap().contains("capacity.profiles"));
}
