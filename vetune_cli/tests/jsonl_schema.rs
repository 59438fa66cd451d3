use assert_cmd::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_inputs(dir: &tempfile::TempDir) -> (PathBuf, PathBuf) {
    let cfg = dir.path().join("cfg.toml");
    fs::write(
        &cfg,
        r#"
[targets]
table = [{ map_kpa = 50, afr = 13.5 }, { map_kpa = 60, afr = 13.0 }]

[sampler]
poll_hz = 500
read_timeout_ms = 50
"#,
    )
    .unwrap();
    let log = dir.path().join("ride.csv");
    let mut text = String::from("rpm,map_kpa,afr\n");
    for _ in 0..7 {
        text.push_str("3050,55,13.0\n");
    }
    fs::write(&log, text).unwrap();
    (cfg, log)
}

/// Validate the JSONL schema for a successful replay.
#[rstest]
fn jsonl_replay_schema() {
    let dir = tempdir().unwrap();
    let (cfg, log) = write_inputs(&dir);

    let mut cmd = Command::cargo_bin("vetune").unwrap();
    cmd.arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .arg("replay")
        .arg("--log")
        .arg(&log);

    let out = cmd.assert().success().get_output().stdout.clone();
    let stdout = String::from_utf8_lossy(&out);
    let line = stdout
        .lines()
        .find(|l| l.contains("\"correction\""))
        .unwrap_or("")
        .to_string();
    assert!(
        !line.is_empty(),
        "no JSONL line with correction found; stdout was: {stdout}"
    );

    let v: serde_json::Value = serde_json::from_str(&line).expect("valid JSON");

    assert!(v.get("timestamp").and_then(|x| x.as_i64()).is_some());
    assert!(v.get("duration_ms").and_then(|x| x.as_u64()).is_some());
    assert_eq!(v["preset"], "custom");
    assert_eq!(v["end"], "end_of_stream");
    assert_eq!(v["ticks"], 7);
    assert_eq!(v["accumulated"], 7);
    assert_eq!(v["total_hits"], 14);

    let rpm_bins = v["rpm_bins"].as_array().unwrap();
    let map_bins = v["map_bins"].as_array().unwrap();
    let corr = v["correction"].as_array().unwrap();
    let hits = v["hits"].as_array().unwrap();
    assert_eq!(corr.len(), rpm_bins.len());
    assert_eq!(hits.len(), rpm_bins.len());
    assert!(corr.iter().all(|r| r.as_array().unwrap().len() == map_bins.len()));

    let c23 = corr[2][3].as_f64().unwrap();
    assert!((c23 - 13.0 / 13.5).abs() < 1e-9);
    assert_eq!(hits[2][3], 7);
    assert_eq!(hits[3][3], 0);

    // Last tick was live and above the floor, so a trace is present.
    let trace = &v["active_trace"];
    assert_eq!(trace["rpm_idx"], 2);
    assert_eq!(trace["map_idx"], 3);
    assert_eq!(trace["cells"].as_array().unwrap().len(), 4);
}

/// Validate the JSON error schema on stderr.
#[rstest]
fn json_error_schema() {
    let dir = tempdir().unwrap();
    let (cfg, _) = write_inputs(&dir);

    let mut cmd = Command::cargo_bin("vetune").unwrap();
    cmd.arg("--json")
        .arg("--config")
        .arg(&cfg)
        .arg("--preset")
        .arg("flathead")
        .arg("self-check");

    let out = cmd.assert().code(4).get_output().stderr.clone();
    let stderr = String::from_utf8_lossy(&out);
    let line = stderr
        .lines()
        .find(|l| l.contains("\"reason\""))
        .unwrap_or("")
        .to_string();
    let v: serde_json::Value = serde_json::from_str(&line).expect("valid JSON");
    assert_eq!(v["reason"], "UnknownPreset");
    assert_eq!(v["exit_code"], 4);
    assert!(v["message"].as_str().unwrap().contains("flathead"));
}

/// `presets --json` emits one object per preset.
#[rstest]
fn presets_json_lines() {
    let out = Command::cargo_bin("vetune")
        .unwrap()
        .arg("--json")
        .arg("presets")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8_lossy(&out);
    let rows: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).expect("valid JSON"))
        .collect();
    assert_eq!(rows.len(), 5);
    let m8 = rows.iter().find(|r| r["preset"] == "harley_m8").unwrap();
    assert_eq!(m8["rows"], 16);
    assert_eq!(m8["cols"], 17);
}
