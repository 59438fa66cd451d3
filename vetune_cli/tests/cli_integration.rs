use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Minimal valid TOML config on the custom layout
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[engine]
preset = "custom"

[gates]
live_rpm_floor = 500
accumulate_rpm_floor = 800

[targets]
fallback_afr = 14.0
table = [[50, 13.5], [60, 13.0]]

[sampler]
poll_hz = 500
read_timeout_ms = 50
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

// Seven ticks between the 3000/4000 rpm and 50/60 kPa breakpoints, one paused
// tick, and one tick below the live floor.
fn write_log(dir: &tempfile::TempDir) -> PathBuf {
    let path = dir.path().join("ride.csv");
    let mut f = fs::File::create(&path).unwrap();
    writeln!(f, "rpm,map_kpa,afr,live").unwrap();
    for _ in 0..7 {
        writeln!(f, "3050,55,13.0,1").unwrap();
    }
    writeln!(f, "4000,80,12.0,0").unwrap();
    writeln!(f, "300,20,14.7,1").unwrap();
    path
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["presets"], 0, "harley_m8", "stdout")]
#[case(&["self-check"], 0, "OK: preset custom", "stdout")]
#[case(&["--preset", "sportbike_1000", "self-check"], 0, "sportbike_1000 (14 x 10)", "stdout")]
#[case(&["replay"], 2, "required", "stderr")]
#[case(&["replay", "--log", "x.csv", "--direct", "--hz", "5"], 2, "cannot be used with", "stderr")]
#[case(&["--preset", "evo", "self-check"], 4, "Unknown engine preset", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("vetune").unwrap();
    cmd.arg("--config").arg(&cfg);
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
fn cli_reports_bad_target_header() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let bad_csv = dir.path().join("targets.csv");
    let mut f = fs::File::create(&bad_csv).unwrap();
    writeln!(f, "kpa,target").unwrap();
    writeln!(f, "50,13.5").unwrap();

    let mut cmd = Command::cargo_bin("vetune").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("--targets")
        .arg(&bad_csv)
        .arg("self-check");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Invalid headers"));
}

#[rstest]
fn cli_reports_invalid_gates() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("bad.toml");
    fs::write(&cfg, "[gates]\nafr_min = 15.0\nafr_max = 12.0\n").unwrap();

    Command::cargo_bin("vetune")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("self-check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("gates.afr_max"));
}

#[rstest]
#[case::direct(&["--direct"])]
#[case::sampler(&["--hz", "1000"])]
fn replay_prints_table_and_writes_grid(#[case] mode: &[&str]) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let log = write_log(&dir);
    let out = dir.path().join("corrections.csv");

    let mut cmd = Command::cargo_bin("vetune").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("--log-level")
        .arg("warn")
        .arg("replay")
        .arg("--log")
        .arg(&log)
        .arg("--out")
        .arg(&out);
    for a in mode {
        cmd.arg(a);
    }
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("9 ticks, 7 accumulated, 14 cell hits"))
        .stdout(predicate::str::contains("0.963"));

    let text = fs::read_to_string(&out).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next().unwrap(), "rpm,20,30,40,50,60,70,80,90,100,110");
    let row_3000 = text.lines().find(|l| l.starts_with("3000,")).unwrap();
    let cells: Vec<&str> = row_3000.split(',').collect();
    assert_eq!(cells[4], "0.9630");
    assert_eq!(cells[5], "1.0000");
}

#[rstest]
fn replay_stats_go_to_stderr() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let log = write_log(&dir);

    Command::cargo_bin("vetune")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("--log-level")
        .arg("error")
        .arg("replay")
        .arg("--log")
        .arg(&log)
        .arg("--direct")
        .arg("--stats")
        .assert()
        .success()
        .stderr(predicate::str::contains("Idle (paused or below live floor): 2"));
}

#[rstest]
fn replay_rejects_bad_telemetry_header() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let log = dir.path().join("bad.csv");
    fs::write(&log, "engine_rpm,map,lambda\n3000,50,1.0\n").unwrap();

    Command::cargo_bin("vetune")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("replay")
        .arg("--log")
        .arg(&log)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid headers in telemetry CSV"));
}
