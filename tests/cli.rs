use std::fs;
use std::process::{Command, Output};

use tempfile::TempDir;

fn run_zones_in(dir: &TempDir) -> Output {
    Command::new(env!("CARGO_BIN_EXE_blindspot-guard"))
        .arg("zones")
        .current_dir(dir.path())
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

#[test]
fn test_zones_runs_without_config_file() {
    let dir = TempDir::new().unwrap();
    let out = run_zones_in(&dir);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Critical:   0 .. 224 px"), "{}", stdout);
}

#[test]
fn test_invalid_config_file_aborts() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("blindspot.toml"),
        "[zones]\nwarning_band_fraction = 2.0\n",
    )
    .unwrap();

    let out = run_zones_in(&dir);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("warning_band_fraction"), "{}", stderr);
    assert!(!String::from_utf8_lossy(&out.stdout).contains("Critical:"));
}

#[test]
fn test_malformed_config_file_aborts() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("blindspot.toml"), "[zones\n").unwrap();
    assert!(!run_zones_in(&dir).status.success());
}
