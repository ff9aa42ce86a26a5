//! Integration tests for the geochip binary.

#![allow(clippy::unwrap_used, clippy::cast_possible_truncation)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

const LABELS: &str = "item {\n  id: 1\n  name: 'car'\n}\n";

/// Command isolated from the user's config file and environment.
fn geochip(home: &Path) -> Command {
    let mut cmd = Command::new(cargo_bin("geochip"));
    cmd.env("GEOCHIP_CONFIG", home.join("config.toml"))
        .env_remove("GEOCHIP_DETECTOR")
        .env_remove("GEOCHIP_MASK")
        .env_remove("GEOCHIP_CHIP_SIZE")
        .env_remove("GEOCHIP_OVERLAP")
        .env_remove("GEOCHIP_WORK_DIR")
        .env_remove("GEOCHIP_SCORE_THRESH")
        .env_remove("GEOCHIP_MERGE_THRESH")
        .env_remove("GEOCHIP_FORMAT")
        .env_remove("GEOCHIP_THREADS")
        .env_remove("RUST_LOG");
    cmd
}

fn write_inputs(dir: &Path) {
    std::fs::write(dir.join("labels.pbtxt"), LABELS).unwrap();
    std::fs::write(dir.join("model.pb"), b"model").unwrap();
    image::RgbImage::from_fn(64, 64, |x, y| image::Rgb([x as u8, y as u8, 0]))
        .save(dir.join("scene.png"))
        .unwrap();
}

#[test]
fn test_help_lists_subcommands() {
    let home = TempDir::new().unwrap();
    geochip(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("predict"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_config_path_honours_override() {
    let home = TempDir::new().unwrap();
    let expected = home.path().join("config.toml");
    geochip(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(expected.to_string_lossy()));
}

#[test]
fn test_config_init_then_show() {
    let home = TempDir::new().unwrap();
    geochip(home.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created configuration file"));
    assert!(home.path().join("config.toml").exists());

    geochip(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("chip_size = 300"));
}

#[test]
fn test_predict_without_detector_fails() {
    let home = TempDir::new().unwrap();
    geochip(home.path())
        .args(["predict", "model.pb", "labels.pbtxt", "scene.png", "out.geojson"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error: no detector program configured"));
}

#[test]
fn test_predict_rejects_overlap_not_below_chip_size() {
    let home = TempDir::new().unwrap();
    geochip(home.path())
        .args([
            "predict",
            "--detector",
            "detect",
            "--chip-size",
            "100",
            "--overlap",
            "100",
            "model.pb",
            "labels.pbtxt",
            "scene.png",
            "out.geojson",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid chip size 100 with overlap 100"));
}

#[test]
fn test_predict_rejects_missing_band() {
    let home = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    write_inputs(dir.path());
    let output = dir.path().join("out.geojson");

    geochip(home.path())
        .current_dir(dir.path())
        .args([
            "predict",
            "--detector",
            "/nonexistent/detector",
            "--channel-order",
            "0",
            "1",
            "5",
            "model.pb",
            "labels.pbtxt",
            "scene.png",
        ])
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid channel order"));
    assert!(!output.exists());
}

#[test]
fn test_predict_failing_detector_leaves_no_output() {
    let home = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    write_inputs(dir.path());
    let output = dir.path().join("out.geojson");

    geochip(home.path())
        .current_dir(dir.path())
        .args([
            "-q",
            "predict",
            "--detector",
            "/nonexistent/detector",
            "--chip-size",
            "32",
            "model.pb",
            "labels.pbtxt",
            "scene.png",
        ])
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
    assert!(!output.exists());
}

#[cfg(unix)]
#[test]
fn test_predict_with_script_detector() {
    let home = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    write_inputs(dir.path());
    let output = dir.path().join("out.geojson");
    let debug = dir.path().join("debug.json");

    geochip(home.path())
        .current_dir(dir.path())
        .args([
            "-q",
            "predict",
            "--detector",
            "sh",
            "--detector-arg",
            "-c",
            "--detector-arg",
            r#"echo '[{"box":[0.1,0.1,0.2,0.2],"class_id":1,"score":0.9}]'"#,
            "--detector-arg",
            "detector",
            "--chip-size",
            "32",
            "--overlap",
            "0",
            "--debug-output",
        ])
        .arg(&debug)
        .args(["model.pb", "labels.pbtxt", "scene.png"])
        .arg(&output)
        .assert()
        .success();

    let geojson: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(geojson["type"], "FeatureCollection");
    let features = geojson["features"].as_array().unwrap();
    assert_eq!(features.len(), 4);
    assert_eq!(features[0]["properties"]["class_name"], "car");

    let artifact: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&debug).unwrap()).unwrap();
    assert_eq!(artifact["chips"].as_array().unwrap().len(), 4);
}
