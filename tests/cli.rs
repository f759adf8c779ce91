use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

mod common;

fn labelcheck() -> Command {
    Command::cargo_bin("labelcheck").unwrap()
}

#[test]
fn runs() {
    labelcheck()
        .assert()
        .success()
        .stdout(predicate::str::contains("labelcheck --help"));
}

#[test]
fn outputs_tool_name() {
    let mut cmd = labelcheck();
    cmd.arg("-V");
    cmd.assert().success().stdout("labelcheck 0.1.0\n");
}

// Check subcommand tests

#[test]
fn check_reports_rows_and_summary() {
    let temp = tempfile::tempdir().expect("create temp dir");
    common::write_sample_dataset(temp.path());

    let mut cmd = labelcheck();
    cmd.arg("check").arg(temp.path());
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Overlap        a.bmp (found 1 overlap(s))"))
        .stdout(predicate::str::contains(
            "Invalid label  b.bmp (found 1 invalid label(s))",
        ))
        .stdout(predicate::str::contains("OK             c.bmp"))
        .stdout(predicate::str::contains(
            "Invalid label  d.bmp (found 1 overlap(s); found 1 invalid label(s))",
        ))
        .stdout(predicate::str::contains("e.bmp").not())
        .stdout(predicate::str::contains(
            "Scanned 4 file(s), skipped 0: 1 clean, 2 with overlaps (2 total), 2 with invalid labels (2 total)",
        ));
}

#[test]
fn check_strict_fails_on_issues() {
    let temp = tempfile::tempdir().expect("create temp dir");
    common::write_sample_dataset(temp.path());

    let mut cmd = labelcheck();
    cmd.arg("check").arg(temp.path()).arg("--strict");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("2 file(s) with overlaps"));
}

#[test]
fn check_strict_passes_clean_dataset() {
    let temp = tempfile::tempdir().expect("create temp dir");
    common::write_bmp(&temp.path().join("only.bmp"), 10, 10);
    fs::write(temp.path().join("only.txt"), "0 0.2 0.2 0.1 0.1\n").expect("write label");

    let mut cmd = labelcheck();
    cmd.arg("check").arg(temp.path()).arg("--strict");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("OK             only.bmp"));
}

#[test]
fn check_json_output_format() {
    let temp = tempfile::tempdir().expect("create temp dir");
    common::write_sample_dataset(temp.path());

    let output = labelcheck()
        .args(["check", "--output", "json"])
        .arg(temp.path())
        .output()
        .expect("run labelcheck");
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("parse json");
    assert_eq!(value["summary"]["scanned"], 4);
    assert_eq!(value["summary"]["overlap_files"], 2);
    assert_eq!(value["rows"].as_array().map(Vec::len), Some(4));
    assert_eq!(value["rows"][3]["file_status"], "both");
}

#[test]
fn check_exports_csv() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let data = temp.path().join("data");
    common::write_sample_dataset(&data);
    let csv_path = temp.path().join("results.csv");

    let mut cmd = labelcheck();
    cmd.arg("check").arg(&data).arg("--export-csv").arg(&csv_path);
    cmd.assert().success();

    let csv = fs::read_to_string(&csv_path).expect("read csv");
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "file_name,status,detail");
    assert_eq!(lines[1], "a.bmp,Overlap,found 1 overlap(s)");
    assert_eq!(lines[3], "c.bmp,OK,");
    assert_eq!(lines.len(), 5);
}

#[test]
fn check_threshold_flag_overrides_config() {
    let temp = tempfile::tempdir().expect("create temp dir");
    common::write_sample_dataset(temp.path());
    fs::write(temp.path().join("labelcheck.yaml"), "overlap_threshold: 1.0\n")
        .expect("write config");

    let mut cmd = labelcheck();
    cmd.arg("check").arg(temp.path());
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("0 with overlaps (0 total)"));

    let mut cmd = labelcheck();
    cmd.arg("check").arg(temp.path()).args(["--threshold", "0.5"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("2 with overlaps (2 total)"));
}

#[test]
fn check_rejects_threshold_out_of_range() {
    let temp = tempfile::tempdir().expect("create temp dir");
    common::write_sample_dataset(temp.path());

    let mut cmd = labelcheck();
    cmd.arg("check").arg(temp.path()).args(["--threshold", "1.5"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Overlap threshold must be within"));
}

#[test]
fn check_rejects_bad_config_file() {
    let temp = tempfile::tempdir().expect("create temp dir");
    common::write_sample_dataset(temp.path());
    fs::write(temp.path().join("labelcheck.yaml"), "unknown_key: 1\n").expect("write config");

    let mut cmd = labelcheck();
    cmd.arg("check").arg(temp.path());
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config file"));
}

#[test]
fn check_nonexistent_dir_fails() {
    let mut cmd = labelcheck();
    cmd.args(["check", "nonexistent_dir"]);
    cmd.assert().failure();
}

// Inspect subcommand tests

#[test]
fn inspect_reports_overlaps() {
    let temp = tempfile::tempdir().expect("create temp dir");
    common::write_sample_dataset(temp.path());

    let mut cmd = labelcheck();
    cmd.arg("inspect").arg(temp.path().join("a.txt"));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("box 0: class 0 (cat)"))
        .stdout(predicate::str::contains("[OVERLAP] boxes 0 and 1: IoU 1.000"));
}

#[test]
fn inspect_uses_explicit_labels() {
    let temp = tempfile::tempdir().expect("create temp dir");
    common::write_sample_dataset(temp.path());
    let labels = temp.path().join("many.txt");
    fs::write(&labels, "a\nb\nc\nd\ne\nf\n").expect("write labels");

    let mut cmd = labelcheck();
    cmd.arg("inspect").arg(temp.path().join("b.txt"));
    cmd.assert().success().stdout(predicate::str::contains(
        "[LABEL  ] box 0: class id 5 exceeds max class id 2",
    ));

    let mut cmd = labelcheck();
    cmd.arg("inspect")
        .arg(temp.path().join("b.txt"))
        .arg("--labels")
        .arg(&labels);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Check passed: no issues found"));
}

#[test]
fn inspect_missing_file_is_clean() {
    let temp = tempfile::tempdir().expect("create temp dir");

    let mut cmd = labelcheck();
    cmd.arg("inspect")
        .arg(temp.path().join("missing.txt"))
        .arg("--strict");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Check passed"));
}

#[test]
fn inspect_json_output_format() {
    let temp = tempfile::tempdir().expect("create temp dir");
    common::write_sample_dataset(temp.path());

    let mut cmd = labelcheck();
    cmd.arg("inspect")
        .arg(temp.path().join("d.txt"))
        .args(["--output", "json"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"overlaps\""))
        .stdout(predicate::str::contains("\"class_id\": 7"));
}

// IoU subcommand tests

#[test]
fn iou_of_identical_boxes_is_one() {
    let mut cmd = labelcheck();
    cmd.args(["iou", "0.5 0.5 0.4 0.4", "0.5 0.5 0.4 0.4"]);
    cmd.assert().success().stdout("1.000000\n");
}

#[test]
fn iou_of_touching_boxes_is_zero() {
    let mut cmd = labelcheck();
    cmd.args(["iou", "0.25 0.5 0.5 0.5", "0.75 0.5 0.5 0.5"]);
    cmd.assert().success().stdout("0.000000\n");
}

#[test]
fn iou_rejects_malformed_box() {
    let mut cmd = labelcheck();
    cmd.args(["iou", "0.5 0.5 0.4", "0.5 0.5 0.4 0.4"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Invalid box '0.5 0.5 0.4'"));
}
