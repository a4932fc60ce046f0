// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! End-to-end tests of the `utilkit` binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// The binary, run quietly from `cwd` so no stray config is picked up
fn utilkit(cwd: &Path) -> Command {
    let mut cmd = Command::cargo_bin("utilkit").unwrap();
    cmd.current_dir(cwd).arg("--quiet");
    cmd
}

fn write_files(dir: &Path, files: &[(&str, &str)]) {
    for (name, content) in files {
        fs::write(dir.join(name), content).unwrap();
    }
}

fn sorted_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_hash_manifest_then_verify() {
    let work = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    write_files(data.path(), &[("a.txt", "alpha"), ("b.txt", "beta")]);
    let manifest = work.path().join("SHA256SUMS");

    utilkit(work.path())
        .arg("hash")
        .arg(data.path())
        .arg("--relative")
        .arg("--output")
        .arg(&manifest)
        .assert()
        .success();

    let text = fs::read_to_string(&manifest).unwrap();
    assert_eq!(text.lines().count(), 2);
    assert!(text.starts_with("sha256  "));

    utilkit(work.path())
        .arg("hash")
        .arg(data.path())
        .arg("--verify")
        .arg(&manifest)
        .assert()
        .success()
        .stdout(predicate::str::contains("OK: 2  Missing: 0  Mismatched: 0"));

    fs::write(data.path().join("a.txt"), "changed").unwrap();
    fs::remove_file(data.path().join("b.txt")).unwrap();

    utilkit(work.path())
        .arg("hash")
        .arg(data.path())
        .arg("--verify")
        .arg(&manifest)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Missing: 1  Mismatched: 1"));
}

#[test]
fn test_hash_json_is_stable() {
    let data = TempDir::new().unwrap();
    write_files(data.path(), &[("one.bin", "same bytes")]);

    let run = || {
        let output = utilkit(data.path())
            .arg("hash")
            .arg(data.path().join("one.bin"))
            .args(["--algo", "blake3", "--json"])
            .output()
            .unwrap();
        assert!(output.status.success());
        let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        value[0]["digest"].as_str().unwrap().to_string()
    };

    let first = run();
    assert_eq!(first.len(), 64);
    assert_eq!(first, run());
}

#[test]
fn test_hash_unreadable_manifest_exits_2() {
    let work = TempDir::new().unwrap();
    utilkit(work.path())
        .args(["hash", ".", "--verify", "no-such-manifest.txt"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_rename_dry_run_then_apply_then_undo() {
    let work = TempDir::new().unwrap();
    let photos = TempDir::new().unwrap();
    write_files(photos.path(), &[("My Photo.JPG", "1"), ("Other Shot.JPG", "2")]);
    let before = sorted_names(photos.path());

    utilkit(work.path())
        .arg("rename")
        .arg(photos.path())
        .args(["--find", " ", "--replace", "_", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Changed: 0  Skipped: 2  Failed: 0"));
    assert_eq!(sorted_names(photos.path()), before);

    utilkit(work.path())
        .arg("rename")
        .arg(photos.path())
        .args(["--find", " ", "--replace", "_"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Changed: 2"));
    assert_eq!(sorted_names(photos.path()), vec!["My_Photo.JPG", "Other_Shot.JPG"]);

    // second run has nothing left to change
    utilkit(work.path())
        .arg("rename")
        .arg(photos.path())
        .args(["--find", " ", "--replace", "_"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Changed: 0  Skipped: 0  Failed: 0"));

    utilkit(work.path())
        .args(["history", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Recent history (2 entries)"));

    utilkit(work.path())
        .args(["history", "undo", "-n", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Undone:"));
    assert_eq!(sorted_names(photos.path()), before);
}

#[test]
fn test_rename_not_a_directory_exits_2() {
    let work = TempDir::new().unwrap();
    utilkit(work.path())
        .args(["rename", "missing-dir", "--prefix", "x_"])
        .assert()
        .code(2);
}

#[test]
fn test_rename_invalid_regex_exits_2() {
    let work = TempDir::new().unwrap();
    write_files(work.path(), &[("a.txt", "")]);
    utilkit(work.path())
        .args(["rename", ".", "--regex", "(unclosed"])
        .assert()
        .code(2);
}

#[test]
fn test_rename_invalid_glob_exits_2() {
    let work = TempDir::new().unwrap();
    write_files(work.path(), &[("a.txt", "")]);
    utilkit(work.path())
        .args(["rename", ".", "--include", "[unclosed", "--prefix", "x_"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Error:"));
    assert!(work.path().join("a.txt").exists());
}

#[test]
fn test_rename_batch_collision_keeps_both_files() {
    let work = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    write_files(data.path(), &[("x1.txt", "one"), ("x2.txt", "two")]);

    utilkit(work.path())
        .arg("rename")
        .arg(data.path())
        .args(["--regex", r"\d"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Changed: 2"));
    assert_eq!(sorted_names(data.path()), vec!["x-1.txt", "x.txt"]);
}

#[test]
fn test_history_clear_requires_force() {
    let work = TempDir::new().unwrap();
    utilkit(work.path())
        .args(["history", "clear"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    utilkit(work.path())
        .args(["history", "clear", "--force"])
        .assert()
        .success();
}

#[test]
fn test_carve_to_target_size() {
    let work = TempDir::new().unwrap();
    let input = work.path().join("in.png");
    let img = image::RgbImage::from_fn(24, 16, |x, y| image::Rgb([(x * 10) as u8, (y * 15) as u8, 128]));
    img.save(&input).unwrap();
    let output = work.path().join("out/carved.png");

    utilkit(work.path())
        .arg("carve")
        .arg(&input)
        .arg(&output)
        .args(["--width", "20", "--height", "12"])
        .assert()
        .success();

    let carved = image::open(&output).unwrap();
    assert_eq!((carved.width(), carved.height()), (20, 12));
}

#[test]
fn test_carve_larger_target_fails() {
    let work = TempDir::new().unwrap();
    let input = work.path().join("in.png");
    image::RgbImage::new(10, 10).save(&input).unwrap();

    utilkit(work.path())
        .arg("carve")
        .arg(&input)
        .arg(work.path().join("out.png"))
        .args(["--width", "11"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error:"));
    assert!(!work.path().join("out.png").exists());
}

#[test]
fn test_dupes_json_report() {
    let work = TempDir::new().unwrap();
    write_files(work.path(), &[("a.txt", "same"), ("b.txt", "same"), ("c.txt", "different")]);

    let output = utilkit(work.path())
        .args(["dupes", ".", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["groups"], 1);
    assert_eq!(report["wasted_space"], 4);
    assert_eq!(report["duplicates"][0]["count"], 2);
}

#[test]
fn test_pdf_text_missing_input_exits_2() {
    let work = TempDir::new().unwrap();
    utilkit(work.path())
        .args(["pdf", "text", "absent.pdf"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Input not found"));
}

#[test]
fn test_qr_data_uri() {
    let work = TempDir::new().unwrap();
    utilkit(work.path())
        .args(["qr", "--data", "https://example.com", "--data-uri"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("data:image/png;base64,"));
}

#[test]
fn test_qr_writes_file() {
    let work = TempDir::new().unwrap();
    utilkit(work.path())
        .args(["qr", "--data", "hello", "--version", "1", "--box-size", "2", "-o", "codes/hello.png"])
        .assert()
        .success();
    let img = image::open(work.path().join("codes/hello.png")).unwrap();
    assert_eq!(img.width(), 58);
}

#[test]
fn test_url_check_without_urls_fails() {
    let work = TempDir::new().unwrap();
    utilkit(work.path())
        .arg("url-check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No URLs provided"));
}

#[test]
fn test_config_generate_and_validate() {
    let work = TempDir::new().unwrap();
    utilkit(work.path())
        .args(["config", "generate"])
        .assert()
        .success();
    assert!(work.path().join("utilkit.json").exists());

    utilkit(work.path())
        .args(["config", "generate"])
        .assert()
        .failure();

    utilkit(work.path())
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"));

    fs::write(work.path().join("utilkit.json"), r#"{"hashing": {"algorithm": "crc32"}}"#).unwrap();
    utilkit(work.path())
        .args(["config", "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown hashing algorithm"));
}
