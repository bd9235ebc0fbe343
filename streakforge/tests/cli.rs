use std::fs::write;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn git(cwd: &Path, args: &[&str]) -> String {
    let output = std::process::Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .expect("git should be runnable");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn bare_remote(root: &Path) -> PathBuf {
    let remote = root.join("origin.git");
    std::fs::create_dir_all(&remote).unwrap();
    git(&remote, &["-c", "init.defaultBranch=main", "init", "--bare"]);
    remote
}

/// End-to-end through the binary: one repository, one forced commit, pushed
/// to a local bare remote.
#[test]
fn run_once_contributes_and_reports_a_summary() {
    let dir = tempdir().unwrap();
    let remote = bare_remote(dir.path());

    let config_path = dir.path().join("config.yml");
    write(
        &config_path,
        format!(
            "repositories:\n  - name: local/fixture\n    url: \"file://{remote}\"\n    branch: main\n\
             workdir: {workdir}\n\
             min_commits: 1\nmax_commits: 1\nmin_interval: 0.0\nmax_interval: 0.0\n\
             analytics:\n  path: {analytics}\n",
            remote = remote.display(),
            workdir = dir.path().join("work").display(),
            analytics = dir.path().join("contributions.jsonl").display(),
        ),
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("streakforge").expect("Binary exists");
    cmd.arg("run").arg("--config").arg(&config_path).arg("--once");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("1 completed, 0 skipped, 0 failed"));

    assert_eq!(git(&remote, &["rev-list", "--count", "main"]), "1");

    // The analytics store received exactly one record for the push.
    let records = std::fs::read_to_string(dir.path().join("contributions.jsonl")).unwrap();
    assert_eq!(records.lines().count(), 1);
    assert!(records.contains("local/fixture"));
}

#[test]
fn missing_config_file_fails_with_a_clear_message() {
    let mut cmd = Command::cargo_bin("streakforge").expect("Binary exists");
    cmd.arg("run")
        .arg("--config")
        .arg("/definitely/not/here.yml")
        .arg("--once");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn invalid_bounds_abort_before_any_repository_is_processed() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.yml");
    write(
        &config_path,
        "repositories:\n  - acme/widgets\nmin_commits: 5\nmax_commits: 2\n",
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("streakforge").expect("Binary exists");
    cmd.arg("run").arg("--config").arg(&config_path).arg("--once");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("min_commits"));
}
