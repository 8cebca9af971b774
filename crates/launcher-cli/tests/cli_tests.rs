//! Binary-level tests for the a11y-launcher CLI.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn launcher(cache_root: &Path, download_url: &Path) -> Command {
    let mut cmd = Command::cargo_bin("a11y-launcher").unwrap();
    cmd.env("BROWSERSTACK_A11Y_CLI_CACHE_DIR", cache_root)
        .env("BROWSERSTACK_A11Y_CLI_DOWNLOAD_URL", download_url)
        .env_remove("BROWSERSTACK_A11Y_CLI_FORCE_DOWNLOAD")
        .env_remove("RUST_LOG");
    cmd
}

/// Seed `<root>/9.0.0/browserstack-cli` with a script that echoes its arguments.
#[cfg(unix)]
fn seed_cached_cli(root: &Path, exit_code: i32) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let dir = root.join("9.0.0");
    fs::create_dir_all(&dir).unwrap();
    let exe = dir.join("browserstack-cli");
    fs::write(&exe, format!("#!/bin/sh\necho \"$@\"\nexit {exit_code}\n")).unwrap();
    fs::set_permissions(&exe, fs::Permissions::from_mode(0o755)).unwrap();
    exe
}

#[test]
fn test_help() {
    Command::cargo_bin("a11y-launcher")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--download-url"))
        .stdout(predicate::str::contains("--force-download"));
}

#[test]
fn test_unwritable_cache_exits_with_two() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("blocker");
    fs::write(&blocker, "regular file").unwrap();

    launcher(
        &blocker.join("cache"),
        &temp.path().join("browserstack-cli-9.0.0.tar.gz"),
    )
    .assert()
    .code(2)
    .stderr(predicate::str::contains("allow-writing-to-directory"));
}

#[cfg(unix)]
#[test]
fn test_cached_cli_runs_with_sanitized_arguments() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("cache");
    seed_cached_cli(&root, 3);

    launcher(&root, &temp.path().join("browserstack-cli-9.0.0.tar.gz"))
        .args(["-o", "xcode", "--foo"])
        .assert()
        .code(3)
        .stdout("a11y --foo\n")
        .stderr(predicate::str::contains("Using CLI 9.0.0"));
}

#[cfg(unix)]
#[test]
fn test_arguments_after_separator_are_forwarded_verbatim() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("cache");
    seed_cached_cli(&root, 0);

    launcher(&root, &temp.path().join("browserstack-cli-9.0.0.tar.gz"))
        .args(["--output-format=json", "--", "-o", "xcode", "--force-download"])
        .assert()
        .success()
        .stdout("a11y -- -o xcode --force-download\n");
}

#[cfg(unix)]
#[test]
fn test_local_executable_override_is_installed() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let root = temp.path().join("cache");
    let source = temp.path().join("tool.bin");
    fs::write(&source, "#!/bin/sh\necho installed \"$@\"\n").unwrap();
    fs::set_permissions(&source, fs::Permissions::from_mode(0o755)).unwrap();

    launcher(&root, &source)
        .arg("--bar")
        .assert()
        .success()
        .stdout("installed a11y --bar\n");

    assert!(root.join("override/browserstack-cli").exists());
}

#[test]
fn test_missing_local_archive_fails() {
    let temp = TempDir::new().unwrap();

    launcher(
        &temp.path().join("cache"),
        &temp.path().join("browserstack-cli-1.0.0.tar.gz"),
    )
    .assert()
    .failure();
}

#[cfg(unix)]
#[test]
fn test_launcher_flags_after_linter_arguments_are_honoured() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let root = temp.path().join("cache");
    let stale = root.join("override");
    fs::create_dir_all(&stale).unwrap();
    fs::write(stale.join("browserstack-cli"), "#!/bin/sh\necho stale\n").unwrap();
    fs::set_permissions(
        stale.join("browserstack-cli"),
        fs::Permissions::from_mode(0o755),
    )
    .unwrap();
    let source = temp.path().join("tool.bin");
    fs::write(&source, "#!/bin/sh\necho installed \"$@\"\n").unwrap();
    fs::set_permissions(&source, fs::Permissions::from_mode(0o755)).unwrap();

    launcher(&root, &temp.path().join("browserstack-cli-1.0.0.tar.gz"))
        .args(["--include", "Sources", "--force-download", "--download-url"])
        .arg(&source)
        .assert()
        .success()
        .stdout("installed a11y --include Sources\n");
}

#[test]
fn test_usage_errors_exit_with_one() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("cache");
    let archive = temp.path().join("browserstack-cli-1.0.0.tar.gz");

    launcher(&root, &archive)
        .args(["--log-level", "bogus"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("bogus"));

    launcher(&root, &archive)
        .args(["--include", "Sources", "--download-url"])
        .assert()
        .code(1);

    assert!(!root.exists());
}

#[test]
fn test_version_exits_cleanly() {
    Command::cargo_bin("a11y-launcher")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("a11y-launcher"));
}
