//! Command-line behaviour that needs no browser

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn manifest_path(rel: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(rel)
}

/// Run the binary with config and environment isolated in `home`
fn walkthrough(home: &Path, args: &[&str]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_walkthrough"));
    cmd.args(args)
        .current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("NO_COLOR", "1");
    for (key, _) in std::env::vars() {
        if key.starts_with("WALKTHROUGH_") {
            cmd.env_remove(key);
        }
    }
    cmd.output().expect("Failed to run walkthrough binary")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

#[test]
fn test_validate_builtin_file() {
    let home = tempfile::tempdir().unwrap();
    let file = manifest_path("walkthroughs/onboarding.yaml");

    let out = walkthrough(home.path(), &["validate", file.to_str().unwrap()]);

    assert_eq!(out.status.code(), Some(0), "{}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("onboarding"), "{}", text);
    assert!(text.contains("click text=开始探索"), "{}", text);
    assert!(text.contains("optional text=重要声明与使用须知"), "{}", text);
}

#[test]
fn test_show_prints_builtin_yaml() {
    let home = tempfile::tempdir().unwrap();

    let out = walkthrough(home.path(), &["show"]);

    assert_eq!(out.status.code(), Some(0));
    let text = stdout(&out);
    assert!(text.contains("name: onboarding"), "{}", text);
    assert!(text.contains("label: 06_questionnaire_intro"), "{}", text);
}

#[test]
fn test_validate_rejects_unknown_action() {
    let home = tempfile::tempdir().unwrap();
    let file = home.path().join("bad.yaml");
    std::fs::write(
        &file,
        "name: bad\nsteps:\n  - action: hover\n    selector: '#x'\n",
    )
    .unwrap();

    let out = walkthrough(home.path(), &["validate", file.to_str().unwrap()]);

    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("Invalid walkthrough file"), "{}", stderr(&out));
}

#[test]
fn test_validate_rejects_bad_selector() {
    let home = tempfile::tempdir().unwrap();
    let file = home.path().join("selector.yaml");
    std::fs::write(
        &file,
        "name: selector\nsteps:\n  - action: click\n    selector: 'text='\n",
    )
    .unwrap();

    let out = walkthrough(home.path(), &["validate", file.to_str().unwrap()]);

    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("Invalid selector"), "{}", stderr(&out));
}

#[test]
fn test_run_without_reachable_webdriver_is_setup_error() {
    let home = tempfile::tempdir().unwrap();

    let out = walkthrough(
        home.path(),
        &["run", "--webdriver-url", "http://127.0.0.1:9", "--timeout-ms", "500"],
    );

    assert_eq!(out.status.code(), Some(1), "{}", stdout(&out));
    assert!(
        stderr(&out).contains("Browser failed to start"),
        "{}",
        stderr(&out)
    );
    assert!(!home.path().join("test_screenshots").join("01_homepage.png").exists());
}

#[test]
fn test_invalid_config_file_is_setup_error() {
    let home = tempfile::tempdir().unwrap();
    let config = home.path().join("config.toml");
    std::fs::write(&config, "[timeouts]\ndefault_ms = \"soon\"\n").unwrap();

    let out = walkthrough(
        home.path(),
        &["run", "--config", config.to_str().unwrap()],
    );

    assert_eq!(out.status.code(), Some(1));
    assert!(
        stderr(&out).contains("Invalid configuration file"),
        "{}",
        stderr(&out)
    );
}
