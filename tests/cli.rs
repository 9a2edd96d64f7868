//! End-to-end tests for the `threadline` binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Write a config plus two article documents into a fresh temp directory.
fn setup_test_env(demo_comments: bool) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let articles_dir = root.join("articles");
    fs::create_dir_all(&articles_dir).unwrap();
    fs::write(
        articles_dir.join("01-pure.md"),
        "---\nid: pure\ntitle: Pure functions\nlead: No side effects\n---\nA pure function always returns the same output.\n",
    )
    .unwrap();
    fs::write(
        articles_dir.join("02-types.md"),
        "title: Types\n---\nTypes describe data.\n",
    )
    .unwrap();

    let config_content = format!(
        r#"
[db]
path = "{}/data/threadline.sqlite"

[server]
bind = "127.0.0.1:0"

[seed]
articles_dir = "{}"
demo_comments = {}
"#,
        root.display(),
        articles_dir.display(),
        demo_comments
    );

    let config_path = config_dir.join("threadline.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(env!("CARGO_BIN_EXE_threadline"))
        .arg("--config")
        .arg(config_path)
        .args(args)
        .env_remove("PORT")
        .env("RUST_LOG", "off")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run threadline: {}", e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env(false);
    let (stdout, stderr, ok) = run(&config_path, &["init"]);
    assert!(ok, "init failed: {}", stderr);
    assert!(stdout.contains("Database initialized"));
    assert!(tmp.path().join("data/threadline.sqlite").exists());

    let (_, stderr, ok) = run(&config_path, &["init"]);
    assert!(ok, "second init failed: {}", stderr);
}

#[test]
fn test_seed_once_then_list() {
    let (_tmp, config_path) = setup_test_env(true);

    let (stdout, stderr, ok) = run(&config_path, &["seed"]);
    assert!(ok, "seed failed: {}", stderr);
    assert!(stdout.contains("Seeded 2 articles and 5 comments"), "{}", stdout);

    let (stdout, _, ok) = run(&config_path, &["seed"]);
    assert!(ok);
    assert!(stdout.contains("Using existing database"));

    let (stdout, _, ok) = run(&config_path, &["articles"]);
    assert!(ok);
    let pure = stdout.find("Pure functions").unwrap();
    let types = stdout.find("Types").unwrap();
    assert!(pure < types);

    let (stdout, _, ok) = run(&config_path, &["get", "pure"]);
    assert!(ok);
    assert!(stdout.contains("lead:     No side effects"));
    assert!(stdout.contains("comments: 5"));
}

#[test]
fn test_comment_and_reply_tree() {
    let (_tmp, config_path) = setup_test_env(false);
    run(&config_path, &["seed"]);

    let (stdout, stderr, ok) = run(
        &config_path,
        &["comment", "pure", "--text", "Nice read", "--username", "Ada"],
    );
    assert!(ok, "comment failed: {}", stderr);
    let parent = stdout.trim().to_string();
    assert_eq!(parent.len(), 12);

    let (_, stderr, ok) = run(
        &config_path,
        &["comment", "pure", "--text", "Agreed", "--reply-to", &parent],
    );
    assert!(ok, "reply failed: {}", stderr);

    let (stdout, _, ok) = run(&config_path, &["comments", "pure"]);
    assert!(ok);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with('[') && lines[0].ends_with("Ada: Nice read"));
    assert!(lines[1].starts_with("  [") && lines[1].ends_with("Guest user: Agreed"));

    let (stdout, _, ok) = run(&config_path, &["comments", "pure", "--flat"]);
    assert!(ok);
    assert!(stdout.lines().all(|l| l.starts_with('[')));
}

#[test]
fn test_caller_errors_exit_nonzero() {
    let (_tmp, config_path) = setup_test_env(false);
    run(&config_path, &["seed"]);

    let (_, stderr, ok) = run(&config_path, &["get", "missing"]);
    assert!(!ok);
    assert!(stderr.contains("Error:"));

    let (_, stderr, ok) = run(&config_path, &["comment", "pure", "--text", "   "]);
    assert!(!ok);
    assert!(stderr.contains("Error:"));

    let (_, _, ok) = run(
        &config_path,
        &["comment", "pure", "--text", "x", "--reply-to", "nope"],
    );
    assert!(!ok);

    let (stdout, _, ok) = run(&config_path, &["stats"]);
    assert!(ok);
    assert!(stdout.contains("Comments:  0"));
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, ok) = run(&tmp.path().join("nope.toml"), &["init"]);
    assert!(!ok);
    assert!(stderr.contains("Failed to read config file"));
}
