use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn companion_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_companion"))
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let src_dir = root.join("src");
    fs::create_dir_all(src_dir.join("scene")).unwrap();
    fs::create_dir_all(src_dir.join("vendor")).unwrap();
    fs::write(
        src_dir.join("scene/loader.go"),
        "package scene\n\nfunc Foo() {\n}\n\n// LoadScene reads a scene from disk.\nfunc LoadScene(path string) error {\n\treturn nil\n}\n",
    )
    .unwrap();
    fs::write(
        src_dir.join("render.rs"),
        "pub fn draw() {}\n\nstruct Mesh;\n\nimpl Mesh {\n    fn upload(&self) {}\n}\n",
    )
    .unwrap();
    fs::write(src_dir.join("broken.go"), "package x\n\nfunc Broken( {\n").unwrap();
    fs::write(src_dir.join("vendor/dep.go"), "package dep\n\nfunc Dep() {}\n").unwrap();
    fs::write(src_dir.join("notes.md"), "# Notes\n").unwrap();

    let config_content = format!(
        r#"[index]
roots = ["{}/src"]
extensions = ["go", "rs"]
exclude = ["vendor/"]
concurrency = 2

[store]
url = "http://127.0.0.1:9"
"#,
        root.display()
    );

    let config_path = config_dir.join("companion.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_companion(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = companion_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run companion binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_index_dry_run() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_companion(&config_path, &["index", "--dry-run"]);
    assert!(success, "index failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("dry-run"));
    assert!(stdout.contains("files scanned: 3"), "got: {}", stdout);
    assert!(stdout.contains("files indexed: 2"), "got: {}", stdout);
    assert!(stdout.contains("files failed: 1"), "got: {}", stdout);
    assert!(stdout.contains("snippets: 4"), "got: {}", stdout);
    assert!(stdout.contains("broken.go"));
    assert!(stdout.contains("ok"));
}

#[test]
fn test_index_dry_run_root_override() {
    let (tmp, config_path) = setup_test_env();
    let other = tmp.path().join("other");
    fs::create_dir_all(&other).unwrap();
    fs::write(other.join("main.go"), "package main\n\nfunc main() {}\n").unwrap();

    let (stdout, stderr, success) = run_companion(
        &config_path,
        &["index", "--dry-run", "--root", other.to_str().unwrap()],
    );
    assert!(success, "index failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("files scanned: 1"), "got: {}", stdout);
    assert!(stdout.contains("snippets: 1"), "got: {}", stdout);
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope.toml");

    let (_, stderr, success) = run_companion(&missing, &["index", "--dry-run"]);
    assert!(!success);
    assert!(stderr.contains("nope.toml"), "got: {}", stderr);
}

#[test]
fn test_invalid_config_fails() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("companion.toml");
    fs::write(&config_path, "[index]\nroots = []\n").unwrap();

    let (_, stderr, success) = run_companion(&config_path, &["index", "--dry-run"]);
    assert!(!success);
    assert!(stderr.contains("index.roots"), "got: {}", stderr);
}

#[test]
fn test_search_unreachable_store_fails() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_companion(&config_path, &["search", "load a scene"]);
    assert!(!success);
    assert!(stderr.contains("Chroma is not reachable"), "got: {}", stderr);
}
