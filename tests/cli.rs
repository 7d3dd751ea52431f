//! CLI integration tests for the canvas binary.
//!
//! Each test uses an isolated temp directory for the database, ensuring tests
//! can run in parallel safely.

#![allow(deprecated)] // Command::cargo_bin deprecation only affects custom build dirs

use std::path::Path;

use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use predicates::prelude::*;
use serde_json::Value;

struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    fn data_dir_str(&self) -> String {
        self.data_dir().to_string_lossy().to_string()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("canvas").expect("failed to find binary");
        cmd.env("NO_COLOR", "1");
        cmd
    }

    fn init(&self) -> assert_cmd::assert::Assert {
        self.cmd()
            .args(["admin", "init", "--data-dir", &self.data_dir_str()])
            .assert()
    }

    fn export_json(&self, kind: &str) -> Value {
        let output = self
            .cmd()
            .args([
                "backup",
                "export",
                "--data-dir",
                &self.data_dir_str(),
                "--type",
                kind,
            ])
            .output()
            .expect("failed to run command");
        assert!(output.status.success());
        serde_json::from_slice(&output.stdout).expect("failed to parse JSON")
    }
}

#[test]
fn test_init_creates_token_and_database() {
    let ctx = TestContext::new();
    ctx.init()
        .success()
        .stdout(predicate::str::contains("canvas_"));

    ctx.temp_dir
        .child(".admin_token")
        .assert(predicate::str::starts_with("canvas_"));
    ctx.temp_dir.child("canvas.db").assert(predicate::path::exists());
}

#[test]
fn test_init_twice_fails() {
    let ctx = TestContext::new();
    ctx.init().success();
    ctx.init()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn test_serve_requires_init() {
    let ctx = TestContext::new();
    ctx.cmd()
        .args(["serve", "--data-dir", &ctx.data_dir_str(), "--port", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("canvas admin init"));
}

#[test]
fn test_export_empty_database() {
    let ctx = TestContext::new();
    ctx.init().success();

    let doc = ctx.export_json("full");
    assert_eq!(doc["version"], "1.0");
    assert_eq!(doc["data"]["posts"], serde_json::json!([]));
    assert_eq!(doc["data"]["pages"], serde_json::json!([]));

    let tags_only = ctx.export_json("tags");
    assert!(tags_only["data"].get("posts").is_none());
}

#[test]
fn test_import_then_export() {
    let ctx = TestContext::new();
    ctx.init().success();

    let backup = ctx.temp_dir.child("backup.json");
    backup
        .write_str(
            r#"{
                "version": "1.0",
                "exported_at": "2024-05-01T12:00:00Z",
                "data": {
                    "tags": [{"id": "t1", "name": "Rust", "slug": "rust", "created_at": "2024-01-01T00:00:00Z"}],
                    "posts": [{
                        "id": "p1",
                        "title": "Imported",
                        "slug": "imported",
                        "content": {},
                        "excerpt": "From a file",
                        "status": "published",
                        "published_at": "2024-01-02T00:00:00Z",
                        "view_count": 7,
                        "created_at": "2024-01-02T00:00:00Z",
                        "updated_at": "2024-01-02T00:00:00Z"
                    }],
                    "post_tags": [{"post_id": "p1", "tag_id": "t1"}]
                }
            }"#,
        )
        .unwrap();

    ctx.cmd()
        .args(["backup", "import", "--data-dir", &ctx.data_dir_str()])
        .arg(backup.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 3 rows"));

    let doc = ctx.export_json("posts");
    assert_eq!(doc["data"]["posts"][0]["view_count"], 7);
    assert_eq!(doc["data"]["post_tags"][0]["tag_id"], "t1");

    ctx.cmd()
        .args([
            "backup",
            "export",
            "--data-dir",
            &ctx.data_dir_str(),
            "--type",
            "posts",
            "--format",
            "markdown",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("# Imported\n\nFrom a file\n"));
}

#[test]
fn test_import_without_data_fails() {
    let ctx = TestContext::new();
    ctx.init().success();

    let backup = ctx.temp_dir.child("empty.json");
    backup.write_str(r#"{"version": "1.0"}"#).unwrap();

    ctx.cmd()
        .args(["backup", "import", "--data-dir", &ctx.data_dir_str()])
        .arg(backup.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing data"));
}
