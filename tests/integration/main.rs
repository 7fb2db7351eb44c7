//! Integration tests for Archivist

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    /// Binary with an isolated config file that may not exist yet
    fn archivist(dir: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("archivist");
        cmd.env("ARCHIVIST_CONFIG", dir.path().join("config.toml"));
        cmd.env("CI", "1");
        cmd
    }

    fn fixture(dir: &Path) -> PathBuf {
        let path = dir.join("fixture.zip");
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default();

        writer.start_file("readme.txt", options).unwrap();
        writer.write_all(b"hello").unwrap();
        writer.add_directory("docs/", options).unwrap();
        writer.start_file("docs/guide.md", options).unwrap();
        writer.write_all(b"# guide").unwrap();
        writer.start_file("src/deep/main.rs", options).unwrap();
        writer.write_all(b"fn main() {}").unwrap();
        writer.finish().unwrap();
        path
    }

    #[test]
    fn help_displays() {
        let dir = TempDir::new().unwrap();
        archivist(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("browse ZIP archives"));
    }

    #[test]
    fn version_displays() {
        let dir = TempDir::new().unwrap();
        archivist(&dir)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("archivist"));
    }

    #[test]
    fn ls_root_table() {
        let dir = TempDir::new().unwrap();
        let zip = fixture(dir.path());
        archivist(&dir)
            .arg("ls")
            .arg(&zip)
            .assert()
            .success()
            .stdout(predicate::str::contains("readme.txt"))
            .stdout(predicate::str::contains("docs/"))
            .stdout(predicate::str::contains("3 item(s)"));
    }

    #[test]
    fn ls_synthesized_directory_plain() {
        let dir = TempDir::new().unwrap();
        let zip = fixture(dir.path());
        archivist(&dir)
            .arg("ls")
            .arg(&zip)
            .args(["src", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::eq("deep/\n"));
    }

    #[test]
    fn ls_json_lists_rows() {
        let dir = TempDir::new().unwrap();
        let zip = fixture(dir.path());
        let output = archivist(&dir)
            .arg("ls")
            .arg(&zip)
            .args(["/docs", "--format", "json"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        let rows = rows.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["display_name"], "guide.md");
        assert_eq!(rows[0]["mime_type"], "text/markdown");
        assert_eq!(rows[0]["size"], 7);
        assert!(rows[0]["document_id"]
            .as_str()
            .unwrap()
            .ends_with("#r#/docs/guide.md"));
    }

    #[test]
    fn cat_prints_contents() {
        let dir = TempDir::new().unwrap();
        let zip = fixture(dir.path());
        archivist(&dir)
            .arg("cat")
            .arg(&zip)
            .arg("/src/deep/main.rs")
            .assert()
            .success()
            .stdout(predicate::eq("fn main() {}"));
    }

    #[test]
    fn cat_missing_entry_fails() {
        let dir = TempDir::new().unwrap();
        let zip = fixture(dir.path());
        archivist(&dir)
            .arg("cat")
            .arg(&zip)
            .arg("/nope.txt")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Document not found"));
    }

    #[test]
    fn stat_root_uses_file_name() {
        let dir = TempDir::new().unwrap();
        let zip = fixture(dir.path());
        archivist(&dir)
            .arg("stat")
            .arg(&zip)
            .assert()
            .success()
            .stdout(predicate::str::contains("fixture.zip"))
            .stdout(predicate::str::contains("inode/directory"));
    }

    #[test]
    fn stat_entry_json() {
        let dir = TempDir::new().unwrap();
        let zip = fixture(dir.path());
        archivist(&dir)
            .arg("stat")
            .arg(&zip)
            .args(["readme.txt", "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"size\": 5"))
            .stdout(predicate::str::contains("text/plain"));
    }

    #[test]
    fn missing_archive_fails() {
        let dir = TempDir::new().unwrap();
        archivist(&dir)
            .args(["ls", "does-not-exist.zip"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Document not found"));
    }

    #[test]
    fn unsupported_container_fails_with_hint() {
        let dir = TempDir::new().unwrap();
        let text = dir.path().join("notes.txt");
        std::fs::write(&text, "plain text").unwrap();
        archivist(&dir)
            .arg("ls")
            .arg(&text)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unsupported archive type"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn corrupt_archive_reports_configured_message() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "[listing]\nloading_failed_message = \"Broken archive\"\n",
        )
        .unwrap();
        let broken = dir.path().join("broken.zip");
        std::fs::write(&broken, b"PK\x03\x04 not really").unwrap();

        archivist(&dir)
            .arg("ls")
            .arg(&broken)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Broken archive"));
    }

    #[test]
    fn config_path() {
        let dir = TempDir::new().unwrap();
        archivist(&dir)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let dir = TempDir::new().unwrap();
        archivist(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"))
            .stdout(predicate::str::contains("capacity = 4"));
    }

    #[test]
    fn config_init_writes_file_once() {
        let dir = TempDir::new().unwrap();
        archivist(&dir).args(["config", "init"]).assert().success();
        assert!(dir.path().join("config.toml").exists());

        archivist(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stderr(predicate::str::contains("already exists"));
    }

    #[test]
    fn invalid_config_fails() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.toml"), "[cache]\ncapacity = \"many\"\n").unwrap();
        archivist(&dir)
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }
}
