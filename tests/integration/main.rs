//! Integration tests for getpack

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::process::Stdio;
    use tempfile::TempDir;
    use url::Url;

    /// Isolated cache and config under one temp dir
    struct Sandbox {
        dir: TempDir,
    }

    impl Sandbox {
        fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
            }
        }

        fn cache_dir(&self) -> PathBuf {
            self.dir.path().join("cache")
        }

        fn config_path(&self) -> PathBuf {
            self.dir.path().join("config").join("config.toml")
        }

        fn cmd(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("getpack");
            cmd.env("GETPACK_CACHE_DIR", self.cache_dir())
                .env("GETPACK_CONFIG", self.config_path())
                .env("CI", "1");
            cmd
        }

        /// Write `content` as an artifact and declare it in a catalog file
        fn declare(&self, name: &str, file: &str, content: &[u8]) -> PathBuf {
            let artifacts = self.dir.path().join("artifacts");
            fs::create_dir_all(&artifacts).unwrap();
            let artifact = artifacts.join(file);
            fs::write(&artifact, content).unwrap();
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&artifact, fs::Permissions::from_mode(0o755)).unwrap();
            }

            let catalog = self.dir.path().join("catalog.toml");
            let source = Url::from_file_path(&artifact).unwrap();
            let mut existing = fs::read_to_string(&catalog).unwrap_or_default();
            existing.push_str(&format!(
                "[{name}]\nkind = \"tool\"\nversion = \"1.0\"\nsource = \"{source}\"\n\n"
            ));
            fs::write(&catalog, existing).unwrap();
            catalog
        }
    }

    fn stdout_path(output: &[u8]) -> PathBuf {
        PathBuf::from(String::from_utf8_lossy(output).trim())
    }

    #[test]
    fn help_displays() {
        cargo_bin_cmd!("getpack")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("fetch external resources"));
    }

    #[test]
    fn version_displays() {
        cargo_bin_cmd!("getpack")
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("getpack"));
    }

    #[test]
    fn config_path_honors_env() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"))
            .stdout(predicate::str::contains("lock_timeout_secs = 300"));
    }

    #[test]
    fn config_init_refuses_overwrite() {
        let sandbox = Sandbox::new();
        sandbox.cmd().args(["config", "init"]).assert().success();
        assert!(sandbox.config_path().is_file());

        sandbox
            .cmd()
            .args(["config", "init"])
            .assert()
            .success()
            .stderr(predicate::str::contains("--force"));
    }

    #[test]
    fn catalog_lists_builtin() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["catalog", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("ffmpeg"));
    }

    #[test]
    fn list_empty_cache() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["list", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::diff("[]\n"));
    }

    #[test]
    fn unknown_resource_fails_with_hint() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["path", "no-such-thing"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown resource"))
            .stderr(predicate::str::contains("getpack catalog"));
    }

    #[test]
    fn path_materializes_once() {
        let sandbox = Sandbox::new();
        let catalog = sandbox.declare("sample", "sample-1.0.bin", b"payload");

        let first = sandbox
            .cmd()
            .arg("--catalog")
            .arg(&catalog)
            .args(["path", "sample"])
            .assert()
            .success();
        let path = stdout_path(&first.get_output().stdout);
        assert!(path.starts_with(sandbox.cache_dir()));
        assert_eq!(fs::read(path.join("sample-1.0.bin")).unwrap(), b"payload");

        let second = sandbox
            .cmd()
            .arg("--catalog")
            .arg(&catalog)
            .args(["path", "sample"])
            .assert()
            .success();
        assert_eq!(stdout_path(&second.get_output().stdout), path);

        sandbox
            .cmd()
            .args(["list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains(path.to_string_lossy().as_ref()));
    }

    #[test]
    fn fetch_then_remove() {
        let sandbox = Sandbox::new();
        sandbox.declare("one", "one.bin", b"1");
        let catalog = sandbox.declare("two", "two.bin", b"2");

        sandbox
            .cmd()
            .arg("--catalog")
            .arg(&catalog)
            .args(["fetch", "one", "two"])
            .assert()
            .success()
            .stdout(predicate::str::contains("one 1.0"))
            .stdout(predicate::str::contains("two 1.0"));

        sandbox
            .cmd()
            .arg("--catalog")
            .arg(&catalog)
            .args(["remove", "one"])
            .assert()
            .success();

        let listed = sandbox
            .cmd()
            .args(["list", "--format", "json"])
            .assert()
            .success();
        let entries: serde_json::Value =
            serde_json::from_slice(&listed.get_output().stdout).unwrap();
        let entries = entries.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["name"], "two");
        assert_eq!(entries[0]["state"], "complete");
    }

    #[test]
    fn clean_requires_confirmation() {
        let sandbox = Sandbox::new();
        let catalog = sandbox.declare("sample", "sample.bin", b"x");
        sandbox
            .cmd()
            .arg("--catalog")
            .arg(&catalog)
            .args(["path", "sample"])
            .assert()
            .success();

        sandbox
            .cmd()
            .arg("clean")
            .assert()
            .success()
            .stderr(predicate::str::contains("Aborted"));
        assert_eq!(count_entries(&sandbox.cache_dir()), 1);

        sandbox.cmd().args(["clean", "--yes"]).assert().success();
        assert_eq!(count_entries(&sandbox.cache_dir()), 0);
    }

    #[test]
    fn concurrent_processes_share_one_entry() {
        const PROCESSES: usize = 6;
        let sandbox = Sandbox::new();
        let payload = vec![b'z'; 4 << 20];
        let catalog = sandbox.declare("shared", "shared.bin", &payload);

        let children: Vec<_> = (0..PROCESSES)
            .map(|_| {
                std::process::Command::new(env!("CARGO_BIN_EXE_getpack"))
                    .env("GETPACK_CACHE_DIR", sandbox.cache_dir())
                    .env("GETPACK_CONFIG", sandbox.config_path())
                    .env("CI", "1")
                    .arg("--catalog")
                    .arg(&catalog)
                    .args(["path", "shared"])
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped())
                    .spawn()
                    .unwrap()
            })
            .collect();

        let paths: Vec<PathBuf> = children
            .into_iter()
            .map(|child| {
                let output = child.wait_with_output().unwrap();
                assert!(
                    output.status.success(),
                    "stderr: {}",
                    String::from_utf8_lossy(&output.stderr)
                );
                stdout_path(&output.stdout)
            })
            .collect();

        assert!(paths.iter().all(|p| p == &paths[0]));
        assert_eq!(fs::read(paths[0].join("shared.bin")).unwrap().len(), payload.len());
        assert_eq!(count_entries(&sandbox.cache_dir()), 1);

        let listed = sandbox
            .cmd()
            .args(["list", "--format", "json"])
            .assert()
            .success();
        let entries: serde_json::Value =
            serde_json::from_slice(&listed.get_output().stdout).unwrap();
        assert_eq!(entries.as_array().unwrap().len(), 1);
        assert_eq!(entries[0]["state"], "complete");
    }

    fn count_entries(root: &Path) -> usize {
        fs::read_dir(root)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
            .count()
    }

    #[cfg(unix)]
    #[test]
    fn run_executes_program() {
        let sandbox = Sandbox::new();
        let catalog = sandbox.declare("hello", "hello", b"#!/bin/sh\necho \"hello $1\"\n");

        sandbox
            .cmd()
            .arg("--catalog")
            .arg(&catalog)
            .args(["run", "hello", "--", "world"])
            .assert()
            .success()
            .stdout(predicate::str::contains("hello world"));
    }

    #[cfg(unix)]
    #[test]
    fn run_propagates_exit_code() {
        let sandbox = Sandbox::new();
        let catalog = sandbox.declare("failing", "failing", b"#!/bin/sh\nexit 3\n");

        sandbox
            .cmd()
            .arg("--catalog")
            .arg(&catalog)
            .args(["run", "failing"])
            .assert()
            .code(3);
    }

    #[test]
    fn completions_generate() {
        cargo_bin_cmd!("getpack")
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("getpack"));
    }
}
