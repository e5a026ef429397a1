#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use judge_runner::{Runner, RunnerConfig, Verdict};
use judge_runner_exec::ProcessSandboxRunner;
use tempfile::TempDir;

pub fn setup() {
    let _ = env_logger::Builder::from_default_env()
        .format_timestamp_nanos()
        .is_test(true)
        .try_init();
}

/// Whether a Python 3 interpreter is installed. Without one the end-to-end tests are skipped.
pub fn has_python() -> bool {
    if which::which("python3").is_ok() {
        true
    } else {
        eprintln!("python3 not found, skipping");
        false
    }
}

/// A directory with the guest program and, optionally, its input.
pub struct TestDir {
    pub dir: TempDir,
}

impl TestDir {
    pub fn new(program: &str, input: Option<&str>) -> TestDir {
        let dir = tempfile::Builder::new()
            .prefix("judge-runner-test")
            .tempdir()
            .unwrap();
        std::fs::write(dir.path().join("solution.py"), program).unwrap();
        if let Some(input) = input {
            std::fs::write(dir.path().join("input.txt"), input).unwrap();
        }
        TestDir { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn program_path(&self) -> PathBuf {
        self.path().join("solution.py")
    }

    pub fn input_path(&self) -> PathBuf {
        self.path().join("input.txt")
    }

    pub fn config(&self) -> RunnerConfig {
        RunnerConfig {
            program_path: self.program_path(),
            input_path: self.input_path(),
            ..Default::default()
        }
    }
}

/// Run `program` with `input` using the real sandbox.
pub fn run_python(program: &str, input: Option<&str>) -> Verdict {
    let dir = TestDir::new(program, input);
    Runner::new(dir.config(), ProcessSandboxRunner::default()).run()
}

/// Like [`run_python`] but with a custom deadline.
pub fn run_python_with_deadline(program: &str, input: Option<&str>, deadline: Duration) -> Verdict {
    let dir = TestDir::new(program, input);
    let mut config = dir.config();
    config.deadline = deadline;
    Runner::new(config, ProcessSandboxRunner::default()).run()
}
