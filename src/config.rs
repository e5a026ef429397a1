use std::path::PathBuf;
use std::time::Duration;

use judge_runner_exec::{
    ResourceCeilings, DEFAULT_DEADLINE, DEFAULT_STDERR_LIMIT, DEFAULT_STDOUT_LIMIT,
};

use crate::python::DEFAULT_INTERPRETER;

/// Where the supervisor stages the guest program.
pub const DEFAULT_PROGRAM_PATH: &str = "/workspace/solution.py";
/// Where the supervisor stages the input of the guest, if any.
pub const DEFAULT_INPUT_PATH: &str = "/workspace/input.txt";

/// What to report as the runtime of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeReport {
    /// Always report 0.
    #[default]
    Placeholder,
    /// Report the measured wall-clock time.
    Measured,
}

/// Configuration of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    /// Path of the guest program.
    pub program_path: PathBuf,
    /// Path of the input file; a missing file means an empty input.
    pub input_path: PathBuf,
    /// Name or path of the Python interpreter.
    pub interpreter: String,
    /// Ceilings installed on the guest.
    pub ceilings: ResourceCeilings,
    /// Wall-clock deadline of the guest.
    pub deadline: Duration,
    /// Maximum number of bytes the guest can write to stdout.
    pub stdout_limit: usize,
    /// Number of bytes of stderr kept for the classification.
    pub stderr_limit: usize,
    /// The runtime to report on success.
    pub runtime_report: RuntimeReport,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            program_path: DEFAULT_PROGRAM_PATH.into(),
            input_path: DEFAULT_INPUT_PATH.into(),
            interpreter: DEFAULT_INTERPRETER.into(),
            ceilings: ResourceCeilings::default(),
            deadline: DEFAULT_DEADLINE,
            stdout_limit: DEFAULT_STDOUT_LIMIT,
            stderr_limit: DEFAULT_STDERR_LIMIT,
            runtime_report: RuntimeReport::default(),
        }
    }
}
