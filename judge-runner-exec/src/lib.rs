//! Execution of a single guest program in a child process.
//!
//! This crate knows nothing about Python or verdicts: given a [`GuestRequest`] it spawns the
//! command in its own process group, feeds it the input, captures its output and reports how it
//! ended. The policy that turns that into a verdict lives in the `judge-runner` crate.
//!
//! The pieces of an execution are:
//!
//! - [`ResourceCeilings`] computes a [`CeilingPlan`] in the parent, which is then installed in the
//!   child between `fork` and `exec`. Every failure there is swallowed.
//! - [`TimeoutGuard`] kills the process group of the guest when the wall-clock deadline expires.
//! - [`BoundedCapture`] collects stdout and stderr without letting the guest grow the memory of
//!   the runner past a limit.
//! - [`SandboxRunner`] is the seam between the runner and the actual spawning.
//!   [`ProcessSandboxRunner`] is the real one, the others are used in tests.

#![deny(missing_docs)]

#[macro_use]
extern crate log;
#[macro_use(defer)]
extern crate scopeguard;

use std::path::PathBuf;
use std::time::Duration;

use nix::sys::signal::Signal;
use serde::{Deserialize, Serialize};

pub use capture::{BoundedCapture, Captured, Keep, PendingCapture};
pub use guard::{TimeoutGuard, DEFAULT_DEADLINE};
pub use limits::{Ceiling, CeilingPlan, ResourceCeilings};
pub use process::ProcessSandboxRunner;
pub use sandbox_runner::{ErrorSandboxRunner, FakeSandboxRunner, SandboxRunner};

mod capture;
mod guard;
pub mod limits;
mod process;
mod sandbox_runner;

/// Default maximum number of bytes of stdout kept from the guest.
pub const DEFAULT_STDOUT_LIMIT: usize = 10 * 1024 * 1024;
/// Default maximum number of bytes of stderr kept from the guest.
pub const DEFAULT_STDERR_LIMIT: usize = 1024 * 1024;

/// What to run and with which constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuestRequest {
    /// Absolute path of the executable.
    pub executable: PathBuf,
    /// Arguments to pass to the executable.
    pub args: Vec<String>,
    /// Working directory of the guest.
    pub working_directory: PathBuf,
    /// The whole environment of the guest, nothing else is inherited.
    pub env: Vec<(String, String)>,
    /// Content sent to the standard input of the guest, which is then closed.
    pub stdin: Vec<u8>,
    /// Ceilings installed on the guest process.
    pub ceilings: ResourceCeilings,
    /// Wall-clock deadline of the execution.
    pub wall_time_limit: Duration,
    /// Above this number of bytes of stdout the guest is killed.
    pub stdout_limit: usize,
    /// Only the last bytes of stderr up to this number are kept.
    pub stderr_limit: usize,
}

impl GuestRequest {
    /// A request with the default limits and no input.
    pub fn new<P: Into<PathBuf>, W: Into<PathBuf>>(executable: P, working_directory: W) -> Self {
        GuestRequest {
            executable: executable.into(),
            args: vec![],
            working_directory: working_directory.into(),
            env: vec![],
            stdin: vec![],
            ceilings: ResourceCeilings::default(),
            wall_time_limit: DEFAULT_DEADLINE,
            stdout_limit: DEFAULT_STDOUT_LIMIT,
            stderr_limit: DEFAULT_STDERR_LIMIT,
        }
    }
}

/// How the guest process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitStatus {
    /// The process exited with this code.
    ExitCode(i32),
    /// The process was terminated by this signal.
    Signal(i32),
    /// The process was killed because the wall-clock deadline expired.
    Killed,
}

impl ExitStatus {
    /// Whether the process exited with status zero.
    pub fn is_success(&self) -> bool {
        matches!(self, ExitStatus::ExitCode(0))
    }

    /// Whether the process was terminated for exceeding the CPU time ceiling.
    pub fn exceeded_cpu_time(&self) -> bool {
        matches!(self, ExitStatus::Signal(signal) if *signal == Signal::SIGXCPU as i32)
    }

    /// The name of the signal that terminated the process, like `SIGSEGV`.
    pub fn signal_name(&self) -> Option<String> {
        match self {
            ExitStatus::Signal(signal) => Some(
                Signal::try_from(*signal)
                    .map(|s| s.as_str().to_owned())
                    .unwrap_or_else(|_| format!("signal {}", signal)),
            ),
            _ => None,
        }
    }
}

/// Everything observed about a completed guest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuestExecution {
    /// How the process ended.
    pub status: ExitStatus,
    /// The standard output, at most `stdout_limit` bytes.
    pub stdout: Vec<u8>,
    /// The tail of the standard error, at most `stderr_limit` bytes.
    pub stderr: Vec<u8>,
    /// Whether the guest was killed for writing too much to stdout.
    pub output_limit_exceeded: bool,
    /// Time from the spawn to the exit of the process.
    pub wall_time: Duration,
}

impl GuestExecution {
    /// An execution that exited with `code` after printing `stdout` and `stderr`.
    pub fn exited<O: Into<Vec<u8>>, E: Into<Vec<u8>>>(code: i32, stdout: O, stderr: E) -> Self {
        GuestExecution {
            status: ExitStatus::ExitCode(code),
            stdout: stdout.into(),
            stderr: stderr.into(),
            output_limit_exceeded: false,
            wall_time: Duration::ZERO,
        }
    }
}

/// The outcome of a [`SandboxRunner`]. `Error` means that the runner failed to execute the
/// guest, not that the guest failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawSandboxResult {
    /// The guest has been executed.
    Success(GuestExecution),
    /// The runner failed, with this message.
    Error(String),
}
