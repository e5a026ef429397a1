//! Turn the raw outcome of the guest process into one of the three outcomes of a run.

use std::fmt::{Display, Formatter};
use std::time::Duration;

use judge_runner_exec::{ExitStatus, GuestExecution};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use crate::python::EXCEPTION_MARKER;

/// Coarse category of a failed run, used as the prefix of the error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultCategory {
    /// The source is malformed.
    Syntax,
    /// The source references a module that is not available.
    Import,
    /// Everything else.
    Runtime,
}

impl FaultCategory {
    /// The prefix of the error message for this category.
    pub fn prefix(&self) -> &'static str {
        match self {
            FaultCategory::Syntax => "Syntax Error",
            FaultCategory::Import => "Import Error",
            FaultCategory::Runtime => "Runtime Error",
        }
    }

    /// The category of a Python exception, given the name of its class.
    pub fn of_exception(name: &str) -> FaultCategory {
        match name {
            "SyntaxError" | "IndentationError" | "TabError" => FaultCategory::Syntax,
            "ImportError" | "ModuleNotFoundError" => FaultCategory::Import,
            _ => FaultCategory::Runtime,
        }
    }
}

/// A classified failure of the guest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    /// The category of the failure.
    pub category: FaultCategory,
    /// Human readable description, without the prefix.
    pub message: String,
}

impl Fault {
    /// A runtime fault with this message.
    pub fn runtime<S: Display>(message: S) -> Fault {
        Fault {
            category: FaultCategory::Runtime,
            message: message.to_string(),
        }
    }
}

impl Display for Fault {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.category.prefix(), self.message)
    }
}

/// How a run ended. Exactly one of these is produced per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The guest exited cleanly.
    Completed {
        /// The standard output, trimmed.
        output: String,
        /// How long the guest took.
        wall_time: Duration,
    },
    /// The guest hasn't finished in time.
    TimedOut,
    /// The guest failed.
    Fault(Fault),
}

/// The exception that stopped the guest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PythonException {
    /// Name of the exception class, without the module.
    pub name: String,
    /// The message of the exception, possibly empty.
    pub message: String,
}

lazy_static! {
    /// The last line of a traceback: `module.Name: message` or just `Name`.
    static ref EXCEPTION_LINE: Regex =
        Regex::new(r"^(?:[A-Za-z_][A-Za-z0-9_]*\.)*([A-Za-z_][A-Za-z0-9_]*)(?:: ?(.*))?$")
            .expect("Invalid exception regex");
}

/// Find the exception reported by the bootstrap in the standard error of the guest.
pub fn parse_report(stderr: &str) -> Option<PythonException> {
    let line = stderr
        .lines()
        .rev()
        .find_map(|line| line.strip_prefix(EXCEPTION_MARKER))?;
    match serde_json::from_str(line) {
        Ok(exception) => Some(exception),
        Err(e) => {
            warn!("Malformed exception report {:?}: {}", line, e);
            None
        }
    }
}

/// Find the exception that killed the interpreter in its standard error, when it was not reported
/// by the bootstrap.
///
/// A traceback is recognized by its header, or by the `File "...", line N` location line that
/// syntax errors of the main script print without the header. The exception is the last
/// non-empty line, which is not indented.
pub fn parse_exception(stderr: &str) -> Option<PythonException> {
    let is_traceback = stderr.contains("Traceback (most recent call last):")
        || stderr.lines().any(|line| line.starts_with("  File \""));
    if !is_traceback {
        return None;
    }
    let last = stderr.lines().rev().find(|line| !line.trim().is_empty())?;
    if last.starts_with(char::is_whitespace) {
        return None;
    }
    let captures = EXCEPTION_LINE.captures(last.trim_end())?;
    Some(PythonException {
        name: captures[1].to_owned(),
        message: captures
            .get(2)
            .map(|m| m.as_str().trim().to_owned())
            .unwrap_or_default(),
    })
}

/// Classify a completed guest execution.
pub fn classify(execution: &GuestExecution) -> Outcome {
    // hitting the CPU ceiling is a time limit too
    if execution.status == ExitStatus::Killed || execution.status.exceeded_cpu_time() {
        return Outcome::TimedOut;
    }
    if execution.output_limit_exceeded {
        return Outcome::Fault(Fault::runtime("output limit exceeded"));
    }
    if execution.status.is_success() {
        return Outcome::Completed {
            output: String::from_utf8_lossy(&execution.stdout).trim().to_owned(),
            wall_time: execution.wall_time,
        };
    }

    let stderr = String::from_utf8_lossy(&execution.stderr);
    if !stderr.is_empty() {
        debug!("Guest stderr:\n{}", stderr);
    }
    if let Some(exception) = parse_report(&stderr).or_else(|| parse_exception(&stderr)) {
        let category = FaultCategory::of_exception(&exception.name);
        let message = if exception.message.is_empty() {
            exception.name
        } else {
            exception.message
        };
        return Outcome::Fault(Fault { category, message });
    }
    match execution.status {
        ExitStatus::ExitCode(code) => {
            Outcome::Fault(Fault::runtime(format!("exited with status {}", code)))
        }
        ExitStatus::Signal(_) => Outcome::Fault(Fault::runtime(format!(
            "killed by signal {}",
            execution.status.signal_name().unwrap_or_default()
        ))),
        ExitStatus::Killed => Outcome::TimedOut,
    }
}
