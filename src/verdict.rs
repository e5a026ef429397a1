use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Error};
use serde::{Deserialize, Serialize};

use crate::classify::{Fault, Outcome};
use crate::config::RuntimeReport;

/// Error message of a run that exceeded the deadline.
pub const TIME_LIMIT_EXCEEDED: &str = "Time Limit Exceeded";

/// The only observable result of a run, printed as a single JSON line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether the guest completed cleanly. `error` is `None` exactly when this is true.
    pub success: bool,
    /// The trimmed standard output of the guest, empty on failure.
    pub output: String,
    /// The classified error message, prefixed by its category.
    pub error: Option<String>,
    /// Runtime in milliseconds.
    pub runtime: u64,
}

impl Verdict {
    /// A clean completion.
    pub fn success<S: Into<String>>(output: S, runtime: u64) -> Verdict {
        Verdict {
            success: true,
            output: output.into(),
            error: None,
            runtime,
        }
    }

    /// A run that hit the deadline. The runtime is the deadline itself.
    pub fn time_limit_exceeded(deadline: Duration) -> Verdict {
        Verdict {
            success: false,
            output: String::new(),
            error: Some(TIME_LIMIT_EXCEEDED.to_owned()),
            runtime: deadline.as_millis() as u64,
        }
    }

    /// A failed run.
    pub fn failure(fault: &Fault) -> Verdict {
        Verdict {
            success: false,
            output: String::new(),
            error: Some(fault.to_string()),
            runtime: 0,
        }
    }

    /// Build the verdict of a classified run.
    pub fn from_outcome(outcome: Outcome, deadline: Duration, report: RuntimeReport) -> Verdict {
        match outcome {
            Outcome::Completed { output, wall_time } => {
                let runtime = match report {
                    RuntimeReport::Placeholder => 0,
                    RuntimeReport::Measured => wall_time.as_millis() as u64,
                };
                Verdict::success(output, runtime)
            }
            Outcome::TimedOut => Verdict::time_limit_exceeded(deadline),
            Outcome::Fault(fault) => Verdict::failure(&fault),
        }
    }

    /// Write the verdict as one line of JSON.
    pub fn emit<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        serde_json::to_writer(&mut writer, self).context("Failed to serialize the verdict")?;
        writer
            .write_all(b"\n")
            .and_then(|_| writer.flush())
            .context("Failed to write the verdict")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn emitted(verdict: &Verdict) -> String {
        let mut buf = Vec::new();
        verdict.emit(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_emit_success() {
        assert_eq!(
            emitted(&Verdict::success("hello", 0)),
            "{\"success\":true,\"output\":\"hello\",\"error\":null,\"runtime\":0}\n"
        );
    }

    #[test]
    fn test_emit_timeout() {
        assert_eq!(
            emitted(&Verdict::time_limit_exceeded(Duration::from_secs(10))),
            "{\"success\":false,\"output\":\"\",\"error\":\"Time Limit Exceeded\",\"runtime\":10000}\n"
        );
    }

    #[test]
    fn test_emit_is_a_single_line() {
        let verdict = Verdict::success("a\nb\n\"c\"", 0);
        let line = emitted(&verdict);
        assert_eq!(line.matches('\n').count(), 1);
        let parsed: Verdict = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, verdict);
    }

    #[test]
    fn test_from_outcome_runtime() {
        let completed = || Outcome::Completed {
            output: "42".into(),
            wall_time: Duration::from_millis(1234),
        };
        let deadline = Duration::from_secs(10);
        assert_eq!(
            Verdict::from_outcome(completed(), deadline, RuntimeReport::Placeholder),
            Verdict::success("42", 0)
        );
        assert_eq!(
            Verdict::from_outcome(completed(), deadline, RuntimeReport::Measured),
            Verdict::success("42", 1234)
        );
        // the timeout reports the deadline whatever the runtime policy
        assert_eq!(
            Verdict::from_outcome(Outcome::TimedOut, deadline, RuntimeReport::Measured).runtime,
            10000
        );
    }

    #[test]
    fn test_from_fault() {
        let verdict = Verdict::from_outcome(
            Outcome::Fault(Fault::runtime("name 'x' is not defined")),
            Duration::from_secs(10),
            RuntimeReport::Placeholder,
        );
        assert_eq!(
            verdict,
            Verdict {
                success: false,
                output: "".into(),
                error: Some("Runtime Error: name 'x' is not defined".into()),
                runtime: 0,
            }
        );
    }
}
