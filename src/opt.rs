use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::config::{RunnerConfig, RuntimeReport, DEFAULT_INPUT_PATH, DEFAULT_PROGRAM_PATH};
use crate::python::DEFAULT_INTERPRETER;

#[derive(Parser, Debug)]
#[clap(name = "judge-runner", version)]
pub struct Opt {
    /// Path of the Python program to run
    #[clap(long, default_value = DEFAULT_PROGRAM_PATH)]
    pub program: PathBuf,

    /// Path of the file sent to the standard input of the program
    ///
    /// When the file does not exist the program receives an empty input.
    #[clap(long, default_value = DEFAULT_INPUT_PATH)]
    pub input: PathBuf,

    /// Name or path of the Python 3 interpreter
    #[clap(long, env = "JUDGE_RUNNER_PYTHON", default_value = DEFAULT_INTERPRETER)]
    pub python: String,

    /// Report the measured wall-clock time of successful runs instead of 0
    #[clap(long)]
    pub measure_runtime: bool,

    #[clap(flatten)]
    pub logger: LoggerOpt,
}

#[derive(Parser, Debug, Clone)]
pub struct LoggerOpt {
    /// Verbose mode (-v, -vv, -vvv, etc.). The logs go to stderr, the verdict is unaffected.
    #[clap(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Opt {
    /// Make the configuration of the run from the command line options.
    pub fn to_config(&self) -> RunnerConfig {
        RunnerConfig {
            program_path: self.program.clone(),
            input_path: self.input.clone(),
            interpreter: self.python.clone(),
            runtime_report: if self.measure_runtime {
                RuntimeReport::Measured
            } else {
                RuntimeReport::Placeholder
            },
            ..Default::default()
        }
    }
}

impl LoggerOpt {
    pub fn enable_log(&self) {
        if self.verbose > 0 {
            std::env::set_var("RUST_BACKTRACE", "1");
            match self.verbose {
                0 => unreachable!(),
                1 => std::env::set_var("RUST_LOG", "info"),
                2 => std::env::set_var("RUST_LOG", "debug"),
                _ => std::env::set_var("RUST_LOG", "trace"),
            }
        }

        env_logger::Builder::from_default_env()
            .format_timestamp_nanos()
            .init();
        better_panic::install();
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_defaults() {
        let opt = Opt::try_parse_from(["judge-runner"]).unwrap();
        let config = opt.to_config();
        assert_eq!(config.program_path, PathBuf::from("/workspace/solution.py"));
        assert_eq!(config.input_path, PathBuf::from("/workspace/input.txt"));
        assert_eq!(config.runtime_report, RuntimeReport::Placeholder);
        assert_eq!(opt.logger.verbose, 0);
    }

    #[test]
    fn test_overrides() {
        let opt = Opt::try_parse_from([
            "judge-runner",
            "--program",
            "/tmp/a.py",
            "--input",
            "/tmp/in",
            "--python",
            "/usr/bin/python3.12",
            "--measure-runtime",
            "-vv",
        ])
        .unwrap();
        assert_eq!(opt.logger.verbose, 2);
        let config = opt.to_config();
        assert_eq!(config.program_path, PathBuf::from("/tmp/a.py"));
        assert_eq!(config.input_path, PathBuf::from("/tmp/in"));
        assert_eq!(config.interpreter, "/usr/bin/python3.12");
        assert_eq!(config.runtime_report, RuntimeReport::Measured);
        assert_eq!(config.deadline, RunnerConfig::default().deadline);
    }
}
