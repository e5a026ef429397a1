//! # judge-runner
//!
//! Runs an untrusted Python 3 program once, with its input on stdin, under resource ceilings and
//! a wall-clock deadline, and reports what happened as a single JSON [`Verdict`].
//!
//! This is both an application and a library: the binary is a thin wrapper around [`Runner`].

#[macro_use]
extern crate log;

pub mod classify;
pub mod config;
mod error;
pub mod opt;
pub mod program;
pub mod python;
pub mod runner;
pub mod verdict;

pub use classify::{classify, Fault, FaultCategory, Outcome};
pub use config::{RunnerConfig, RuntimeReport};
pub use error::RunnerError;
pub use opt::{LoggerOpt, Opt};
pub use runner::Runner;
pub use verdict::Verdict;
