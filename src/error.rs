use std::path::PathBuf;

use thiserror::Error;

/// Failures of the runner that happen around the guest, not inside it.
///
/// They are all reported to the consumer as a runtime error of the guest.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The guest program cannot be read, usually because it's missing.
    #[error("cannot read the guest program {path}: {source}")]
    MissingProgram {
        /// Where the program was expected.
        path: PathBuf,
        /// The underlying failure.
        source: std::io::Error,
    },
    /// The input file exists but cannot be read.
    #[error("cannot read the input file {path}: {source}")]
    UnreadableInput {
        /// Where the input was expected.
        path: PathBuf,
        /// The underlying failure.
        source: std::io::Error,
    },
    /// The scratch directory of the guest cannot be prepared.
    #[error("cannot prepare the scratch directory: {0}")]
    Staging(#[source] std::io::Error),
    /// The interpreter is not installed.
    #[error("interpreter {name:?} not found: {source}")]
    InterpreterNotFound {
        /// The name or path of the interpreter.
        name: String,
        /// The lookup failure.
        source: which::Error,
    },
    /// The sandbox failed to execute the guest.
    #[error("sandbox failure: {0}")]
    Sandbox(String),
}
