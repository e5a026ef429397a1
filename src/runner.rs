use judge_runner_exec::{GuestRequest, RawSandboxResult, SandboxRunner};

use crate::classify::{classify, Fault, Outcome};
use crate::config::RunnerConfig;
use crate::error::RunnerError;
use crate::program::{GuestProgram, InputBuffer, Workspace};
use crate::python::LanguagePython;
use crate::verdict::Verdict;

/// Runs the guest once and turns what happened into a [`Verdict`].
pub struct Runner<S: SandboxRunner> {
    config: RunnerConfig,
    sandbox: S,
}

impl<S: SandboxRunner> Runner<S> {
    /// Make a new runner that executes the guest using `sandbox`.
    pub fn new(config: RunnerConfig, sandbox: S) -> Runner<S> {
        Runner { config, sandbox }
    }

    /// The configuration of the runner.
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run the guest. Every failure, of the guest or of the runner, ends up in the verdict.
    pub fn run(&self) -> Verdict {
        let outcome = match self.execute() {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("The guest could not be run: {}", e);
                Outcome::Fault(Fault::runtime(e))
            }
        };
        let verdict =
            Verdict::from_outcome(outcome, self.config.deadline, self.config.runtime_report);
        info!(
            "Verdict: success={} runtime={}ms error={:?}",
            verdict.success, verdict.runtime, verdict.error
        );
        verdict
    }

    /// Load the program and the input, stage them and execute the guest.
    pub fn execute(&self) -> Result<Outcome, RunnerError> {
        let program = GuestProgram::load(&self.config.program_path)?;
        let input = InputBuffer::load(&self.config.input_path)?;
        let language = LanguagePython::new(self.config.interpreter.clone());
        let workspace = Workspace::stage(&program, &language)?;
        let interpreter = language.runtime_command()?;
        debug!(
            "Running {} with {} ({} bytes of input)",
            workspace.program_path().display(),
            interpreter.display(),
            input.as_bytes().len()
        );

        let mut request = GuestRequest::new(interpreter, workspace.path());
        request.args = language.runtime_args(workspace.program_path());
        request.env = language.runtime_env(workspace.path());
        request.stdin = input.into_bytes();
        request.ceilings = self.config.ceilings;
        request.wall_time_limit = self.config.deadline;
        request.stdout_limit = self.config.stdout_limit;
        request.stderr_limit = self.config.stderr_limit;

        match self.sandbox.run(request) {
            RawSandboxResult::Success(execution) => Ok(classify(&execution)),
            RawSandboxResult::Error(e) => Err(RunnerError::Sandbox(e)),
        }
        // the workspace is dropped, and deleted, only after the guest is dead
    }
}
