use std::sync::{Arc, Mutex};

use crate::{GuestExecution, GuestRequest, RawSandboxResult};

/// Something able to run a guest, wait for it to exit and return the results.
pub trait SandboxRunner: Send + Sync {
    /// Spawn the guest described by the request and wait for it to exit, enforcing the deadline
    /// and the ceilings. Parse the outcome and return it.
    fn run(&self, request: GuestRequest) -> RawSandboxResult;
}

/// A fake sandbox that doesn't actually spawn anything and always returns an error.
#[derive(Default, Debug)]
pub struct ErrorSandboxRunner;

impl SandboxRunner for ErrorSandboxRunner {
    fn run(&self, _request: GuestRequest) -> RawSandboxResult {
        RawSandboxResult::Error("Nope".to_owned())
    }
}

/// A fake sandbox that doesn't actually spawn anything and returns the provided execution. The
/// last request it received is kept for inspection.
#[derive(Debug)]
pub struct FakeSandboxRunner {
    execution: GuestExecution,
    last_request: Mutex<Option<GuestRequest>>,
}

impl FakeSandboxRunner {
    /// Make a runner that always returns `execution`.
    pub fn new(execution: GuestExecution) -> FakeSandboxRunner {
        FakeSandboxRunner {
            execution,
            last_request: Mutex::new(None),
        }
    }

    /// The last request this runner has been asked to run.
    pub fn last_request(&self) -> Option<GuestRequest> {
        self.last_request
            .lock()
            .ok()
            .and_then(|request| request.clone())
    }
}

impl SandboxRunner for FakeSandboxRunner {
    fn run(&self, request: GuestRequest) -> RawSandboxResult {
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request);
        }
        RawSandboxResult::Success(self.execution.clone())
    }
}

impl<S: SandboxRunner> SandboxRunner for Arc<S> {
    fn run(&self, request: GuestRequest) -> RawSandboxResult {
        self.as_ref().run(request)
    }
}
