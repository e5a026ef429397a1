#![allow(dead_code)]

use std::time::Duration;

use judge_runner_exec::{
    GuestExecution, GuestRequest, ProcessSandboxRunner, RawSandboxResult, SandboxRunner,
};

pub fn setup() {
    let _ = env_logger::Builder::from_default_env()
        .format_timestamp_nanos()
        .is_test(true)
        .try_init();
}

/// A request running `script` with `/bin/sh`.
pub fn shell(script: &str) -> GuestRequest {
    let mut request = GuestRequest::new("/bin/sh", std::env::temp_dir());
    request.args = vec!["-c".into(), script.into()];
    request.env = vec![("PATH".into(), "/usr/bin:/bin".into())];
    request.wall_time_limit = Duration::from_secs(10);
    // the shell forks, and the process ceiling counts every process of the user
    request.ceilings.processes = 4096;
    request
}

pub fn run(request: GuestRequest) -> GuestExecution {
    match ProcessSandboxRunner.run(request) {
        RawSandboxResult::Success(res) => res,
        RawSandboxResult::Error(e) => panic!("The sandbox failed: {}", e),
    }
}
