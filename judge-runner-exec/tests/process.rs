mod common;

use std::time::{Duration, Instant};

use common::{run, setup, shell};
use judge_runner_exec::{
    ExitStatus, GuestRequest, ProcessSandboxRunner, RawSandboxResult, SandboxRunner,
};
use pretty_assertions::assert_eq;
use speculoos::prelude::*;

#[test]
fn test_stdin_is_forwarded() {
    setup();
    let mut request = shell("cat");
    request.stdin = b"hello\nworld\n".to_vec();
    let res = run(request);
    assert_eq!(res.status, ExitStatus::ExitCode(0));
    assert_eq!(res.stdout, b"hello\nworld\n".to_vec());
    assert!(!res.output_limit_exceeded);
}

#[test]
fn test_empty_stdin_is_eof() {
    setup();
    let res = run(shell("cat; echo done"));
    assert_eq!(res.status, ExitStatus::ExitCode(0));
    assert_eq!(res.stdout, b"done\n".to_vec());
}

#[test]
fn test_guest_not_reading_input() {
    setup();
    let mut request = shell("exit 0");
    request.stdin = vec![b'x'; 4 * 1024 * 1024];
    let res = run(request);
    assert_eq!(res.status, ExitStatus::ExitCode(0));
}

#[test]
fn test_exit_code_and_stderr() {
    setup();
    let res = run(shell("echo out; echo oops >&2; exit 3"));
    assert_eq!(res.status, ExitStatus::ExitCode(3));
    assert_eq!(res.stdout, b"out\n".to_vec());
    assert_eq!(res.stderr, b"oops\n".to_vec());
}

#[test]
fn test_killed_by_signal() {
    setup();
    let res = run(shell("kill -SEGV $$"));
    assert_eq!(res.status, ExitStatus::Signal(11));
    assert_eq!(res.status.signal_name().unwrap(), "SIGSEGV");
}

#[test]
fn test_deadline() {
    setup();
    let mut request = shell("sleep 30");
    request.wall_time_limit = Duration::from_millis(300);
    let start = Instant::now();
    let res = run(request);
    assert_eq!(res.status, ExitStatus::Killed);
    assert_that(&start.elapsed()).is_less_than(Duration::from_secs(10));
}

#[test]
fn test_deadline_kills_the_whole_group() {
    setup();
    // the background sleep keeps stdout open: the run ends only if it's killed too
    let mut request = shell("sleep 30 & sleep 30");
    request.wall_time_limit = Duration::from_millis(300);
    let start = Instant::now();
    let res = run(request);
    assert_eq!(res.status, ExitStatus::Killed);
    assert_that(&start.elapsed()).is_less_than(Duration::from_secs(10));
}

#[test]
fn test_leftover_children_do_not_block() {
    setup();
    let start = Instant::now();
    let res = run(shell("sleep 30 & echo bye"));
    assert_eq!(res.status, ExitStatus::ExitCode(0));
    assert_eq!(res.stdout, b"bye\n".to_vec());
    assert_that(&start.elapsed()).is_less_than(Duration::from_secs(10));
}

/// Whether `setsid` is available to move a process out of the group of the guest.
fn has_setsid() -> bool {
    ["/usr/bin/setsid", "/bin/setsid"]
        .iter()
        .any(|path| std::path::Path::new(path).exists())
}

#[test]
fn test_detached_child_holding_the_pipes() {
    setup();
    if !has_setsid() {
        return;
    }
    // the detached sleep is in another session: it keeps stdout open and cannot be killed
    let mut request = shell("setsid sleep 30 & echo bye");
    request.wall_time_limit = Duration::from_secs(1);
    let start = Instant::now();
    let res = run(request);
    assert_eq!(res.status, ExitStatus::Killed);
    assert_eq!(res.stdout, b"bye\n".to_vec());
    assert_that(&start.elapsed()).is_less_than(Duration::from_secs(5));
}

#[test]
fn test_detached_child_and_spinning_guest() {
    setup();
    if !has_setsid() {
        return;
    }
    let mut request = shell("setsid sleep 30 & while :; do :; done");
    request.wall_time_limit = Duration::from_millis(500);
    let start = Instant::now();
    let res = run(request);
    assert_eq!(res.status, ExitStatus::Killed);
    assert_that(&start.elapsed()).is_less_than(Duration::from_secs(5));
}

#[test]
fn test_detached_child_with_closed_pipes() {
    setup();
    if !has_setsid() {
        return;
    }
    let start = Instant::now();
    let res = run(shell("setsid sleep 30 </dev/null >/dev/null 2>&1 & echo bye"));
    assert_eq!(res.status, ExitStatus::ExitCode(0));
    assert_eq!(res.stdout, b"bye\n".to_vec());
    assert_that(&start.elapsed()).is_less_than(Duration::from_secs(5));
}

#[test]
fn test_output_limit() {
    setup();
    let mut request = shell("yes");
    request.stdout_limit = 1000;
    let res = run(request);
    assert!(res.output_limit_exceeded);
    assert_eq!(res.stdout.len(), 1000);
    assert_ne!(res.status, ExitStatus::ExitCode(0));
}

#[test]
fn test_environment_is_cleared() {
    setup();
    std::env::set_var("JUDGE_RUNNER_TEST_SECRET", "leaked");
    let res = run(shell("echo \"[$JUDGE_RUNNER_TEST_SECRET]\""));
    assert_eq!(res.stdout, b"[]\n".to_vec());
}

#[test]
fn test_cpu_ceiling_is_installed() {
    setup();
    let (_, hard) = rlimit::getrlimit(rlimit::Resource::CPU).unwrap();
    if hard != rlimit::INFINITY && hard < 10 {
        return;
    }
    let res = run(shell("ulimit -t"));
    assert_eq!(String::from_utf8_lossy(&res.stdout).trim(), "10");
}

#[test]
fn test_missing_executable() {
    setup();
    let request = GuestRequest::new("/this/does/not/exist", std::env::temp_dir());
    match ProcessSandboxRunner.run(request) {
        RawSandboxResult::Error(e) => assert_that(&e).contains("/this/does/not/exist"),
        RawSandboxResult::Success(res) => panic!("Expected an error, got {:?}", res),
    }
}
