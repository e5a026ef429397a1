use std::io::{ErrorKind, Write};
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Error};
use crossbeam_channel::bounded;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;

use crate::{
    BoundedCapture, Captured, ExitStatus, GuestExecution, GuestRequest, RawSandboxResult,
    SandboxRunner, TimeoutGuard,
};

/// Run the guest as a child process of the runner, in its own process group.
///
/// The ceilings are installed in the child right before `exec`, the standard streams are pipes
/// owned by the runner and the whole group is killed when the deadline expires or when the guest
/// writes too much.
#[derive(Clone, Debug, Default)]
pub struct ProcessSandboxRunner;

impl SandboxRunner for ProcessSandboxRunner {
    fn run(&self, request: GuestRequest) -> RawSandboxResult {
        match run_guest(request) {
            Ok(execution) => RawSandboxResult::Success(execution),
            Err(e) => RawSandboxResult::Error(format!("{:#}", e)),
        }
    }
}

/// How long after the deadline the output of the guest is still waited for.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Send `SIGKILL` to a whole process group, ignoring the errors: the group may be already gone.
fn kill_group(pgid: Pid) {
    if let Err(e) = killpg(pgid, Signal::SIGKILL) {
        trace!("killpg({}) failed: {}", pgid, e);
    }
}

/// Actually run the guest, but with a return type that supports the `?` operator.
fn run_guest(request: GuestRequest) -> Result<GuestExecution, Error> {
    let plan = request.ceilings.plan();
    let mut command = Command::new(&request.executable);
    command
        .args(&request.args)
        .current_dir(&request.working_directory)
        .env_clear()
        .envs(request.env.iter().map(|(k, v)| (k, v)))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0);
    // SAFETY: installing the ceilings only calls setrlimit, which is async-signal-safe, and
    // doesn't allocate.
    unsafe {
        command.pre_exec(move || {
            plan.install();
            Ok(())
        });
    }
    trace!("Guest command: {:?}", command);

    let start = Instant::now();
    let mut child = command
        .spawn()
        .with_context(|| format!("Cannot spawn {}", request.executable.display()))?;
    let pgid = Pid::from_raw(child.id() as i32);
    // nothing left in the group of the guest survives the run, whatever happens below
    defer! {
        kill_group(pgid);
    }
    let guard = TimeoutGuard::arm(request.wall_time_limit, child.id())?;

    let mut stdin = child
        .stdin
        .take()
        .context("Failed to open the stdin of the guest")?;
    let stdout = child
        .stdout
        .take()
        .context("Failed to open the stdout of the guest")?;
    let stderr = child
        .stderr
        .take()
        .context("Failed to open the stderr of the guest")?;

    let input = request.stdin;
    let (written, writer_done) = bounded::<()>(1);
    // the handle is dropped: a descendant holding the pipe must not block the runner
    std::thread::Builder::new()
        .name("guest stdin".into())
        .spawn(move || {
            // the pipe is closed when `stdin` is dropped, giving EOF to the guest
            match stdin.write_all(&input) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    debug!("The guest closed its stdin before reading all the input");
                }
                Err(e) => warn!("Failed to write the input of the guest: {}", e),
            }
            let _ = written.send(());
        })
        .context("Failed to spawn the stdin writer thread")?;
    let stdout_capture = BoundedCapture::head(request.stdout_limit).spawn(
        "stdout",
        stdout,
        move || {
            info!("The guest exceeded the output limit, killing it");
            kill_group(pgid);
        },
    )?;
    let stderr_capture =
        BoundedCapture::tail(request.stderr_limit).spawn("stderr", stderr, || {})?;

    let status = child.wait().context("Failed to wait for the guest")?;
    let wall_time = start.elapsed();
    let timed_out = guard.disarm();
    // the leader is gone, its leftovers may still keep the pipes open
    kill_group(pgid);

    // a descendant that left the group cannot be killed and can keep the pipes open forever:
    // the streams are waited only until the deadline
    let drain_deadline = start + request.wall_time_limit.max(wall_time) + DRAIN_GRACE;
    if writer_done.recv_deadline(drain_deadline).is_err() {
        debug!("The stdin of the guest is still open, giving up on it");
    }
    let Captured {
        data: stdout,
        overflowed: output_limit_exceeded,
        complete: stdout_complete,
    } = stdout_capture.wait_until(drain_deadline);
    let Captured {
        data: stderr,
        complete: stderr_complete,
        ..
    } = stderr_capture.wait_until(drain_deadline);
    let overran = !stdout_complete || !stderr_complete;
    if overran {
        info!("Some descendant of the guest kept its output open past the deadline");
    }

    // a guest that exited by itself right at the deadline is not a timeout
    let status = if (timed_out && status.code().is_none()) || overran {
        ExitStatus::Killed
    } else if let Some(code) = status.code() {
        ExitStatus::ExitCode(code)
    } else if let Some(signal) = status.signal() {
        ExitStatus::Signal(signal)
    } else {
        return Err(anyhow!("Unknown exit status of the guest: {:?}", status));
    };
    debug!(
        "Guest exited with {:?} after {:?} ({} bytes of stdout, {} bytes of stderr)",
        status,
        wall_time,
        stdout.len(),
        stderr.len()
    );

    Ok(GuestExecution {
        status,
        stdout,
        stderr,
        output_limit_exceeded,
        wall_time,
    })
}
