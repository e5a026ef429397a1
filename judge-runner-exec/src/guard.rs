//! Wall-clock deadline for the guest.
//!
//! The CPU ceiling doesn't stop a guest that sleeps or blocks on I/O, the guard does: when the
//! deadline expires the whole process group of the guest is killed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{Context, Error};
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;

/// Default wall-clock deadline of a run.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(10);

/// An armed deadline on a process group.
///
/// Dropping the guard disarms it.
#[derive(Debug)]
pub struct TimeoutGuard {
    /// Cancels the timer when dropped or when a message is sent.
    cancel: Option<Sender<()>>,
    /// The timer thread.
    timer: Option<JoinHandle<()>>,
    /// Whether the deadline expired before the guard was disarmed.
    fired: Arc<AtomicBool>,
}

impl TimeoutGuard {
    /// Start the timer: after `deadline` the process group `pgid` receives `SIGKILL`.
    pub fn arm(deadline: Duration, pgid: u32) -> Result<TimeoutGuard, Error> {
        let (cancel, cancelled) = bounded::<()>(1);
        let fired = Arc::new(AtomicBool::new(false));
        let timer_fired = fired.clone();
        let pgid = Pid::from_raw(pgid as i32);
        let timer = std::thread::Builder::new()
            .name("timeout guard".into())
            .spawn(move || match cancelled.recv_timeout(deadline) {
                Err(RecvTimeoutError::Timeout) => {
                    timer_fired.store(true, Ordering::SeqCst);
                    info!("Deadline of {:?} expired, killing group {}", deadline, pgid);
                    if let Err(e) = killpg(pgid, Signal::SIGKILL) {
                        warn!("Failed to kill process group {}: {}", pgid, e);
                    }
                }
                // either disarmed or the guard was dropped
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
            })
            .context("Failed to spawn the timeout guard thread")?;
        trace!("Timeout guard armed: {:?} on group {}", deadline, pgid);
        Ok(TimeoutGuard {
            cancel: Some(cancel),
            timer: Some(timer),
            fired,
        })
    }

    /// Stop the timer, returning whether the deadline expired before this call.
    pub fn disarm(mut self) -> bool {
        self.stop();
        self.fired.load(Ordering::SeqCst)
    }

    /// Whether the deadline has already expired.
    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.try_send(());
        }
        if let Some(timer) = self.timer.take() {
            if timer.join().is_err() {
                warn!("The timeout guard thread panicked");
            }
        }
    }
}

impl Drop for TimeoutGuard {
    fn drop(&mut self) {
        self.stop();
    }
}
