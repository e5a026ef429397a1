//! Bounded capture of the standard streams of the guest.

use std::io::{ErrorKind, Read};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use anyhow::{Context, Error};
use crossbeam_channel::{bounded, Receiver};

/// Which part of an oversized stream to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keep {
    /// Keep the first bytes, drop the rest.
    Head,
    /// Keep the last bytes, the first ones are dropped.
    Tail,
}

/// The bytes read from a stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captured {
    /// At most `limit` bytes of the stream.
    pub data: Vec<u8>,
    /// Whether the stream was longer than the limit.
    pub overflowed: bool,
    /// Whether the stream has been read until its end.
    pub complete: bool,
}

/// Reads a stream until EOF keeping at most `limit` bytes of it.
#[derive(Debug, Clone, Copy)]
pub struct BoundedCapture {
    /// Maximum number of bytes kept.
    pub limit: usize,
    /// Which part of the stream is kept.
    pub keep: Keep,
}

/// A capture running in its own thread. The bytes read so far are available even if the stream
/// never ends.
#[derive(Debug)]
pub struct PendingCapture {
    capture: BoundedCapture,
    state: Arc<Mutex<Captured>>,
    done: Receiver<()>,
}

fn lock(state: &Mutex<Captured>) -> MutexGuard<'_, Captured> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl BoundedCapture {
    /// Keep the first `limit` bytes.
    pub fn head(limit: usize) -> BoundedCapture {
        BoundedCapture {
            limit,
            keep: Keep::Head,
        }
    }

    /// Keep the last `limit` bytes.
    pub fn tail(limit: usize) -> BoundedCapture {
        BoundedCapture {
            limit,
            keep: Keep::Tail,
        }
    }

    /// Read the whole stream in the current thread. `on_overflow` is called once, as soon as the
    /// limit is exceeded; the stream is drained anyway so the writer never blocks on it.
    pub fn read<R: Read, F: FnOnce()>(&self, reader: R, on_overflow: F) -> Captured {
        let state = Mutex::new(Captured::default());
        self.read_into(reader, on_overflow, &state);
        let mut captured = state.into_inner().unwrap_or_else(PoisonError::into_inner);
        self.trim(&mut captured);
        captured
    }

    /// Like [`BoundedCapture::read`] but in a new thread.
    pub fn spawn<R, F>(
        self,
        name: &str,
        reader: R,
        on_overflow: F,
    ) -> Result<PendingCapture, Error>
    where
        R: Read + Send + 'static,
        F: FnOnce() + Send + 'static,
    {
        let state = Arc::new(Mutex::new(Captured::default()));
        let (done_sender, done) = bounded(1);
        let thread_state = state.clone();
        // the handle is dropped: a stream kept open forever must not block the runner
        std::thread::Builder::new()
            .name(format!("capture {}", name))
            .spawn(move || {
                self.read_into(reader, on_overflow, &thread_state);
                let _ = done_sender.send(());
            })
            .with_context(|| format!("Failed to spawn the capture thread of {}", name))?;
        Ok(PendingCapture {
            capture: self,
            state,
            done,
        })
    }

    /// Drain `reader` into `state`, one chunk at a time.
    fn read_into<R: Read, F: FnOnce()>(
        &self,
        mut reader: R,
        on_overflow: F,
        state: &Mutex<Captured>,
    ) {
        let mut on_overflow = Some(on_overflow);
        let mut buf = [0u8; 8192];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("Failed to read the stream: {}", e);
                    break;
                }
            };
            let overflowed = {
                let mut captured = lock(state);
                self.push(&mut captured, &buf[..n]);
                captured.overflowed
            };
            if overflowed {
                if let Some(f) = on_overflow.take() {
                    f();
                }
            }
        }
        lock(state).complete = true;
    }

    fn push(&self, captured: &mut Captured, chunk: &[u8]) {
        match self.keep {
            Keep::Head => {
                let room = self.limit.saturating_sub(captured.data.len());
                captured.data.extend_from_slice(&chunk[..chunk.len().min(room)]);
                if chunk.len() > room {
                    captured.overflowed = true;
                }
            }
            Keep::Tail => {
                captured.data.extend_from_slice(chunk);
                if captured.data.len() > self.limit {
                    captured.overflowed = true;
                    // amortize the shifting of the buffer
                    if captured.data.len() > 2 * self.limit.max(8192) {
                        let excess = captured.data.len() - self.limit;
                        captured.data.drain(..excess);
                    }
                }
            }
        }
    }

    fn trim(&self, captured: &mut Captured) {
        if captured.data.len() > self.limit {
            let excess = captured.data.len() - self.limit;
            captured.data.drain(..excess);
        }
    }
}

impl PendingCapture {
    /// Wait for the end of the stream, but not after `deadline`. What has been read so far is
    /// returned anyway, with `complete` telling whether the stream actually ended.
    pub fn wait_until(self, deadline: Instant) -> Captured {
        if self.done.recv_deadline(deadline).is_err() {
            debug!("The stream is still open at the deadline, giving up on it");
        }
        let mut captured = lock(&self.state).clone();
        self.capture.trim(&mut captured);
        captured
    }
}
