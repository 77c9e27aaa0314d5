//! Background output collector for spawned processes.
//!
//! Reading a child's output from a separate thread is what prevents the
//! classic pipe deadlock: the parent blocks writing input while the child
//! blocks writing to a full output buffer, and neither side drains the
//! other. The collector owns all pipe I/O; the calling thread only polls
//! process liveness.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

static ABANDONED: AtomicUsize = AtomicUsize::new(0);

/// Number of collector threads abandoned since process start.
///
/// A collector is abandoned when the child survived the abort signal with
/// its output pipe still open, so the blocking read can never finish.
/// Exposed so tests can count leaks instead of guessing at them.
#[must_use]
pub fn abandoned_collector_count() -> usize {
    ABANDONED.load(Ordering::Relaxed)
}

/// Streams delivered by a collector.
///
/// `None` means the stream was not piped, or the collector had not
/// delivered by the join deadline.
#[derive(Debug, Default)]
pub struct Capture {
    /// Captured stdout bytes.
    pub stdout: Option<Vec<u8>>,
    /// Captured stderr bytes.
    pub stderr: Option<Vec<u8>>,
}

/// Handle to the single background worker serving one `run_cmd_wait` call.
///
/// The worker writes the input bytes to the child's stdin, closes it, then
/// reads stdout and stderr to EOF and hands the captures back over a
/// channel. A cancellation token is checked between those stages so an
/// abandoned worker stops as early as the blocking reads permit.
pub struct OutputCollector {
    handle: JoinHandle<()>,
    rx: Receiver<Capture>,
    cancel: Arc<AtomicBool>,
}

impl OutputCollector {
    /// Starts the worker thread.
    ///
    /// `stdin` pairs the child's input sink with the bytes to write; the
    /// sink is dropped (closing the pipe) as soon as the write finishes.
    pub fn spawn(
        stdin: Option<(Box<dyn Write + Send>, Vec<u8>)>,
        stdout: Box<dyn Read + Send>,
        stderr: Option<Box<dyn Read + Send>>,
    ) -> Self {
        let cancel = Arc::new(AtomicBool::new(false));
        let token = Arc::clone(&cancel);
        let (tx, rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            if let Some((mut sink, bytes)) = stdin {
                // A write error here means the child closed its stdin
                // early; the output is still worth collecting.
                if let Err(err) = sink.write_all(&bytes) {
                    log::debug!("stdin write failed: {err}");
                }
            }
            if token.load(Ordering::Relaxed) {
                return;
            }

            let mut out = Vec::new();
            let mut reader = stdout;
            if let Err(err) = reader.read_to_end(&mut out) {
                log::debug!("stdout read failed: {err}");
            }
            if token.load(Ordering::Relaxed) {
                return;
            }

            let err_bytes = stderr.map(|mut reader| {
                let mut buf = Vec::new();
                if let Err(err) = reader.read_to_end(&mut buf) {
                    log::debug!("stderr read failed: {err}");
                }
                buf
            });

            let _ = tx.send(Capture { stdout: Some(out), stderr: err_bytes });
        });

        Self { handle, rx, cancel }
    }

    /// Waits up to `deadline` for the worker to deliver, then joins it.
    ///
    /// If the worker misses the deadline it is cancelled and abandoned;
    /// the leak is logged and counted. Both streams read as absent in
    /// that case.
    #[must_use]
    pub fn join_timeout(self, deadline: Duration) -> Capture {
        match self.rx.recv_timeout(deadline) {
            Ok(capture) => {
                let _ = self.handle.join();
                capture
            }
            Err(RecvTimeoutError::Disconnected) => {
                // Worker bailed out via the cancel token without sending.
                let _ = self.handle.join();
                Capture::default()
            }
            Err(RecvTimeoutError::Timeout) => {
                self.cancel.store(true, Ordering::Relaxed);
                ABANDONED.fetch_add(1, Ordering::Relaxed);
                log::warn!("output collector still blocked after {deadline:?}; abandoning thread");
                Capture::default()
            }
        }
    }
}
