//! Bounded subprocess execution.
//!
//! `run_cmd_wait` runs a command to completion with a poll-based wait:
//! liveness is checked every [`POLL_INTERVAL`] up to the configured
//! timeout, then an abort signal is sent and the same schedule runs once
//! more. Output collection happens on a dedicated worker thread (see
//! [`collector`]) so the caller never blocks on pipe I/O.

pub mod collector;

use std::io::{self, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use crate::error::{CommandFailure, Error, Result};
use crate::sys;

pub use collector::{abandoned_collector_count, Capture, OutputCollector};

/// Cadence of the liveness polling loop.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default polling budget before the abort signal is sent.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// How long to wait for the collector after the polling schedule ends.
const COLLECT_GRACE: Duration = Duration::from_millis(250);

/// Options for a single [`run_cmd_wait`] invocation.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Bytes to write to the child's stdin before closing it. Stdin is
    /// only piped when this is non-empty; otherwise it is inherited.
    pub input: Option<Vec<u8>>,
    /// Redirect the child's stderr into the stdout pipe at the fd level.
    pub merge_streams: bool,
    /// Replacement environment; `None` inherits the caller's.
    pub env: Option<Vec<(String, String)>>,
    /// Polling budget for each of the two wait schedules.
    pub timeout: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self { input: None, merge_streams: false, env: None, timeout: DEFAULT_TIMEOUT }
    }
}

impl RunOptions {
    /// Sets the stdin bytes.
    #[must_use]
    pub fn input(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.input = Some(bytes.into());
        self
    }

    /// Enables or disables stream merging.
    #[must_use]
    pub fn merge_streams(mut self, merge: bool) -> Self {
        self.merge_streams = merge;
        self
    }

    /// Replaces the child's environment.
    #[must_use]
    pub fn env(mut self, vars: Vec<(String, String)>) -> Self {
        self.env = Some(vars);
        self
    }

    /// Overrides the polling budget.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Result of a completed (or aborted) command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmdOutcome {
    /// Exit code. `Some(-signo)` for signal deaths; `None` when the
    /// child was still alive after both polling schedules.
    pub code: Option<i32>,
    /// Captured stdout, absent if the collector had not delivered.
    pub stdout: Option<Vec<u8>>,
    /// Captured stderr, absent if merged or not delivered.
    pub stderr: Option<Vec<u8>>,
}

/// Polls the child's liveness every [`POLL_INTERVAL`] for up to `timeout`.
///
/// Returns the exit status as soon as it is available, or `None` when the
/// schedule elapses first. Purely observational: no signal is sent.
///
/// # Errors
///
/// Propagates OS errors from the underlying status check.
pub fn wait_process(child: &mut Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let tries = (timeout.as_millis() / POLL_INTERVAL.as_millis()).max(1);
    for _ in 0..tries {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        thread::sleep(POLL_INTERVAL);
    }
    Ok(None)
}

/// Runs `cmd` to completion and fails on a non-zero exit.
///
/// The first element of `cmd` is the executable. The child is given
/// `opts.timeout` to exit; if it is still alive an abort signal is sent
/// and the identical schedule runs once more. Output is then retrieved
/// from the collector with a bounded join, so a stream reads as absent
/// only when the collector genuinely never delivered.
///
/// # Errors
///
/// - [`Error::Spawn`] when the process cannot be started.
/// - [`Error::CommandFailed`] when the exit code is non-zero or the child
///   outlived both polling schedules (`code: None`).
pub fn run_cmd_wait<S: AsRef<str>>(cmd: &[S], opts: &RunOptions) -> Result<CmdOutcome> {
    let argv: Vec<String> = cmd.iter().map(|s| s.as_ref().to_owned()).collect();
    let Some((program, args)) = argv.split_first() else {
        return Err(Error::Spawn {
            cmd: String::new(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "empty argument vector"),
        });
    };

    let mut command = Command::new(program);
    command.args(args);
    if let Some(vars) = &opts.env {
        command.env_clear().envs(vars.iter().map(|(k, v)| (k, v)));
    }

    let pipe_stdin = opts.input.as_ref().is_some_and(|bytes| !bytes.is_empty());
    if pipe_stdin {
        command.stdin(Stdio::piped());
    }

    let merged_reader = if opts.merge_streams {
        let (reader, stdout, stderr) = sys::merged_output_pipe()?;
        command.stdout(stdout).stderr(stderr);
        Some(reader)
    } else {
        command.stdout(Stdio::piped()).stderr(Stdio::piped());
        None
    };

    log::debug!("spawning `{}`", argv.join(" "));
    let mut child = command
        .spawn()
        .map_err(|source| Error::Spawn { cmd: argv.join(" "), source })?;
    // The Command keeps the parent-side copies of any raw pipe fds; they
    // must close now or the collector never sees EOF on the merged pipe.
    drop(command);

    let stdin = if pipe_stdin {
        child.stdin.take().map(|sink| {
            let bytes = opts.input.clone().unwrap_or_default();
            (Box::new(sink) as Box<dyn Write + Send>, bytes)
        })
    } else {
        None
    };
    let stdout_reader: Box<dyn Read + Send> = match merged_reader {
        Some(file) => Box::new(file),
        None => {
            let Some(out) = child.stdout.take() else {
                return Err(io::Error::new(io::ErrorKind::Other, "child stdout not captured").into());
            };
            Box::new(out)
        }
    };
    let stderr_reader =
        child.stderr.take().map(|err| Box::new(err) as Box<dyn Read + Send>);

    let collector = OutputCollector::spawn(stdin, stdout_reader, stderr_reader);

    let mut status = wait_process(&mut child, opts.timeout)?;
    if status.is_none() {
        log::debug!("`{program}` still alive after {:?}; sending abort", opts.timeout);
        if let Err(err) = sys::send_abort(&mut child) {
            log::debug!("abort delivery failed: {err}");
        }
        status = wait_process(&mut child, opts.timeout)?;
    }

    let capture = collector.join_timeout(COLLECT_GRACE);
    let outcome =
        CmdOutcome { code: status.map(exit_code), stdout: capture.stdout, stderr: capture.stderr };

    if outcome.code == Some(0) {
        Ok(outcome)
    } else {
        Err(CommandFailure {
            cmd: argv,
            code: outcome.code,
            stdout: outcome.stdout,
            stderr: outcome.stderr,
        }
        .into())
    }
}

/// Like [`run_cmd_wait`], but a non-zero exit is returned as a plain
/// outcome instead of an error. Spawn and OS failures still propagate.
///
/// # Errors
///
/// Returns [`Error::Spawn`] or I/O errors; never [`Error::CommandFailed`].
pub fn run_cmd_wait_nofail<S: AsRef<str>>(cmd: &[S], opts: &RunOptions) -> Result<CmdOutcome> {
    match run_cmd_wait(cmd, opts) {
        Err(Error::CommandFailed(failure)) => Ok(CmdOutcome {
            code: failure.code,
            stdout: failure.stdout,
            stderr: failure.stderr,
        }),
        other => other,
    }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status.code().or_else(|| status.signal().map(|sig| -sig)).unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

#[cfg(test)]
mod tests {
    use super::{run_cmd_wait, run_cmd_wait_nofail, wait_process, Error, RunOptions};
    use std::process::Command;
    use std::time::Duration;

    #[test]
    fn zero_exit_returns_code_and_output() {
        let outcome = run_cmd_wait(&["echo", "hello"], &RunOptions::default()).unwrap();
        assert_eq!(outcome.code, Some(0));
        assert_eq!(outcome.stdout.as_deref(), Some(b"hello\n".as_slice()));
        assert_eq!(outcome.stderr.as_deref(), Some(b"".as_slice()));
    }

    #[test]
    fn non_zero_exit_fails_with_matching_code() {
        let err = run_cmd_wait(&["sh", "-c", "exit 3"], &RunOptions::default()).unwrap_err();
        match err {
            Error::CommandFailed(failure) => {
                assert_eq!(failure.code, Some(3));
                assert_eq!(failure.cmd, vec!["sh", "-c", "exit 3"]);
            }
            other => panic!("expected CommandFailed, got {other}"),
        }
    }

    #[test]
    fn nofail_variant_returns_the_failure_outcome() {
        let outcome = run_cmd_wait_nofail(&["sh", "-c", "exit 3"], &RunOptions::default()).unwrap();
        assert_eq!(outcome.code, Some(3));
    }

    #[test]
    fn nofail_variant_still_propagates_spawn_errors() {
        let result =
            run_cmd_wait_nofail(&["testrig-no-such-binary-xyz"], &RunOptions::default());
        assert!(matches!(result, Err(Error::Spawn { .. })));
    }

    #[test]
    fn empty_argument_vector_is_rejected() {
        let empty: &[&str] = &[];
        assert!(matches!(
            run_cmd_wait(empty, &RunOptions::default()),
            Err(Error::Spawn { .. })
        ));
    }

    #[test]
    fn input_is_piped_to_stdin_and_closed() {
        let opts = RunOptions::default().input(b"line one\nline two\n".to_vec());
        let outcome = run_cmd_wait(&["cat"], &opts).unwrap();
        assert_eq!(outcome.code, Some(0));
        assert_eq!(outcome.stdout.as_deref(), Some(b"line one\nline two\n".as_slice()));
    }

    #[test]
    fn replacement_environment_is_applied() {
        let opts = RunOptions::default()
            .env(vec![("TESTRIG_MARK".to_owned(), "42".to_owned())]);
        let outcome = run_cmd_wait(&["/bin/sh", "-c", "echo $TESTRIG_MARK"], &opts).unwrap();
        assert_eq!(outcome.stdout.as_deref(), Some(b"42\n".as_slice()));
    }

    #[cfg(unix)]
    #[test]
    fn merged_streams_share_one_pipe() {
        let opts = RunOptions::default().merge_streams(true);
        let outcome =
            run_cmd_wait(&["sh", "-c", "echo out; echo err 1>&2"], &opts).unwrap();
        let merged = outcome.stdout.expect("merged stream captured");
        let text = String::from_utf8_lossy(&merged);
        assert!(text.contains("out"));
        assert!(text.contains("err"));
        assert_eq!(outcome.stderr, None);
    }

    #[test]
    fn wait_process_observes_a_quick_exit() {
        let mut child = Command::new("true").spawn().unwrap();
        let status = wait_process(&mut child, Duration::from_secs(1)).unwrap();
        assert_eq!(status.map(|s| s.success()), Some(true));
    }

    #[test]
    fn wait_process_gives_up_without_signalling() {
        let mut child = Command::new("sleep").arg("5").spawn().unwrap();
        let status = wait_process(&mut child, Duration::from_millis(300)).unwrap();
        assert!(status.is_none());
        child.kill().unwrap();
        child.wait().unwrap();
    }
}
