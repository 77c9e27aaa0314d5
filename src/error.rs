//! Error types shared across the crate.

use std::io;

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the process, port, and lookup helpers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The child process could not be spawned.
    #[error("failed to spawn `{cmd}`: {source}")]
    Spawn {
        /// The command line that failed to start.
        cmd: String,
        /// The underlying OS error.
        source: io::Error,
    },

    /// The child process ran but exited unsuccessfully.
    #[error(transparent)]
    CommandFailed(#[from] CommandFailure),

    /// Every port in the scanned range was occupied or already tracked.
    #[error("no available port on {addr} in the range {start}-{end}")]
    NoFreePort {
        /// Address the scan probed.
        addr: String,
        /// First port probed.
        start: u16,
        /// Upper bound of the scan (exclusive).
        end: u16,
    },

    /// An I/O error outside the spawn path.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Record of a command that exited non-zero (or never exited).
///
/// Carries enough context to diagnose the failure without re-running:
/// the command line, the observed exit code, and whatever output the
/// collector delivered. `code` is `None` when the child was still alive
/// after the full polling budget, including the post-abort schedule.
#[derive(Debug)]
pub struct CommandFailure {
    /// The argument vector that was executed.
    pub cmd: Vec<String>,
    /// Exit code; negative values are `-signo` for signal deaths.
    pub code: Option<i32>,
    /// Captured stdout, absent if the collector had not delivered.
    pub stdout: Option<Vec<u8>>,
    /// Captured stderr, absent if merged or not delivered.
    pub stderr: Option<Vec<u8>>,
}

impl std::error::Error for CommandFailure {}

impl std::fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "command `{}` ", self.cmd.join(" "))?;
        match self.code {
            Some(code) => write!(f, "exited with code {code}")?,
            None => write!(f, "did not exit within the polling budget")?,
        }
        if let Some(err) = &self.stderr {
            if !err.is_empty() {
                write!(f, "; stderr: {}", String::from_utf8_lossy(err).trim_end())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::CommandFailure;

    #[test]
    fn failure_display_includes_command_and_code() {
        let failure = CommandFailure {
            cmd: vec!["false".into(), "--flag".into()],
            code: Some(1),
            stdout: None,
            stderr: Some(b"boom\n".to_vec()),
        };
        let text = failure.to_string();
        assert!(text.contains("false --flag"));
        assert!(text.contains("code 1"));
        assert!(text.contains("boom"));
    }

    #[test]
    fn failure_display_reports_missing_exit() {
        let failure =
            CommandFailure { cmd: vec!["sleep".into()], code: None, stdout: None, stderr: None };
        assert!(failure.to_string().contains("did not exit"));
    }
}
