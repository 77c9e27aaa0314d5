//! `testrig run` command.

use std::io::Write;
use std::time::Duration;

use serde::Serialize;

use crate::error::Error;
use crate::process::{run_cmd_wait, RunOptions};

/// JSON report printed with `--json`.
#[derive(Serialize)]
struct RunReport<'a> {
    cmd: &'a [String],
    code: Option<i32>,
    stdout: Option<String>,
    stderr: Option<String>,
}

/// Execute the `run` command.
///
/// Runs the trailing command under the bounded runner and prints its
/// captured output. With `--json` a structured report goes to stdout and
/// the exit status is always zero; otherwise the child's streams are
/// relayed and a non-zero child fails the command.
///
/// # Errors
///
/// Returns an error string when the child cannot be spawned or (in raw
/// mode) exits non-zero.
pub fn run(
    cmd: &[String],
    timeout_ms: u64,
    merge: bool,
    stdin: Option<&str>,
    json: bool,
) -> Result<(), String> {
    let mut opts = RunOptions::default()
        .merge_streams(merge)
        .timeout(Duration::from_millis(timeout_ms));
    if let Some(text) = stdin {
        opts = opts.input(text.as_bytes().to_vec());
    }

    let (failure, outcome) = match run_cmd_wait(cmd, &opts) {
        Ok(outcome) => (None, outcome),
        Err(Error::CommandFailed(failure)) => {
            let outcome = crate::process::CmdOutcome {
                code: failure.code,
                stdout: failure.stdout.clone(),
                stderr: failure.stderr.clone(),
            };
            (Some(failure), outcome)
        }
        Err(err) => return Err(err.to_string()),
    };

    if json {
        let report = RunReport {
            cmd,
            code: outcome.code,
            stdout: outcome.stdout.map(|b| String::from_utf8_lossy(&b).into_owned()),
            stderr: outcome.stderr.map(|b| String::from_utf8_lossy(&b).into_owned()),
        };
        let rendered = serde_json::to_string_pretty(&report)
            .map_err(|e| format!("Failed to render report: {e}"))?;
        println!("{rendered}");
        return Ok(());
    }

    if let Some(bytes) = &outcome.stdout {
        std::io::stdout()
            .write_all(bytes)
            .map_err(|e| format!("Failed to relay stdout: {e}"))?;
    }
    if let Some(bytes) = &outcome.stderr {
        std::io::stderr()
            .write_all(bytes)
            .map_err(|e| format!("Failed to relay stderr: {e}"))?;
    }

    match failure {
        Some(failure) => Err(failure.to_string()),
        None => Ok(()),
    }
}
