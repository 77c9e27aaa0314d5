//! Command dispatch and handlers.

pub mod port;
pub mod run;
pub mod which;

use crate::cli::Command;

/// Dispatch a parsed command to its handler.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub fn dispatch(command: &Command) -> Result<(), String> {
    match command {
        Command::Run { timeout_ms, merge, stdin, json, cmd } => {
            run::run(cmd, *timeout_ms, *merge, stdin.as_deref(), *json)
        }
        Command::Port { addr, start, count } => port::run(addr, *start, *count),
        Command::Which { name } => which::run(name),
    }
}
