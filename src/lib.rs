//! Support utilities for integration test harnesses.
//!
//! Three narrow helpers over OS facilities:
//!
//! *   [`process`] — run a subprocess to completion with a bounded,
//!     poll-based wait and an abort signal on timeout; output is drained
//!     by a background collector so the caller never deadlocks on full
//!     pipe buffers.
//! *   [`port`] — probe TCP ports and allocate unused ones with an
//!     instance-scoped tracking registry.
//! *   [`which`] — locate an executable on the search path.
//!
//! The `testrig` binary exposes the same helpers as subcommands.

pub mod cli;
pub mod commands;
pub mod error;
pub mod port;
pub mod process;
mod sys;
pub mod which;

pub use error::{CommandFailure, Error};
pub use port::{port_used, PortAllocator};
pub use process::{
    abandoned_collector_count, run_cmd_wait, run_cmd_wait_nofail, wait_process, CmdOutcome,
    RunOptions,
};
pub use which::{which, which_in};

use clap::Parser;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command
/// execution fails.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = cli::Cli::try_parse_from(args).map_err(|err| err.to_string())?;
    commands::dispatch(&cli.command)
}
