//! CLI argument definitions.

use clap::{Parser, Subcommand};

/// Top-level CLI parser for `testrig`.
#[derive(Debug, Parser)]
#[command(name = "testrig", version, about = "Subprocess, port, and PATH helpers for test harnesses")]
pub struct Cli {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a command under the bounded process runner.
    Run {
        /// Polling budget in milliseconds before the abort signal is sent.
        #[arg(long, default_value_t = 1000)]
        timeout_ms: u64,
        /// Redirect the child's stderr into its stdout stream.
        #[arg(long)]
        merge: bool,
        /// Text to write to the child's stdin before closing it.
        #[arg(long)]
        stdin: Option<String>,
        /// Print a JSON report instead of the raw captured output.
        #[arg(long)]
        json: bool,
        /// The command and its arguments.
        #[arg(trailing_var_arg = true, required = true)]
        cmd: Vec<String>,
    },
    /// Allocate unused TCP ports.
    Port {
        /// Address to probe.
        #[arg(long, default_value = crate::port::DEFAULT_ADDR)]
        addr: String,
        /// First port to try.
        #[arg(long, default_value_t = crate::port::DEFAULT_START_PORT)]
        start: u16,
        /// How many distinct ports to allocate.
        #[arg(long, default_value_t = 1)]
        count: u16,
    },
    /// Locate an executable on the search path.
    Which {
        /// Command name to resolve.
        name: String,
    },
}
