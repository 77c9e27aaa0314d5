//! Binary entrypoint for the `testrig` CLI.

use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();
    match testrig::run(std::env::args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
