//! `testrig which` command.

use crate::which::which;

/// Execute the `which` command.
///
/// Prints the resolved absolute path of `name`.
///
/// # Errors
///
/// Returns an error string when the name does not resolve.
pub fn run(name: &str) -> Result<(), String> {
    match which(name) {
        Some(path) => {
            println!("{}", path.display());
            Ok(())
        }
        None => Err(format!("{name}: not found on the search path")),
    }
}
