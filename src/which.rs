//! Executable lookup on the search path.
//!
//! Thin wrappers over the `which` crate, narrowed to the option-returning
//! shape the harness helpers use.

use std::env;
use std::ffi::OsStr;
use std::path::PathBuf;

/// Resolves `cmd` against `$PATH`.
///
/// Returns the first entry holding an executable, non-directory file by
/// that name, or `None` when nothing matches.
#[must_use]
pub fn which(cmd: &str) -> Option<PathBuf> {
    ::which::which(cmd).ok()
}

/// Resolves `cmd` against an explicit search path.
///
/// `path` is a platform-format search string (colon-separated on Unix);
/// `None` falls back to `$PATH`. A `cmd` containing a directory component
/// (including relative forms like `./script`) is checked directly against
/// the current directory instead of searched.
#[must_use]
pub fn which_in(cmd: &str, path: Option<&OsStr>) -> Option<PathBuf> {
    let search = match path {
        Some(explicit) => Some(explicit.to_os_string()),
        None => env::var_os("PATH"),
    };
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    ::which::which_in(cmd, search, cwd).ok()
}
