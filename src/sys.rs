//! Platform plumbing: abort-signal delivery and merged output pipes.
//!
//! The only unsafe code in the crate lives in this module.
#![allow(unsafe_code)]

use std::fs::File;
use std::io;
use std::process::{Child, Stdio};

/// Sends SIGABRT to the child.
///
/// SIGABRT is weaker than a forced kill: the child gets a chance to run
/// cleanup handlers or dump core before dying.
///
/// # Errors
///
/// Returns the OS error when the signal cannot be delivered (e.g. the
/// process is already gone).
#[cfg(unix)]
pub fn send_abort(child: &mut Child) -> io::Result<()> {
    let pid = child.id() as libc::pid_t;
    let ret = unsafe { libc::kill(pid, libc::SIGABRT) };
    if ret == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Fallback termination request for platforms without POSIX signals.
///
/// # Errors
///
/// Returns the OS error when the kill request fails.
#[cfg(not(unix))]
pub fn send_abort(child: &mut Child) -> io::Result<()> {
    child.kill()
}

/// Builds a pipe whose write end is shared between the child's stdout and
/// stderr, giving a true fd-level merge of the two streams.
///
/// Returns the parent's read end plus the two `Stdio` handles to install
/// on the `Command`. Ownership of all three descriptors transfers to the
/// returned values.
///
/// # Errors
///
/// Returns the OS error when the pipe cannot be created or duplicated.
#[cfg(unix)]
pub fn merged_output_pipe() -> io::Result<(File, Stdio, Stdio)> {
    let (reader, stdout, stderr) = merged_pipe_fds()?;
    Ok((File::from(reader), Stdio::from(stdout), Stdio::from(stderr)))
}

/// Stream merging relies on fd duplication and is Unix-only.
///
/// # Errors
///
/// Always fails on non-Unix platforms.
#[cfg(not(unix))]
pub fn merged_output_pipe() -> io::Result<(File, Stdio, Stdio)> {
    Err(io::Error::new(io::ErrorKind::Unsupported, "stream merging requires Unix pipes"))
}

// Every descriptor is close-on-exec from the moment it exists: a spawn on
// another thread between pipe creation and our own exec would otherwise
// inherit the write end, and the collector would never see EOF. The
// intended child is unaffected since dup2 onto fds 1/2 clears the flag.
#[cfg(unix)]
fn merged_pipe_fds() -> io::Result<(std::os::fd::OwnedFd, std::os::fd::OwnedFd, std::os::fd::OwnedFd)> {
    use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

    let mut fds = [0 as libc::c_int; 2];
    if unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) } != 0 {
        return Err(io::Error::last_os_error());
    }
    let reader = unsafe { OwnedFd::from_raw_fd(fds[0]) };
    let writer = unsafe { OwnedFd::from_raw_fd(fds[1]) };

    let stderr_fd = unsafe { libc::fcntl(writer.as_raw_fd(), libc::F_DUPFD_CLOEXEC, 0) };
    if stderr_fd < 0 {
        return Err(io::Error::last_os_error());
    }
    let stderr = unsafe { OwnedFd::from_raw_fd(stderr_fd) };

    Ok((reader, writer, stderr))
}
