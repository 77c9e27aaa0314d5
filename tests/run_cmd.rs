//! Integration tests for the bounded process runner's timeout behavior.

use std::time::{Duration, Instant};

use testrig::{abandoned_collector_count, run_cmd_wait, run_cmd_wait_nofail, Error, RunOptions};

#[cfg(unix)]
#[test]
fn sleeping_child_is_aborted_after_the_timeout() {
    let opts = RunOptions::default().timeout(Duration::from_millis(300));
    let err = run_cmd_wait(&["sh", "-c", "sleep 5"], &opts).unwrap_err();
    match err {
        Error::CommandFailed(failure) => {
            assert_eq!(failure.code, Some(-libc::SIGABRT));
        }
        other => panic!("expected CommandFailed, got {other}"),
    }
}

#[cfg(unix)]
#[test]
fn child_ignoring_the_abort_signal_still_returns_in_bounded_time() {
    let before = abandoned_collector_count();
    let opts = RunOptions::default().timeout(Duration::from_millis(300));
    let start = Instant::now();
    let outcome =
        run_cmd_wait_nofail(&["sh", "-c", "trap '' ABRT; sleep 5"], &opts).unwrap();
    let elapsed = start.elapsed();

    // Two 300 ms schedules plus the collector grace; nowhere near the
    // child's 5 s sleep.
    assert!(elapsed >= Duration::from_millis(600));
    assert!(elapsed < Duration::from_secs(4));

    // No exit was observed and the collector never delivered.
    assert_eq!(outcome.code, None);
    assert_eq!(outcome.stdout, None);
    assert_eq!(outcome.stderr, None);
    assert!(abandoned_collector_count() > before);
}

#[test]
fn output_larger_than_a_pipe_buffer_does_not_deadlock() {
    let outcome =
        run_cmd_wait(&["sh", "-c", "head -c 200000 /dev/zero"], &RunOptions::default()).unwrap();
    assert_eq!(outcome.code, Some(0));
    assert_eq!(outcome.stdout.map(|b| b.len()), Some(200_000));
}

#[test]
fn stderr_is_captured_separately_by_default() {
    let err = run_cmd_wait(&["sh", "-c", "echo oops >&2; exit 2"], &RunOptions::default())
        .unwrap_err();
    match err {
        Error::CommandFailed(failure) => {
            assert_eq!(failure.code, Some(2));
            assert_eq!(failure.stderr.as_deref(), Some(b"oops\n".as_slice()));
            assert_eq!(failure.stdout.as_deref(), Some(b"".as_slice()));
        }
        other => panic!("expected CommandFailed, got {other}"),
    }
}

#[test]
fn nofail_matches_the_failing_variant_on_success() {
    let opts = RunOptions::default();
    let strict = run_cmd_wait(&["echo", "same"], &opts).unwrap();
    let lax = run_cmd_wait_nofail(&["echo", "same"], &opts).unwrap();
    assert_eq!(strict, lax);
}
