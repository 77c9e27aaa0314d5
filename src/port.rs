//! TCP port probing and allocation for test fixtures.
//!
//! The allocator keeps its tracking set as instance state instead of a
//! process-global, so each fixture can own its own registry and tests
//! stay isolated from one another.

use std::collections::HashSet;
use std::net::TcpStream;

use crate::error::{Error, Result};

/// Default probe address.
pub const DEFAULT_ADDR: &str = "localhost";

/// Default first port to probe, high enough to dodge well-known services.
pub const DEFAULT_START_PORT: u16 = 53589;

/// Upper bound of the scan (exclusive).
const MAX_PORT: u16 = 65535;

/// Returns true when something accepts TCP connections on `addr:port`.
#[must_use]
pub fn port_used(addr: &str, port: u16) -> bool {
    TcpStream::connect((addr, port)).is_ok()
}

/// Hands out unused ports and remembers which ones it already gave away.
///
/// Tracking covers ports that were assigned but not yet bound, which a
/// connection probe alone cannot see. The registry is plain instance
/// state; callers sharing one allocator across threads must add their own
/// synchronization.
#[derive(Debug, Clone)]
pub struct PortAllocator {
    addr: String,
    start: u16,
    used: HashSet<u16>,
}

impl Default for PortAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_ADDR, DEFAULT_START_PORT)
    }
}

impl PortAllocator {
    /// Creates an allocator scanning from `start` on `addr`.
    #[must_use]
    pub fn new(addr: impl Into<String>, start: u16) -> Self {
        Self { addr: addr.into(), start, used: HashSet::new() }
    }

    /// Finds the first unused, untracked port and records it.
    ///
    /// # Errors
    ///
    /// [`Error::NoFreePort`] when every port in `start..65535` is either
    /// accepting connections or already tracked.
    pub fn find_unused(&mut self) -> Result<u16> {
        let port = self.scan(true)?;
        self.used.insert(port);
        log::debug!("allocated port {port} on {}", self.addr);
        Ok(port)
    }

    /// Finds the first unused port without recording it.
    ///
    /// Detection then relies entirely on the connection probe, which can
    /// hand out the same port twice if the first caller has not bound it
    /// yet.
    ///
    /// # Errors
    ///
    /// [`Error::NoFreePort`] when the whole range is occupied.
    pub fn find_unused_untracked(&self) -> Result<u16> {
        self.scan(false)
    }

    /// Forgets a tracked port; releasing an untracked port is a no-op.
    pub fn release(&mut self, port: u16) {
        self.used.remove(&port);
    }

    /// Returns true when the port is recorded in the registry.
    #[must_use]
    pub fn is_tracked(&self, port: u16) -> bool {
        self.used.contains(&port)
    }

    fn scan(&self, respect_tracked: bool) -> Result<u16> {
        for port in self.start..MAX_PORT {
            if respect_tracked && self.used.contains(&port) {
                continue;
            }
            if !port_used(&self.addr, port) {
                return Ok(port);
            }
        }
        Err(Error::NoFreePort { addr: self.addr.clone(), start: self.start, end: MAX_PORT })
    }
}

#[cfg(test)]
mod tests {
    use super::{port_used, PortAllocator, DEFAULT_START_PORT};
    use serial_test::serial;
    use std::net::TcpListener;

    fn allocator() -> PortAllocator {
        PortAllocator::new("127.0.0.1", DEFAULT_START_PORT)
    }

    #[test_log::test]
    #[serial]
    fn consecutive_allocations_are_distinct() {
        let mut ports = allocator();
        let first = ports.find_unused().unwrap();
        let second = ports.find_unused().unwrap();
        assert_ne!(first, second);
        assert!(!port_used("127.0.0.1", first));
        assert!(!port_used("127.0.0.1", second));
        assert!(ports.is_tracked(first));
        assert!(ports.is_tracked(second));
    }

    #[test_log::test]
    #[serial]
    fn released_port_becomes_eligible_again() {
        let mut ports = allocator();
        let first = ports.find_unused().unwrap();
        ports.release(first);
        assert!(!ports.is_tracked(first));
        // Scan order is deterministic, so the first free port comes back.
        assert_eq!(ports.find_unused().unwrap(), first);
    }

    #[test_log::test]
    #[serial]
    fn untracked_scan_does_not_touch_the_registry() {
        let ports = allocator();
        let port = ports.find_unused_untracked().unwrap();
        assert!(!ports.is_tracked(port));
    }

    #[test_log::test]
    #[serial]
    fn probe_sees_a_bound_listener() {
        let ports = allocator();
        let port = ports.find_unused_untracked().unwrap();
        assert!(!port_used("127.0.0.1", port));
        let listener = TcpListener::bind(("127.0.0.1", port)).unwrap();
        assert!(port_used("127.0.0.1", port));
        drop(listener);
    }

    #[test]
    fn releasing_an_unknown_port_is_a_noop() {
        let mut ports = allocator();
        ports.release(60000);
        assert!(!ports.is_tracked(60000));
    }
}
