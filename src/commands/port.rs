//! `testrig port` command.

use crate::port::PortAllocator;

/// Execute the `port` command.
///
/// Allocates `count` distinct unused ports from one allocator and prints
/// them, one per line.
///
/// # Errors
///
/// Returns an error string when the scanned range is exhausted.
pub fn run(addr: &str, start: u16, count: u16) -> Result<(), String> {
    let mut ports = PortAllocator::new(addr, start);
    for _ in 0..count {
        let port = ports.find_unused().map_err(|e| e.to_string())?;
        println!("{port}");
    }
    Ok(())
}
