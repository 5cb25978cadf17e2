//! Serial number allocation, persisted as `%04X` hex text.
//!
//! The on-disk value is always the *next* serial to hand out. `next_serial`
//! is the only place that mutates the serial file, and does so under the
//! path-keyed lock from [`crate::lock`] so concurrent admission-controller
//! invocations never race on the same file.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::lock;

/// Formats `n` as uppercase hex, left-padded to at least 4 digits.
pub fn format_serial(n: u64) -> String {
    format!("{n:04X}")
}

/// Parses a serial file's contents (trimmed, case-insensitive hex) back
/// into an integer.
pub fn parse_serial(s: &str) -> Result<u64> {
    u64::from_str_radix(s.trim(), 16)
        .map_err(|e| Error::crypto(format!("corrupt serial value '{s}': {e}")))
}

/// Reads the next serial from `path`, persists the successor, and returns
/// the value that was just allocated.
///
/// Guarantees at-most-one in-flight read-modify-write per path within this
/// process. If the process crashes after this function returns but before
/// the caller finishes using the serial, the same value may be reissued on
/// the next run — a known limitation inherited from the legacy CA, not a
/// correctness goal of this allocator.
pub fn next_serial(path: &Path) -> Result<u64> {
    lock::with_lock(path, || next_serial_locked(path))
}

fn next_serial_locked(path: &Path) -> Result<u64> {
    let raw = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let current = parse_serial(&raw)?;
    let next = current
        .checked_add(1)
        .ok_or_else(|| Error::crypto("serial counter overflowed u64"))?;

    fs::write(path, format_serial(next)).map_err(|e| Error::io(path, e))?;
    log::debug!(
        "allocated serial {} from '{}', next is {}",
        format_serial(current),
        path.display(),
        format_serial(next)
    );
    Ok(current)
}

/// Writes the initial serial file contents (`0001`), used by the
/// initialization orchestrator when bootstrapping a new CA.
pub fn init_serial_file(path: &Path) -> Result<()> {
    fs::write(path, format_serial(1)).map_err(|e| Error::io(path, e))
}
