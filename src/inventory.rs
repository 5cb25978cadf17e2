//! Append-only audit log of issued certificates.
//!
//! Never read back by the core — it exists purely for external tooling
//! (`puppet cert list`, auditors). Appends are serialized through the same
//! path-keyed lock used for the serial file, since both are short,
//! in-process critical sections.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use time::OffsetDateTime;

use crate::datetime::format_inventory_timestamp;
use crate::error::{Error, Result};
use crate::lock;

/// Appends one record: `0x{SERIAL} {NB} {NA} /{SUBJECT}\n`.
pub fn append(
    path: &Path,
    serial_hex: &str,
    not_before: OffsetDateTime,
    not_after: OffsetDateTime,
    subject_dn: &str,
) -> Result<()> {
    lock::with_lock(path, || append_locked(path, serial_hex, not_before, not_after, subject_dn))
}

fn append_locked(
    path: &Path,
    serial_hex: &str,
    not_before: OffsetDateTime,
    not_after: OffsetDateTime,
    subject_dn: &str,
) -> Result<()> {
    let line = format!(
        "0x{} {} {} /{}\n",
        serial_hex,
        format_inventory_timestamp(not_before),
        format_inventory_timestamp(not_after),
        subject_dn,
    );

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::io(path, e))?;
    file.write_all(line.as_bytes()).map_err(|e| Error::io(path, e))?;

    log::info!("recorded inventory entry for '{subject_dn}' (serial 0x{serial_hex})");
    Ok(())
}

/// Creates an empty inventory file, used by the initialization
/// orchestrator when bootstrapping a new CA.
pub fn init_inventory_file(path: &Path) -> Result<()> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(|_| ())
        .map_err(|e| Error::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use time::macros::datetime;

    #[test]
    fn appends_legacy_formatted_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.txt");

        append(
            &path,
            "0001",
            datetime!(2026-07-28 00:00:00 UTC),
            datetime!(2031-07-28 00:00:00 UTC),
            "CN=agent1",
        )
        .unwrap();
        append(
            &path,
            "0002",
            datetime!(2026-07-28 00:00:01 UTC),
            datetime!(2031-07-28 00:00:01 UTC),
            "CN=master",
        )
        .unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("0x0001 "));
        assert!(lines[0].ends_with("/CN=agent1"));
        assert!(lines[1].starts_with("0x0002 "));
        assert!(lines[1].ends_with("/CN=master"));
    }
}
