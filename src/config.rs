//! Loads [`CaSettings`]/[`MasterSettings`] from an on-disk TOML file.
//!
//! This is the only module in the crate that touches a config file format;
//! everywhere else operates purely on the typed settings structs, so tests
//! that construct `CaSettings`/`MasterSettings` directly never exercise
//! this module at all.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::settings::{CaSettings, MasterSettings};

#[derive(Debug, Deserialize)]
struct Document {
    ca: CaSettings,
    master: MasterSettings,
}

/// Reads `path` as UTF-8 TOML with `[ca]` and `[master]` tables and returns
/// the parsed settings pair.
pub fn load(path: impl AsRef<Path>) -> Result<(CaSettings, MasterSettings)> {
    let path = path.as_ref();
    log::debug!("loading CA config from '{}'", path.display());

    let raw = fs::read_to_string(path).map_err(|e| Error::Config {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let doc: Document = toml::from_str(&raw).map_err(|e| Error::Config {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    log::info!(
        "loaded CA config from '{}' (ca_name='{}')",
        path.display(),
        doc.ca.ca_name
    );
    Ok((doc.ca, doc.master))
}
