//! Immutable configuration records: [`CaSettings`] and [`MasterSettings`].
//!
//! These mirror the settings a legacy Puppet `ca.conf`/`puppet.conf` would
//! carry. Nothing in this module performs I/O; see [`crate::config`] for
//! loading them from a TOML file on disk.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Either a blanket boolean autosign policy, or a path to a whitelist file
/// or executable script that decides per-CSR. Modeled as a tagged variant
/// rather than a stringly-typed field so the decision tree in
/// [`crate::autosign`] has exactly one place to branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AutosignPolicy {
    Boolean(bool),
    Path(PathBuf),
}

/// Configuration for the certificate authority itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaSettings {
    pub autosign: AutosignPolicy,
    pub allow_duplicate_certs: bool,

    pub cacert: PathBuf,
    pub cakey: PathBuf,
    pub capub: PathBuf,
    pub cacrl: PathBuf,

    pub ca_name: String,
    pub ca_ttl: i64,

    pub cert_inventory: PathBuf,
    pub csrdir: PathBuf,
    pub signeddir: PathBuf,
    pub serial: PathBuf,

    /// Prepended to RUBYLIB when invoking an autosign script.
    #[serde(default)]
    pub load_path: Vec<String>,
}

impl CaSettings {
    /// All path-valued fields, in a stable order. Used by the
    /// initialization orchestrator to check for partial state; excludes
    /// `autosign` (may itself be a path, but is policy, not an artifact),
    /// `ca_ttl`, `ca_name`, `load_path`, and `allow_duplicate_certs`.
    pub fn artifact_paths(&self) -> Vec<PathBuf> {
        vec![
            self.cacert.clone(),
            self.cakey.clone(),
            self.capub.clone(),
            self.cacrl.clone(),
            self.cert_inventory.clone(),
            self.csrdir.clone(),
            self.signeddir.clone(),
            self.serial.clone(),
        ]
    }
}

/// Configuration for the master server's own TLS identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterSettings {
    pub certdir: PathBuf,
    pub requestdir: PathBuf,

    pub hostcert: PathBuf,
    pub hostprivkey: PathBuf,
    pub hostpubkey: PathBuf,
    pub localcacert: PathBuf,

    /// Comma-separated, possibly empty.
    #[serde(default)]
    pub dns_alt_names: String,
}

impl MasterSettings {
    /// All path-valued fields, excluding `dns_alt_names`.
    pub fn artifact_paths(&self) -> Vec<PathBuf> {
        vec![
            self.certdir.clone(),
            self.requestdir.clone(),
            self.hostcert.clone(),
            self.hostprivkey.clone(),
            self.hostpubkey.clone(),
            self.localcacert.clone(),
        ]
    }

    /// Parsed, trimmed, non-empty alt names.
    pub fn alt_names(&self) -> Vec<String> {
        self.dns_alt_names
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn autosign_policy_is_untagged() {
        let toml_true = "autosign = true\n";
        #[derive(Deserialize)]
        struct Wrap {
            autosign: AutosignPolicy,
        }
        let w: Wrap = toml::from_str(toml_true).unwrap();
        assert_eq!(w.autosign, AutosignPolicy::Boolean(true));

        let toml_path = "autosign = \"/etc/puppetlabs/puppet/autosign.conf\"\n";
        let w: Wrap = toml::from_str(toml_path).unwrap();
        assert_eq!(
            w.autosign,
            AutosignPolicy::Path(PathBuf::from("/etc/puppetlabs/puppet/autosign.conf"))
        );
    }

    #[test]
    fn master_alt_names_trims_and_drops_empty() {
        let m = MasterSettings {
            certdir: PathBuf::new(),
            requestdir: PathBuf::new(),
            hostcert: PathBuf::new(),
            hostprivkey: PathBuf::new(),
            hostpubkey: PathBuf::new(),
            localcacert: PathBuf::new(),
            dns_alt_names: " puppet , puppet.example.com ,, ".to_string(),
        };
        assert_eq!(m.alt_names(), vec!["puppet", "puppet.example.com"]);
    }
}
