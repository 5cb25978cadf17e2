//! The small surface an HTTP layer would call into (§6). Everything here
//! is a thin wrapper over the other modules — no transport, no framework,
//! just the operations a request handler would invoke directly.

use std::fs;
use std::path::Path;

use crate::admission::{self, Admission};
use crate::error::{Error, Result};
use crate::init;
use crate::layout;
use crate::settings::{CaSettings, MasterSettings};
use crate::signer::SignedCertificate;

/// Returns the PEM text of the cert for `subject`, or `Ok(None)` if none
/// exists. `subject == "ca"` is special-cased to return the CA's own cert.
pub fn get_certificate(subject: &str, cacert_path: &Path, signeddir: &Path) -> Result<Option<String>> {
    if subject == "ca" {
        return read_optional(cacert_path);
    }
    layout::validate_subject(subject)?;
    read_optional(&layout::path_to_cert(signeddir, subject))
}

/// Returns the PEM text of the pending CSR for `subject`, or `Ok(None)`.
pub fn get_certificate_request(subject: &str, csrdir: &Path) -> Result<Option<String>> {
    layout::validate_subject(subject)?;
    read_optional(&layout::path_to_csr(csrdir, subject))
}

/// Returns the PEM text of the CRL. Unlike certs and CSRs this one is
/// mandatory: a missing CRL after initialization indicates corrupted state.
pub fn get_certificate_revocation_list(cacrl_path: &Path) -> Result<String> {
    fs::read_to_string(cacrl_path).map_err(|e| Error::io(cacrl_path, e))
}

/// Admits a CSR submission: duplicate check, autosign decision, then sign
/// or stash. Returns the signed certificate when autosign fired.
pub fn process_csr_submission(
    subject: &str,
    csr_pem: &str,
    ca_settings: &CaSettings,
) -> Result<Option<SignedCertificate>> {
    match admission::admit(subject, csr_pem, ca_settings)? {
        Admission::Signed(cert) => Ok(Some(cert)),
        Admission::Stashed => Ok(None),
    }
}

/// Bootstraps CA and master artifacts if not already present.
pub fn initialize(
    ca_settings: &CaSettings,
    master_settings: &MasterSettings,
    master_certname: &str,
    keylength: Option<usize>,
) -> Result<()> {
    init::initialize(ca_settings, master_settings, master_certname, keylength)
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_cert_returns_none_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = get_certificate("agent1", &dir.path().join("cacert.pem"), dir.path()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn ca_subject_reads_cacert_directly() {
        let dir = tempfile::tempdir().unwrap();
        let cacert = dir.path().join("cacert.pem");
        fs::write(&cacert, "dummy cert pem").unwrap();
        let result = get_certificate("ca", &cacert, dir.path()).unwrap();
        assert_eq!(result.as_deref(), Some("dummy cert pem"));
    }

    #[test]
    fn rejects_unsafe_subject() {
        let dir = tempfile::tempdir().unwrap();
        let err = get_certificate("../etc/passwd", &dir.path().join("cacert.pem"), dir.path()).unwrap_err();
        assert!(matches!(err, Error::InvalidSubject(_)));
    }
}
