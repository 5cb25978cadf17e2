//! CSR admission: the entry point a submitted CSR actually goes through
//! (§4.9). Checks the duplicate-cert policy, consults autosign, and routes
//! to either signing or stashing — never both.

use std::fs;

use crate::autosign;
use crate::error::{Error, Result};
use crate::layout;
use crate::settings::CaSettings;
use crate::signer::{self, SignedCertificate};

/// What happened to an admitted CSR.
pub enum Admission {
    Signed(SignedCertificate),
    Stashed,
}

/// Admits `csr_pem` for `subject`: enforces the duplicate policy, then
/// either signs immediately (autosign) or stashes the CSR verbatim for a
/// human to approve later.
pub fn admit(subject: &str, csr_pem: &str, settings: &CaSettings) -> Result<Admission> {
    layout::validate_subject(subject)?;
    validate_duplicate_cert_policy(subject, settings)?;

    if autosign::should_autosign(&settings.autosign, subject, csr_pem.as_bytes(), &settings.load_path) {
        let signed = signer::sign(subject, csr_pem, settings)?;
        Ok(Admission::Signed(signed))
    } else {
        stash(subject, csr_pem, settings)?;
        Ok(Admission::Stashed)
    }
}

/// Refuses the submission if a cert already exists for `subject` (unless
/// `allow_duplicate_certs` is set) or if a CSR is already pending.
fn validate_duplicate_cert_policy(subject: &str, settings: &CaSettings) -> Result<()> {
    let cert_path = layout::path_to_cert(&settings.signeddir, subject);
    if cert_path.exists() {
        if settings.allow_duplicate_certs {
            log::info!(
                "signed certificate already exists at '{}' for '{subject}', overwriting (allow_duplicate_certs)",
                cert_path.display()
            );
        } else {
            return Err(Error::DuplicateCert {
                subject: subject.to_string(),
                situation: format!("a signed certificate already exists at '{}'", cert_path.display()),
            });
        }
    }

    let csr_path = layout::path_to_csr(&settings.csrdir, subject);
    if csr_path.exists() {
        if settings.allow_duplicate_certs {
            log::info!(
                "pending CSR already exists at '{}' for '{subject}', overwriting (allow_duplicate_certs)",
                csr_path.display()
            );
        } else {
            return Err(Error::DuplicateCert {
                subject: subject.to_string(),
                situation: format!("a pending CSR already exists at '{}'", csr_path.display()),
            });
        }
    }

    Ok(())
}

fn stash(subject: &str, csr_pem: &str, settings: &CaSettings) -> Result<()> {
    let path = layout::path_to_csr(&settings.csrdir, subject);
    fs::write(&path, csr_pem).map_err(|e| Error::io(&path, e))?;
    log::info!("stashed CSR for '{subject}' pending manual signing");
    Ok(())
}
