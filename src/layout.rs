//! Derives on-disk file locations from a subject (certname).
//!
//! Matches the legacy Ruby CA's flat layout: `{dir}/{subject}.pem`, subject
//! used verbatim. An implementer MAY reject subjects that look unsafe; we
//! do, since a certname is attacker-controlled input arriving over the
//! HTTP boundary and `/`, `\`, or NUL would escape the intended directory.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Rejects subjects that could escape `{dir}/{subject}.pem`.
pub fn validate_subject(subject: &str) -> Result<()> {
    if subject.is_empty()
        || subject.contains('/')
        || subject.contains('\\')
        || subject.contains('\0')
    {
        return Err(Error::InvalidSubject(subject.to_string()));
    }
    Ok(())
}

pub fn path_to_cert(signeddir: &Path, subject: &str) -> PathBuf {
    signeddir.join(format!("{subject}.pem"))
}

pub fn path_to_csr(csrdir: &Path, subject: &str) -> PathBuf {
    csrdir.join(format!("{subject}.pem"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_flat_pem_paths() {
        assert_eq!(
            path_to_cert(Path::new("/etc/puppet/ssl/ca/signed"), "agent1"),
            PathBuf::from("/etc/puppet/ssl/ca/signed/agent1.pem")
        );
        assert_eq!(
            path_to_csr(Path::new("/etc/puppet/ssl/ca/requests"), "agent1"),
            PathBuf::from("/etc/puppet/ssl/ca/requests/agent1.pem")
        );
    }

    #[test]
    fn rejects_path_traversal_subjects() {
        assert!(validate_subject("../../etc/passwd").is_err());
        assert!(validate_subject("a/b").is_err());
        assert!(validate_subject("a\\b").is_err());
        assert!(validate_subject("a\0b").is_err());
        assert!(validate_subject("").is_err());
    }

    #[test]
    fn accepts_ordinary_certnames() {
        assert!(validate_subject("agent1.example.com").is_ok());
    }
}
