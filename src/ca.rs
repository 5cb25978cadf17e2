//! Loads existing CA material (cert + private key) from PEM files so it
//! can be used as a signer, for a CA that already exists on disk rather
//! than one freshly generated in-process.

use std::fs;
use std::path::Path;

use rcgen::{Certificate, CertificateParams, KeyPair};

use crate::error::{Error, Result};

/// A CA cert + key pair, ready to sign other certificates.
pub struct LoadedCa {
    pub cert: Certificate,
    pub issuer_dn: String,
    /// Raw (non-DER-wrapped) public key bytes, used to derive the
    /// Authority Key Identifier extension on certs this CA signs.
    pub public_key: Vec<u8>,
}

impl LoadedCa {
    /// Loads the CA's private key and certificate from the given PEM
    /// files and wraps them as a ready-to-sign [`Certificate`].
    pub fn load(cakey_path: &Path, cacert_path: &Path) -> Result<Self> {
        let key_pem = fs::read_to_string(cakey_path).map_err(|e| Error::io(cakey_path, e))?;
        let cert_pem = fs::read_to_string(cacert_path).map_err(|e| Error::io(cacert_path, e))?;

        let key_pair = KeyPair::from_pem(&key_pem).map_err(|e| {
            Error::crypto(format!("failed to parse CA private key: {e}"))
        })?;
        let public_key = key_pair.public_key_raw().to_vec();

        let params = CertificateParams::from_ca_cert_pem(&cert_pem, key_pair)
            .map_err(|e| Error::crypto(format!("failed to parse CA certificate: {e}")))?;

        let issuer_dn = parse_subject_dn(&cert_pem, cacert_path)?;

        let cert = Certificate::from_params(params)
            .map_err(|e| Error::crypto(format!("failed to load CA certificate: {e}")))?;

        Ok(Self {
            cert,
            issuer_dn,
            public_key,
        })
    }
}

fn parse_subject_dn(cert_pem: &str, cert_path: &Path) -> Result<String> {
    let (_, pem_block) = x509_parser::pem::parse_x509_pem(cert_pem.as_bytes())
        .map_err(|e| Error::crypto(format!("invalid CA cert PEM '{}': {e}", cert_path.display())))?;
    let parsed = pem_block
        .parse_x509()
        .map_err(|e| Error::crypto(format!("invalid CA cert DER '{}': {e}", cert_path.display())))?;
    Ok(parsed.subject().to_string())
}
