//! Introspection of a PEM-encoded PKCS#10 CSR via `x509-parser`.
//!
//! Separate from [`crate::signer`], which drives `rcgen` to actually build
//! and sign the issued certificate: this module only reads the request,
//! so the Extension Composer can filter by OID without needing any
//! `rcgen`-specific types.

use x509_parser::certification_request::X509CertificationRequest;
use x509_parser::pem::parse_x509_pem;

use crate::extensions::Extension;
use crate::error::{Error, Result};

/// The parts of a CSR the rest of the crate needs.
pub struct ParsedCsr {
    pub subject: String,
    /// Raw `SubjectPublicKeyInfo.subjectPublicKey` bit-string content, used
    /// to derive the Subject Key Identifier extension.
    pub public_key: Vec<u8>,
    /// Extensions requested via the PKCS#9 `extensionRequest` attribute.
    pub requested_extensions: Vec<Extension>,
}

/// Parses `pem` (the full PEM text of a CSR) into its constituent parts.
pub fn parse(subject: &str, pem: &str) -> Result<ParsedCsr> {
    let (_, pem_block) = parse_x509_pem(pem.as_bytes()).map_err(|e| Error::MalformedCsr {
        subject: subject.to_string(),
        reason: format!("invalid PEM: {e}"),
    })?;

    let (_, csr) = X509CertificationRequest::from_der(&pem_block.contents).map_err(|e| {
        Error::MalformedCsr {
            subject: subject.to_string(),
            reason: format!("invalid PKCS#10 DER: {e}"),
        }
    })?;

    let info = &csr.certification_request_info;
    let public_key = info.subject_pki.subject_public_key.data.to_vec();

    let requested_extensions = match csr.requested_extensions() {
        Some(exts) => exts
            .map(|ext| {
                let oid = ext.oid.iter().ok_or_else(|| Error::MalformedCsr {
                    subject: subject.to_string(),
                    reason: format!("requested extension OID '{:?}' has an arc too large to decode", ext.oid),
                })?;
                Ok(Extension {
                    oid: oid.collect(),
                    critical: ext.critical,
                    value: ext.value.to_vec(),
                })
            })
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };

    Ok(ParsedCsr {
        subject: info.subject.to_string(),
        public_key,
        requested_extensions,
    })
}

#[cfg(test)]
mod tests {
    // CSR parsing is exercised end-to-end via `signer` tests, which
    // generate a real CSR with `rcgen` rather than hand-rolling DER here.
}
