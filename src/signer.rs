//! Given a CSR and CA material, produces a signed certificate, writes it
//! to the signed directory, and updates the inventory (§4.7).

use std::fs;
use std::path::PathBuf;

use rcgen::{CertificateSigningRequest, DistinguishedName, DnType};
use time::OffsetDateTime;

use crate::ca::LoadedCa;
use crate::csr;
use crate::datetime::NOT_BEFORE_SKEW;
use crate::error::{Error, Result};
use crate::extensions;
use crate::inventory;
use crate::layout;
use crate::serial;
use crate::settings::CaSettings;

/// The outcome of a successful signing operation.
pub struct SignedCertificate {
    pub subject: String,
    pub issuer_dn: String,
    pub serial: u64,
    pub serial_hex: String,
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
    pub pem: String,
    pub path: PathBuf,
}

/// Signs `csr_pem` for `subject` under `settings`, writing the resulting
/// cert to `signeddir/{subject}.pem` and appending an inventory record.
///
/// Per the legacy write order, the inventory record is appended *before*
/// the PEM is written; a crash between the two can leave an orphan
/// inventory line, which is an accepted limitation of the audit-log model.
pub fn sign(subject: &str, csr_pem: &str, settings: &CaSettings) -> Result<SignedCertificate> {
    layout::validate_subject(subject)?;

    let parsed = csr::parse(subject, csr_pem)?;
    let ca = LoadedCa::load(&settings.cakey, &settings.cacert)?;

    let now = OffsetDateTime::now_utc();
    let not_before = now - NOT_BEFORE_SKEW;
    let not_after = now + time::Duration::seconds(settings.ca_ttl);

    let serial_num = serial::next_serial(&settings.serial)?;
    let serial_hex = serial::format_serial(serial_num);

    let composed = extensions::compose(&ca.public_key, &parsed.public_key, &parsed.requested_extensions);

    let mut signing_request = CertificateSigningRequest::from_pem(csr_pem).map_err(|e| {
        Error::MalformedCsr {
            subject: subject.to_string(),
            reason: e.to_string(),
        }
    })?;

    signing_request.params.not_before = not_before;
    signing_request.params.not_after = not_after;
    signing_request.params.serial_number = Some(serial_num.to_be_bytes().to_vec().into());
    signing_request.params.distinguished_name = common_name_dn(subject);
    signing_request.params.is_ca = rcgen::IsCa::NoCa;
    signing_request.params.key_usages = Vec::new();
    signing_request.params.extended_key_usages = Vec::new();
    signing_request.params.custom_extensions = extensions::to_rcgen(&composed);

    let pem = signing_request
        .serialize_pem_with_signer(&ca.cert)
        .map_err(|e| Error::crypto(format!("failed to sign certificate for '{subject}': {e}")))?;

    let subject_dn = format!("CN={subject}");
    inventory::append(
        &settings.cert_inventory,
        &serial_hex,
        not_before,
        not_after,
        &subject_dn,
    )?;

    let path = layout::path_to_cert(&settings.signeddir, subject);
    fs::write(&path, &pem).map_err(|e| Error::io(&path, e))?;

    log::info!("signed certificate for '{subject}' (serial 0x{serial_hex})");

    Ok(SignedCertificate {
        subject: subject.to_string(),
        issuer_dn: ca.issuer_dn.clone(),
        serial: serial_num,
        serial_hex,
        not_before,
        not_after,
        pem,
        path,
    })
}

fn common_name_dn(subject: &str) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, subject);
    dn
}
