//! Initialization Orchestrator (§4.10): bootstraps a self-signed CA and a
//! master server certificate on first run, refusing to proceed if the CA's
//! artifact set is only partially present.

use std::fs;
use std::path::{Path, PathBuf};

use rcgen::{Certificate, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair, SanType};
use rsa::pkcs8::EncodePrivateKey;
use rsa::RsaPrivateKey;
use time::OffsetDateTime;

use crate::ca::LoadedCa;
use crate::datetime::NOT_BEFORE_SKEW;
use crate::error::{Error, Result};
use crate::inventory;
use crate::layout;
use crate::serial;
use crate::settings::{CaSettings, MasterSettings};

const DEFAULT_KEYLENGTH: usize = 2048;

/// Bootstraps CA and master artifacts as needed. A fully-present CA
/// artifact set is left untouched; a partially-present one is refused.
/// The master artifact set is bootstrapped unconditionally when incomplete
/// (it can always be regenerated from the CA).
pub fn initialize(
    ca: &CaSettings,
    master: &MasterSettings,
    master_certname: &str,
    keylength: Option<usize>,
) -> Result<()> {
    let keylength = keylength.unwrap_or(DEFAULT_KEYLENGTH);

    match partition_existing(&ca.artifact_paths()) {
        Partition::AllPresent => {
            log::info!("CA already initialized at '{}'", ca.cacert.display());
        }
        Partition::NonePresent => {
            bootstrap_ca(ca, keylength)?;
        }
        Partition::Mixed { found, missing } => {
            return Err(Error::PartialState { found, missing });
        }
    }

    if matches!(partition_existing(&master.artifact_paths()), Partition::AllPresent) {
        log::info!("master already initialized at '{}'", master.hostcert.display());
    } else {
        bootstrap_master(ca, master, master_certname, keylength)?;
    }

    Ok(())
}

enum Partition {
    AllPresent,
    NonePresent,
    Mixed { found: Vec<PathBuf>, missing: Vec<PathBuf> },
}

fn partition_existing(paths: &[PathBuf]) -> Partition {
    let (found, missing): (Vec<PathBuf>, Vec<PathBuf>) =
        paths.iter().cloned().partition(|p| p.exists());

    if missing.is_empty() {
        Partition::AllPresent
    } else if found.is_empty() {
        Partition::NonePresent
    } else {
        Partition::Mixed { found, missing }
    }
}

fn generate_keypair(keylength: usize) -> Result<KeyPair> {
    let mut rng = rand::thread_rng();
    let private_key = RsaPrivateKey::new(&mut rng, keylength)
        .map_err(|e| Error::crypto(format!("failed to generate {keylength}-bit RSA key: {e}")))?;
    let pem = private_key
        .to_pkcs8_pem(rsa::pkcs1::LineEnding::LF)
        .map_err(|e| Error::crypto(format!("failed to encode RSA private key: {e}")))?;
    KeyPair::from_pem(&pem).map_err(|e| Error::crypto(format!("failed to load generated key pair: {e}")))
}

/// Wraps raw bytes as a labeled PEM block. `rcgen`'s `KeyPair` exposes only
/// the raw public key bytes, not a ready-made PEM encoder for them, so we
/// base64-wrap them ourselves the same way the extension composer
/// hand-rolls DER rather than reaching for a crypto library round-trip.
fn encode_pem(label: &str, der: &[u8]) -> String {
    let body = base64_encode(der);
    let mut out = format!("-----BEGIN {label}-----\n");
    for chunk in body.as_bytes().chunks(64) {
        out.push_str(std::str::from_utf8(chunk).expect("base64 output is ASCII"));
        out.push('\n');
    }
    out.push_str(&format!("-----END {label}-----\n"));
    out
}

const BASE64_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

fn base64_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity((data.len() + 2) / 3 * 4);
    for chunk in data.chunks(3) {
        let b0 = chunk[0];
        let b1 = *chunk.get(1).unwrap_or(&0);
        let b2 = *chunk.get(2).unwrap_or(&0);

        out.push(BASE64_ALPHABET[(b0 >> 2) as usize] as char);
        out.push(BASE64_ALPHABET[(((b0 & 0x03) << 4) | (b1 >> 4)) as usize] as char);
        out.push(if chunk.len() > 1 {
            BASE64_ALPHABET[(((b1 & 0x0F) << 2) | (b2 >> 6)) as usize] as char
        } else {
            '='
        });
        out.push(if chunk.len() > 2 {
            BASE64_ALPHABET[(b2 & 0x3F) as usize] as char
        } else {
            '='
        });
    }
    out
}

fn common_name_dn(cn: &str) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, cn);
    dn
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    Ok(())
}

fn bootstrap_ca(ca: &CaSettings, keylength: usize) -> Result<()> {
    log::info!("bootstrapping CA '{}'", ca.ca_name);

    for path in ca.artifact_paths() {
        ensure_parent_dir(&path)?;
    }
    fs::create_dir_all(&ca.csrdir).map_err(|e| Error::io(&ca.csrdir, e))?;
    fs::create_dir_all(&ca.signeddir).map_err(|e| Error::io(&ca.signeddir, e))?;

    serial::init_serial_file(&ca.serial)?;
    inventory::init_inventory_file(&ca.cert_inventory)?;

    let key_pair = generate_keypair(keylength)?;

    let now = OffsetDateTime::now_utc();
    let not_before = now - NOT_BEFORE_SKEW;
    let not_after = now + time::Duration::seconds(ca.ca_ttl);

    let serial_num = serial::next_serial(&ca.serial)?;
    let serial_hex = serial::format_serial(serial_num);

    let mut params = CertificateParams::default();
    params.distinguished_name = common_name_dn(&ca.ca_name);
    params.not_before = not_before;
    params.not_after = not_after;
    params.serial_number = Some(serial_num.to_be_bytes().to_vec().into());
    params.is_ca = IsCa::NoCa;
    params.key_pair = Some(key_pair);

    let cert = Certificate::from_params(params)
        .map_err(|e| Error::crypto(format!("failed to self-sign CA certificate: {e}")))?;

    let cacert_pem = cert
        .serialize_pem()
        .map_err(|e| Error::crypto(format!("failed to serialize CA certificate: {e}")))?;
    let cakey_pem = cert.serialize_private_key_pem();
    let capub_pem = encode_pem("PUBLIC KEY", cert.get_key_pair().public_key_raw());

    let subject_dn = format!("CN={}", ca.ca_name);
    inventory::append(&ca.cert_inventory, &serial_hex, not_before, not_after, &subject_dn)?;

    fs::write(&ca.cakey, &cakey_pem).map_err(|e| Error::io(&ca.cakey, e))?;
    fs::write(&ca.cacert, &cacert_pem).map_err(|e| Error::io(&ca.cacert, e))?;
    fs::write(&ca.capub, capub_pem).map_err(|e| Error::io(&ca.capub, e))?;
    fs::write(&ca.cacrl, empty_crl_placeholder()).map_err(|e| Error::io(&ca.cacrl, e))?;

    log::info!("wrote CA material for '{}' (serial 0x{serial_hex})", ca.ca_name);
    Ok(())
}

/// An empty CRL. `rcgen` 0.12 does not expose CRL construction; the CA
/// bootstraps a placeholder revocation list with no revoked entries,
/// leaving real CRL issuance to whichever external tooling eventually
/// grows revocation support (out of scope here).
fn empty_crl_placeholder() -> &'static str {
    "-----BEGIN X509 CRL-----\n-----END X509 CRL-----\n"
}

fn bootstrap_master(
    ca: &CaSettings,
    master: &MasterSettings,
    master_certname: &str,
    keylength: usize,
) -> Result<()> {
    log::info!("bootstrapping master certificate '{master_certname}'");

    for path in master.artifact_paths() {
        ensure_parent_dir(&path)?;
    }
    fs::create_dir_all(&master.certdir).map_err(|e| Error::io(&master.certdir, e))?;
    fs::create_dir_all(&master.requestdir).map_err(|e| Error::io(&master.requestdir, e))?;

    let loaded_ca = LoadedCa::load(&ca.cakey, &ca.cacert)?;
    // `LoadedCa` only exposes the parsed `Certificate`; `localcacert` is a
    // verbatim copy of the CA cert's PEM text, so read it once more here.
    let ca_cert_pem = fs::read_to_string(&ca.cacert).map_err(|e| Error::io(&ca.cacert, e))?;

    let mut alt_names = master.alt_names();
    if !alt_names.is_empty() && !alt_names.iter().any(|n| n == master_certname) {
        alt_names.push(master_certname.to_string());
    }

    let key_pair = generate_keypair(keylength)?;

    let now = OffsetDateTime::now_utc();
    let not_before = now - NOT_BEFORE_SKEW;
    let not_after = now + time::Duration::seconds(ca.ca_ttl);

    let serial_num = serial::next_serial(&ca.serial)?;
    let serial_hex = serial::format_serial(serial_num);

    let mut params = CertificateParams::default();
    params.distinguished_name = common_name_dn(master_certname);
    params.not_before = not_before;
    params.not_after = not_after;
    params.serial_number = Some(serial_num.to_be_bytes().to_vec().into());
    params.is_ca = IsCa::NoCa;
    params.key_pair = Some(key_pair);
    if !alt_names.is_empty() {
        params.subject_alt_names = alt_names.into_iter().map(SanType::DnsName).collect();
    }

    let cert = Certificate::from_params(params)
        .map_err(|e| Error::crypto(format!("failed to build master certificate: {e}")))?;
    let hostcert_pem = cert
        .serialize_pem_with_signer(&loaded_ca.cert)
        .map_err(|e| Error::crypto(format!("failed to sign master certificate: {e}")))?;
    let hostprivkey_pem = cert.serialize_private_key_pem();
    let hostpubkey_pem = encode_pem("PUBLIC KEY", cert.get_key_pair().public_key_raw());

    let subject_dn = format!("CN={master_certname}");
    inventory::append(&ca.cert_inventory, &serial_hex, not_before, not_after, &subject_dn)?;

    fs::write(&master.hostprivkey, &hostprivkey_pem).map_err(|e| Error::io(&master.hostprivkey, e))?;
    fs::write(&master.hostcert, &hostcert_pem).map_err(|e| Error::io(&master.hostcert, e))?;
    fs::write(&master.hostpubkey, hostpubkey_pem).map_err(|e| Error::io(&master.hostpubkey, e))?;
    fs::write(&master.localcacert, &ca_cert_pem).map_err(|e| Error::io(&master.localcacert, e))?;

    let signed_copy = layout::path_to_cert(&ca.signeddir, master_certname);
    fs::write(&signed_copy, &hostcert_pem).map_err(|e| Error::io(&signed_copy, e))?;

    log::info!("wrote master material for '{master_certname}' (serial 0x{serial_hex})");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(dir: &Path) -> (CaSettings, MasterSettings) {
        let ca = CaSettings {
            autosign: crate::settings::AutosignPolicy::Boolean(false),
            allow_duplicate_certs: false,
            cacert: dir.join("ca/ca_crt.pem"),
            cakey: dir.join("ca/ca_key.pem"),
            capub: dir.join("ca/ca_pub.pem"),
            cacrl: dir.join("ca/ca_crl.pem"),
            ca_name: "Test CA".to_string(),
            ca_ttl: 157_680_000,
            cert_inventory: dir.join("ca/inventory.txt"),
            csrdir: dir.join("ca/requests"),
            signeddir: dir.join("ca/signed"),
            serial: dir.join("ca/serial"),
            load_path: Vec::new(),
        };
        let master = MasterSettings {
            certdir: dir.join("ssl/certs"),
            requestdir: dir.join("ssl/requests"),
            hostcert: dir.join("ssl/host_crt.pem"),
            hostprivkey: dir.join("ssl/host_key.pem"),
            hostpubkey: dir.join("ssl/host_pub.pem"),
            localcacert: dir.join("ssl/local_ca_crt.pem"),
            dns_alt_names: "puppet,puppet.example.com".to_string(),
        };
        (ca, master)
    }

    #[test]
    fn fresh_bootstrap_creates_ca_and_master_with_sequential_serials() {
        let dir = tempfile::tempdir().unwrap();
        let (ca, master) = settings(dir.path());

        initialize(&ca, &master, "master.example.com", Some(1024)).unwrap();

        assert!(ca.cacert.exists());
        assert!(ca.cakey.exists());
        assert!(ca.capub.exists());
        assert!(ca.cacrl.exists());
        assert!(master.hostcert.exists());
        assert!(master.hostprivkey.exists());
        assert!(layout::path_to_cert(&ca.signeddir, "master.example.com").exists());

        let inventory = fs::read_to_string(&ca.cert_inventory).unwrap();
        let lines: Vec<&str> = inventory.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("0x0001 "));
        assert!(lines[1].starts_with("0x0002 "));
    }

    #[test]
    fn rerunning_initialize_on_complete_ca_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let (ca, master) = settings(dir.path());
        initialize(&ca, &master, "master.example.com", Some(1024)).unwrap();

        let cacert_before = fs::read_to_string(&ca.cacert).unwrap();
        initialize(&ca, &master, "master.example.com", Some(1024)).unwrap();
        let cacert_after = fs::read_to_string(&ca.cacert).unwrap();
        assert_eq!(cacert_before, cacert_after);
    }

    #[test]
    fn partial_ca_state_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let (ca, master) = settings(dir.path());

        fs::create_dir_all(ca.csrdir.parent().unwrap()).unwrap();
        fs::create_dir_all(&ca.csrdir).unwrap();
        fs::create_dir_all(&ca.signeddir).unwrap();

        let err = initialize(&ca, &master, "master.example.com", Some(1024)).unwrap_err();
        match err {
            Error::PartialState { found, missing } => {
                assert!(found.contains(&ca.csrdir));
                assert!(missing.contains(&ca.cacert));
            }
            other => panic!("expected PartialState, got {other:?}"),
        }
        assert!(!ca.cacert.exists());
    }
}
