//! Builds the ordered extension set for an issued certificate: a fixed
//! base plus a filtered copy of the CSR's own extensions.
//!
//! Extensions are represented independently of `rcgen`'s typed API (OID +
//! critical flag + raw DER value) so the exact base set, ordering, and
//! criticality the legacy CA produces can be reproduced and unit tested
//! without touching the crypto library at all. [`crate::signer`] converts
//! the composed list into `rcgen::CustomExtension`s at the point of use.

use rcgen::CustomExtension;

/// OID + critical flag + DER-encoded value. Equality is by OID.
#[derive(Debug, Clone)]
pub struct Extension {
    pub oid: Vec<u64>,
    pub critical: bool,
    pub value: Vec<u8>,
}

impl PartialEq for Extension {
    fn eq(&self, other: &Self) -> bool {
        self.oid == other.oid
    }
}

pub const OID_NETSCAPE_COMMENT: &[u64] = &[2, 16, 840, 1, 113730, 1, 13];
pub const OID_AUTHORITY_KEY_IDENTIFIER: &[u64] = &[2, 5, 29, 35];
pub const OID_BASIC_CONSTRAINTS: &[u64] = &[2, 5, 29, 19];
pub const OID_EXTENDED_KEY_USAGE: &[u64] = &[2, 5, 29, 37];
pub const OID_KEY_USAGE: &[u64] = &[2, 5, 29, 15];
pub const OID_SUBJECT_KEY_IDENTIFIER: &[u64] = &[2, 5, 29, 14];

pub const OID_EKU_SERVER_AUTH: &[u64] = &[1, 3, 6, 1, 5, 5, 7, 3, 1];
pub const OID_EKU_CLIENT_AUTH: &[u64] = &[1, 3, 6, 1, 5, 5, 7, 3, 2];

/// The Puppet OID arc: domain-specific extensions under this dotted
/// prefix are trusted to propagate from a CSR onto the issued cert.
pub const PUPPET_OID_ARC: &[u64] = &[1, 3, 6, 1, 4, 1, 34380, 1];

const NETSCAPE_COMMENT_TEXT: &str = "Puppet JVM Internal Certificate";

/// True iff `oid` lies within [`PUPPET_OID_ARC`] (a dotted-prefix subtree
/// test, not exact equality).
pub fn is_under_puppet_arc(oid: &[u64]) -> bool {
    oid.len() > PUPPET_OID_ARC.len() && oid.starts_with(PUPPET_OID_ARC)
}

/// DER-encodes an IA5String (tag 0x16), the content type `rcgen` and
/// OpenSSL both use for the Netscape comment extension's `extnValue`.
fn der_ia5_string(s: &str) -> Vec<u8> {
    let bytes = s.as_bytes();
    let mut out = vec![0x16u8];
    encode_der_length(&mut out, bytes.len());
    out.extend_from_slice(bytes);
    out
}

fn encode_der_length(out: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        out.push(len as u8);
    } else {
        let len_bytes = len.to_be_bytes();
        let first_nonzero = len_bytes.iter().position(|&b| b != 0).unwrap_or(len_bytes.len() - 1);
        let significant = &len_bytes[first_nonzero..];
        out.push(0x80 | significant.len() as u8);
        out.extend_from_slice(significant);
    }
}

/// SHA-1 of `public_key` bytes, the classic RFC 5280 method-1 key
/// identifier. Puppet's legacy CA (and OpenSSL's default `-subj_hash`
/// style key id) uses this, so we match it rather than SHA-256.
fn key_identifier(public_key: &[u8]) -> Vec<u8> {
    ring::digest::digest(&ring::digest::SHA1_FOR_LEGACY_USE_ONLY, public_key)
        .as_ref()
        .to_vec()
}

fn der_octet_string(bytes: &[u8]) -> Vec<u8> {
    let mut out = vec![0x04u8];
    encode_der_length(&mut out, bytes.len());
    out.extend_from_slice(bytes);
    out
}

/// Composes the full, spec-ordered extension list for an issued cert.
///
/// `ca_public_key` and `csr_public_key` are the raw (non-DER-wrapped)
/// public key bytes of the CA and the requesting CSR respectively, used
/// to derive the Authority/Subject Key Identifier extensions.
pub fn compose(
    ca_public_key: &[u8],
    csr_public_key: &[u8],
    requested: &[Extension],
) -> Vec<Extension> {
    let mut out = Vec::with_capacity(6 + requested.len());

    out.push(Extension {
        oid: OID_NETSCAPE_COMMENT.to_vec(),
        critical: false,
        value: der_ia5_string(NETSCAPE_COMMENT_TEXT),
    });

    out.push(Extension {
        oid: OID_AUTHORITY_KEY_IDENTIFIER.to_vec(),
        critical: false,
        value: der_octet_string(&key_identifier(ca_public_key)),
    });

    out.push(Extension {
        oid: OID_BASIC_CONSTRAINTS.to_vec(),
        critical: true,
        value: vec![0x30, 0x00], // SEQUENCE {} - cA defaults to FALSE, no pathLen
    });

    out.push(Extension {
        oid: OID_EXTENDED_KEY_USAGE.to_vec(),
        critical: true,
        value: encode_eku_sequence(&[OID_EKU_SERVER_AUTH, OID_EKU_CLIENT_AUTH]),
    });

    out.push(Extension {
        oid: OID_KEY_USAGE.to_vec(),
        critical: true,
        // BIT STRING with digitalSignature (bit 0) and keyEncipherment
        // (bit 2) set: 0b10100000 = 0xA0, 6 unused trailing bits.
        value: vec![0x03, 0x02, 0x06, 0xA0],
    });

    out.push(Extension {
        oid: OID_SUBJECT_KEY_IDENTIFIER.to_vec(),
        critical: false,
        value: der_octet_string(&key_identifier(csr_public_key)),
    });

    for ext in requested {
        if is_under_puppet_arc(&ext.oid) {
            out.push(ext.clone());
        }
    }

    out
}

fn encode_der_oid(oid: &[u64]) -> Vec<u8> {
    let mut body = Vec::new();
    body.push((oid[0] * 40 + oid[1]) as u8);
    for &arc in &oid[2..] {
        body.extend(encode_base128(arc));
    }
    let mut out = vec![0x06u8];
    encode_der_length(&mut out, body.len());
    out.extend(body);
    out
}

fn encode_base128(mut n: u64) -> Vec<u8> {
    let mut bytes = vec![(n & 0x7F) as u8];
    n >>= 7;
    while n > 0 {
        bytes.push(((n & 0x7F) as u8) | 0x80);
        n >>= 7;
    }
    bytes.reverse();
    bytes
}

fn encode_eku_sequence(oids: &[&[u64]]) -> Vec<u8> {
    let mut body = Vec::new();
    for oid in oids {
        body.extend(encode_der_oid(oid));
    }
    let mut out = vec![0x30u8];
    encode_der_length(&mut out, body.len());
    out.extend(body);
    out
}

/// Converts a composed extension list into `rcgen::CustomExtension`s,
/// ready to assign to `CertificateParams::custom_extensions`.
pub fn to_rcgen(extensions: &[Extension]) -> Vec<CustomExtension> {
    extensions
        .iter()
        .map(|e| {
            let mut ce = CustomExtension::from_oid_content(
                &e.oid.iter().map(|&a| a as u64).collect::<Vec<_>>(),
                e.value.clone(),
            );
            ce.set_criticality(e.critical);
            ce
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arc_membership_is_dotted_prefix() {
        assert!(is_under_puppet_arc(&[1, 3, 6, 1, 4, 1, 34380, 1, 2, 3]));
        assert!(!is_under_puppet_arc(&[2, 5, 29, 17]));
        assert!(!is_under_puppet_arc(&PUPPET_OID_ARC.to_vec()));
    }

    #[test]
    fn compose_filters_by_arc_and_keeps_base_set() {
        let requested = vec![
            Extension {
                oid: vec![1, 3, 6, 1, 4, 1, 34380, 1, 2, 3],
                critical: false,
                value: vec![0x05, 0x00],
            },
            Extension {
                oid: vec![2, 5, 29, 17], // subjectAltName, not in the Puppet arc
                critical: false,
                value: vec![0x30, 0x00],
            },
        ];

        let composed = compose(b"ca-pubkey", b"csr-pubkey", &requested);

        let oids: Vec<&[u64]> = composed.iter().map(|e| e.oid.as_slice()).collect();
        assert!(oids.contains(&OID_NETSCAPE_COMMENT));
        assert!(oids.contains(&OID_AUTHORITY_KEY_IDENTIFIER));
        assert!(oids.contains(&OID_BASIC_CONSTRAINTS));
        assert!(oids.contains(&OID_EXTENDED_KEY_USAGE));
        assert!(oids.contains(&OID_KEY_USAGE));
        assert!(oids.contains(&OID_SUBJECT_KEY_IDENTIFIER));
        assert!(oids.contains(&[1u64, 3, 6, 1, 4, 1, 34380, 1, 2, 3].as_slice()));
        assert!(!oids.contains(&[2u64, 5, 29, 17].as_slice()));

        let bc = composed
            .iter()
            .find(|e| e.oid == OID_BASIC_CONSTRAINTS)
            .unwrap();
        assert!(bc.critical);
        let eku = composed
            .iter()
            .find(|e| e.oid == OID_EXTENDED_KEY_USAGE)
            .unwrap();
        assert!(eku.critical);
        let ncomment = composed
            .iter()
            .find(|e| e.oid == OID_NETSCAPE_COMMENT)
            .unwrap();
        assert!(!ncomment.critical);
    }

    #[test]
    fn der_oid_encodes_puppet_arc_member() {
        let der = encode_der_oid(&[1, 3, 6, 1, 4, 1, 34380, 1]);
        // tag 0x06, then body; sanity check it round-trips through length.
        assert_eq!(der[0], 0x06);
        assert_eq!(der.len() as u8 - 2, der[1]);
    }
}
