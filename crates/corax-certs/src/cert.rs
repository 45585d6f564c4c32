//! X.509 certificate parsing and fingerprinting.
//!
//! Certificates are held as owned DER bytes plus the metadata needed
//! for bundle headers and renewal decisions. Fingerprints are hashes
//! of the DER encoding, rendered as colon-separated upper hex so they
//! compare equal across platforms and re-encodings.

use std::path::Path;
use std::time::{Duration, SystemTime};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha256, Sha384, Sha512};
use x509_parser::prelude::*;

use crate::error::{CertsError, Result};

/// Hash algorithm used for certificate fingerprints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

/// An X.509 certificate with owned DER bytes and parsed metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaCertificate {
    der: Vec<u8>,
    subject: String,
    issuer: String,
    /// Common name of the issuer, used as the bundle label.
    issuer_cn: Option<String>,
    serial: String,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
}

impl CaCertificate {
    /// Parse a certificate from PEM or raw DER bytes.
    pub fn from_pem_or_der(bytes: &[u8]) -> Result<Self> {
        let der = if bytes.starts_with(b"-----BEGIN") {
            let (_, pem) = x509_parser::pem::parse_x509_pem(bytes)
                .map_err(|e| CertsError::Parse(e.to_string()))?;
            pem.contents
        } else {
            bytes.to_vec()
        };
        Self::from_der(der)
    }

    /// Read and parse a certificate file (PEM or DER).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_pem_or_der(&bytes)
    }

    fn from_der(der: Vec<u8>) -> Result<Self> {
        let (subject, issuer, issuer_cn, serial, not_before, not_after) = {
            let (_, cert) =
                X509Certificate::from_der(&der).map_err(|e| CertsError::Parse(e.to_string()))?;
            let issuer_cn = cert
                .issuer()
                .iter_common_name()
                .next()
                .and_then(|cn| cn.as_str().ok())
                .map(str::to_string);
            let not_before: SystemTime = cert.validity().not_before.to_datetime().into();
            let not_after: SystemTime = cert.validity().not_after.to_datetime().into();
            (
                cert.subject().to_string(),
                cert.issuer().to_string(),
                issuer_cn,
                cert.raw_serial_as_string(),
                not_before,
                not_after,
            )
        };

        Ok(Self {
            der,
            subject,
            issuer,
            issuer_cn,
            serial,
            not_before: not_before.into(),
            not_after: not_after.into(),
        })
    }

    /// The DER encoding of this certificate.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn issuer_cn(&self) -> Option<&str> {
        self.issuer_cn.as_deref()
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    pub fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    /// True if the certificate expires within the given window from now.
    pub fn expires_within(&self, window: Duration) -> bool {
        let threshold = Utc::now()
            + chrono::Duration::from_std(window).unwrap_or_else(|_| chrono::Duration::zero());
        self.not_after < threshold
    }

    /// Colon-separated upper-hex digest of the DER encoding.
    ///
    /// Deterministic across platforms: the digest covers the exact DER
    /// bytes, so PEM round-trips do not change the fingerprint.
    pub fn fingerprint(&self, algorithm: HashAlgorithm) -> String {
        let digest: Vec<u8> = match algorithm {
            HashAlgorithm::Sha256 => Sha256::digest(&self.der).to_vec(),
            HashAlgorithm::Sha384 => Sha384::digest(&self.der).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(&self.der).to_vec(),
        };
        digest
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(":")
    }

    /// Serialize to a PEM block.
    pub fn to_pem(&self) -> String {
        der_to_pem(&self.der)
    }
}

/// Render DER bytes as a CERTIFICATE PEM block, wrapped at 64 columns.
pub(crate) fn der_to_pem(der: &[u8]) -> String {
    let encoded = BASE64.encode(der);
    let mut out = String::with_capacity(encoded.len() + 64);
    out.push_str("-----BEGIN CERTIFICATE-----\n");
    for chunk in encoded.as_bytes().chunks(64) {
        // chunks of a valid base64 string are valid UTF-8
        out.push_str(std::str::from_utf8(chunk).unwrap_or_default());
        out.push('\n');
    }
    out.push_str("-----END CERTIFICATE-----\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::self_signed_cert;

    #[test]
    fn test_pem_round_trip_keeps_fingerprint() {
        let cert = self_signed_cert("corax-test");
        let pem = cert.to_pem();
        let reparsed = CaCertificate::from_pem_or_der(pem.as_bytes()).unwrap();
        assert_eq!(
            cert.fingerprint(HashAlgorithm::Sha256),
            reparsed.fingerprint(HashAlgorithm::Sha256)
        );
        assert_eq!(cert.der(), reparsed.der());
    }

    #[test]
    fn test_fingerprint_deterministic_and_distinct() {
        let a = self_signed_cert("corax-a");
        let b = self_signed_cert("corax-b");
        assert_eq!(
            a.fingerprint(HashAlgorithm::Sha256),
            a.fingerprint(HashAlgorithm::Sha256)
        );
        assert_ne!(
            a.fingerprint(HashAlgorithm::Sha256),
            b.fingerprint(HashAlgorithm::Sha256)
        );
        // algorithms disagree on the same certificate
        assert_ne!(
            a.fingerprint(HashAlgorithm::Sha256),
            a.fingerprint(HashAlgorithm::Sha512)
        );
    }

    #[test]
    fn test_fingerprint_format() {
        let cert = self_signed_cert("corax-test");
        let fp = cert.fingerprint(HashAlgorithm::Sha256);
        // 32 bytes -> 32 upper-hex pairs joined by colons
        assert_eq!(fp.len(), 32 * 3 - 1);
        assert!(fp
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase() || c == ':'));
    }

    #[test]
    fn test_malformed_bytes_fail_with_parse_error() {
        let err = CaCertificate::from_pem_or_der(b"not a certificate").unwrap_err();
        assert!(matches!(err, CertsError::Parse(_)));
    }

    #[test]
    fn test_metadata_extracted() {
        let cert = self_signed_cert("corax-meta");
        assert_eq!(cert.issuer_cn(), Some("corax-meta"));
        assert!(cert.not_after() > Utc::now());
        assert!(!cert.expires_within(Duration::from_secs(60)));
        assert!(cert.expires_within(Duration::from_secs(366 * 24 * 3600)));
    }
}
