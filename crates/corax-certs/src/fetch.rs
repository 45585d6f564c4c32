//! Fetching the CA certificate from a core instance.
//!
//! At bootstrap time no trust anchor exists yet, so the `/ca/cert`
//! request is the one place where TLS verification is deliberately
//! disabled. The fetched certificate is never trusted as-is: when a
//! PSK is configured, the response must carry a JWT proof whose
//! fingerprint claim matches the certificate we actually received.

use reqwest::header::AUTHORIZATION;

use crate::bundle::render_ca_bundle;
use crate::cert::{CaCertificate, HashAlgorithm};
use crate::error::{CertsError, Result};
use crate::jwt::{decode_bearer, FingerprintClaims};

/// Fetch the CA certificate from `{core_url}/ca/cert`.
///
/// Order of operations is fixed: fetch, compute the fingerprint,
/// compare against the PSK-signed proof, and only then hand the
/// certificate out. Without a PSK this degrades to trust-on-first-use.
pub async fn fetch_ca_cert(core_url: &str, psk: Option<&str>) -> Result<CaCertificate> {
    let client = reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .build()?;
    let url = format!("{}/ca/cert", core_url.trim_end_matches('/'));

    let response = client.get(&url).send().await?.error_for_status()?;
    let authorization = response
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.bytes().await?;

    let cert = CaCertificate::from_pem_or_der(&body)?;
    if let Some(psk) = psk {
        let Some(authorization) = authorization else {
            return Err(CertsError::NoJwt);
        };
        let claims: FingerprintClaims = decode_bearer(&authorization, psk)?;
        let actual = cert.fingerprint(HashAlgorithm::Sha256);
        if claims.sha256_fingerprint != actual {
            return Err(CertsError::Fingerprint {
                expected: claims.sha256_fingerprint,
                actual,
            });
        }
    }
    Ok(cert)
}

/// Fetch the CA certificate and return the rendered bundle text
/// without touching the filesystem.
pub async fn load_ca_cert(core_url: &str, psk: Option<&str>) -> Result<String> {
    let cert = fetch_ca_cert(core_url, psk).await?;
    Ok(render_ca_bundle(&cert, false))
}

/// Fetch-and-verify with diagnostics naming the likely cause of each
/// verification failure.
pub async fn load_cert_from_core(core_url: &str, psk: Option<&str>) -> Result<CaCertificate> {
    tracing::debug!(core_url, "Loading CA certificate from core");
    match fetch_ca_cert(core_url, psk).await {
        Ok(cert) => Ok(cert),
        Err(e @ CertsError::Fingerprint { .. }) => {
            tracing::error!(error = %e, "Fingerprint mismatch, MITM attack?");
            Err(e)
        }
        Err(e @ CertsError::Jwt(_)) => {
            tracing::error!(error = %e, "Proof signature invalid, wrong PSK?");
            Err(e)
        }
        Err(e @ CertsError::NoJwt) => {
            tracing::error!(error = %e, "No proof in response, core started without PSK?");
            Err(e)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load CA certificate from core");
            Err(e)
        }
    }
}
