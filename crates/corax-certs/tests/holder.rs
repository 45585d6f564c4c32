//! End-to-end tests for the certificates holder against a stub core.
//!
//! A raw tokio TcpListener plays the `/ca/cert` endpoint, serving a
//! self-signed certificate with an optional PSK-signed fingerprint
//! proof in the response headers.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use corax_certs::jwt::{encode_jwt, FingerprintClaims};
use corax_certs::{CaCertificate, CertSettings, CertificatesHolder, CertsError, HashAlgorithm};

/// Generate a one-year self-signed certificate with the given CN.
fn self_signed_cert(cn: &str) -> CaCertificate {
    let mut params = rcgen::CertificateParams::default();
    params.not_before = SystemTime::now().into();
    params.not_after = (SystemTime::now() + Duration::from_secs(365 * 24 * 3600)).into();
    let mut dn = rcgen::DistinguishedName::new();
    dn.push(rcgen::DnType::CommonName, cn);
    params.distinguished_name = dn;

    let cert = rcgen::Certificate::from_params(params).expect("generate test certificate");
    let pem = cert.serialize_pem().expect("serialize test certificate");
    CaCertificate::from_pem_or_der(pem.as_bytes()).expect("parse test certificate")
}

#[derive(Clone)]
struct StubResponse {
    body: Vec<u8>,
    authorization: Option<String>,
}

impl StubResponse {
    fn plain(cert: &CaCertificate) -> Self {
        Self {
            body: cert.to_pem().into_bytes(),
            authorization: None,
        }
    }

    fn with_proof(cert: &CaCertificate, psk: &str, fingerprint: &str) -> Self {
        let claims = FingerprintClaims {
            sha256_fingerprint: fingerprint.to_string(),
            exp: None,
        };
        let token = encode_jwt(&claims, psk).unwrap();
        Self {
            body: cert.to_pem().into_bytes(),
            authorization: Some(format!("Bearer {token}")),
        }
    }
}

struct StubCore {
    addr: SocketAddr,
    state: Arc<Mutex<StubResponse>>,
}

impl StubCore {
    async fn spawn(initial: StubResponse) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(initial));
        let served = state.clone();
        tokio::spawn(async move {
            while let Ok((mut sock, _)) = listener.accept().await {
                let served = served.clone();
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    let _ = sock.read(&mut buf).await;
                    let response = served.lock().unwrap().clone();
                    let mut head = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/x-pem-file\r\nContent-Length: {}\r\nConnection: close\r\n",
                        response.body.len()
                    );
                    if let Some(auth) = &response.authorization {
                        head.push_str(&format!("Authorization: {auth}\r\n"));
                    }
                    head.push_str("\r\n");
                    let _ = sock.write_all(head.as_bytes()).await;
                    let _ = sock.write_all(&response.body).await;
                    let _ = sock.shutdown().await;
                });
            }
        });
        Self { addr, state }
    }

    fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn serve(&self, response: StubResponse) {
        *self.state.lock().unwrap() = response;
    }
}

fn settings_for(core: &StubCore, dir: &std::path::Path) -> CertSettings {
    let mut settings = CertSettings::new(core.url());
    settings.ca_cert_path = dir.join("ca.pem");
    settings
}

#[tokio::test]
async fn test_trust_on_first_use_end_to_end() {
    let cert = self_signed_cert("corax-stub");
    let core = StubCore::spawn(StubResponse::plain(&cert)).await;
    let dir = tempfile::tempdir().unwrap();
    let holder = CertificatesHolder::new(settings_for(&core, dir.path()));

    holder.start().await.unwrap();

    // the persisted bundle parses back to the stub's certificate
    let on_disk = CaCertificate::from_file(holder.ca_cert_path()).unwrap();
    assert_eq!(
        on_disk.fingerprint(HashAlgorithm::Sha256),
        cert.fingerprint(HashAlgorithm::Sha256)
    );
    holder.shutdown();
}

#[tokio::test]
async fn test_valid_proof_accepted() {
    let cert = self_signed_cert("corax-proof");
    let fp = cert.fingerprint(HashAlgorithm::Sha256);
    let core = StubCore::spawn(StubResponse::with_proof(&cert, "secret", &fp)).await;
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings_for(&core, dir.path());
    settings.psk = Some("secret".to_string());
    let holder = CertificatesHolder::new(settings);

    holder.start().await.unwrap();
    assert_eq!(holder.current_fingerprint().await.as_deref(), Some(fp.as_str()));
    holder.shutdown();
}

#[tokio::test]
async fn test_mismatched_proof_is_fatal() {
    let cert = self_signed_cert("corax-mitm");
    let core = StubCore::spawn(StubResponse::with_proof(
        &cert,
        "secret",
        "AA:AA:AA", // deliberately not the certificate's fingerprint
    ))
    .await;
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings_for(&core, dir.path());
    settings.psk = Some("secret".to_string());
    let holder = CertificatesHolder::new(settings);

    let err = holder.start().await.unwrap_err();
    assert!(matches!(err, CertsError::Fingerprint { .. }));
    // nothing was persisted
    assert!(!settings_exists(dir.path()));
}

fn settings_exists(dir: &std::path::Path) -> bool {
    dir.join("ca.pem").exists()
}

#[tokio::test]
async fn test_missing_proof_with_psk_fails() {
    let cert = self_signed_cert("corax-nojwt");
    let core = StubCore::spawn(StubResponse::plain(&cert)).await;
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings_for(&core, dir.path());
    settings.psk = Some("secret".to_string());
    let holder = CertificatesHolder::new(settings);

    let err = holder.start().await.unwrap_err();
    assert!(matches!(err, CertsError::NoJwt));
}

#[tokio::test]
async fn test_reload_skips_write_when_unchanged() {
    let cert = self_signed_cert("corax-same");
    let core = StubCore::spawn(StubResponse::plain(&cert)).await;
    let dir = tempfile::tempdir().unwrap();
    let holder = CertificatesHolder::new(settings_for(&core, dir.path()));
    holder.start().await.unwrap();

    let mtime_before = std::fs::metadata(holder.ca_cert_path())
        .unwrap()
        .modified()
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    holder.reload().await.unwrap();
    let mtime_after = std::fs::metadata(holder.ca_cert_path())
        .unwrap()
        .modified()
        .unwrap();
    assert_eq!(mtime_before, mtime_after, "unchanged cert must not rewrite the bundle");

    // rotate the core's certificate: the next reload replaces the bundle
    let rotated = self_signed_cert("corax-rotated");
    core.serve(StubResponse::plain(&rotated));
    holder.reload().await.unwrap();

    let on_disk = CaCertificate::from_file(holder.ca_cert_path()).unwrap();
    assert_eq!(
        on_disk.fingerprint(HashAlgorithm::Sha256),
        rotated.fingerprint(HashAlgorithm::Sha256)
    );
    holder.shutdown();
}

#[tokio::test]
async fn test_shutdown_does_not_wait_for_next_tick() {
    let cert = self_signed_cert("corax-prompt");
    let core = StubCore::spawn(StubResponse::plain(&cert)).await;
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings_for(&core, dir.path());
    settings.refresh_interval = Duration::from_secs(3600);
    let holder = CertificatesHolder::new(settings);
    holder.start().await.unwrap();

    let started = Instant::now();
    holder.shutdown();
    assert!(started.elapsed() < Duration::from_secs(1));

    // the bundle survives shutdown for the next process
    assert!(holder.ca_cert_path().exists());
}
