//! Connection management and request plumbing for the core REST API.

use std::pin::Pin;
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Method;

use corax_certs::{jwt, CertificatesHolder, CertsError};
use corax_core::JsonValue;

use crate::config::ClientConfig;

/// Errors from client operations.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Certificate error: {0}")]
    Certs(#[from] CertsError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Core returned status {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// A stream of NDJSON values from the core.
pub type JsonStream = Pin<Box<dyn Stream<Item = Result<JsonValue>> + Send>>;

/// Lifetime of the PSK auth token attached to each request.
const AUTH_TOKEN_TTL: Duration = Duration::from_secs(300);

/// Async client for a coraxcore instance.
///
/// Holds the HTTP connection pool, a per-client session id, and (for
/// verified https connections) the [`CertificatesHolder`] that keeps
/// the trust anchor fresh.
pub struct CoraxClient {
    base_url: String,
    psk: Option<String>,
    session_id: String,
    http: reqwest::Client,
    holder: Option<CertificatesHolder>,
}

impl CoraxClient {
    /// Connect to the core with the given configuration.
    ///
    /// For a verified https URL this bootstraps the trust anchor: the
    /// certificates holder is started (initial fetch-verify-persist
    /// plus background refresh) and its bundle becomes the client's
    /// only trust root.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let base_url = config.core_url.trim_end_matches('/').to_string();

        let holder = if base_url.starts_with("https") && config.verify {
            let holder = CertificatesHolder::new(config.cert_settings());
            holder.start().await?;
            Some(holder)
        } else {
            None
        };

        let mut builder = reqwest::Client::builder();
        match &holder {
            Some(holder) => {
                let bundle = std::fs::read(holder.ca_cert_path())?;
                for cert in reqwest::Certificate::from_pem_bundle(&bundle)? {
                    builder = builder.add_root_certificate(cert);
                }
                builder = builder.tls_built_in_root_certs(false);
            }
            None if base_url.starts_with("https") => {
                builder = builder.danger_accept_invalid_certs(true);
            }
            None => {}
        }
        let http = builder
            .default_headers(extra_headers(config)?)
            .build()?;

        let session_id = uuid::Uuid::new_v4().to_string();
        tracing::info!(url = %base_url, session_id = %session_id, "Connected to core");
        Ok(Self {
            base_url,
            psk: config.psk.clone(),
            session_id,
            http,
            holder,
        })
    }

    /// Stop the certificate refresh task. The connection pool itself
    /// needs no teardown.
    pub fn shutdown(&self) {
        if let Some(holder) = &self.holder {
            holder.shutdown();
        }
    }

    /// Path to the trusted CA bundle, when certificate verification is
    /// active.
    pub fn ca_cert_path(&self) -> Option<&std::path::Path> {
        self.holder.as_ref().map(|h| h.ca_cert_path())
    }

    /// Force a certificate re-fetch, e.g. after a handshake failure.
    pub async fn reload_trust(&self) -> Result<()> {
        if let Some(holder) = &self.holder {
            holder.reload().await?;
        }
        Ok(())
    }

    // ── Request plumbing ─────────────────────────────────────────

    pub(crate) fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self
            .http
            .request(method, url)
            .query(&[("session_id", self.session_id.as_str())]);
        if let Some(psk) = &self.psk {
            req = req.header(AUTHORIZATION, jwt::bearer_token(psk, AUTH_TOKEN_TTL)?);
        }
        Ok(req)
    }

    /// Send a request and map non-2xx responses to [`ApiError::Status`].
    pub(crate) async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = req.send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::Status {
                code: status.as_u16(),
                body,
            })
        }
    }

    pub(crate) async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(self.request(Method::GET, path)?).await?;
        Ok(response.json().await?)
    }

    /// Start a streaming request; the response is split into NDJSON values.
    pub(crate) async fn stream_request(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<JsonStream> {
        let response = self
            .send(req.header(ACCEPT, "application/x-ndjson"))
            .await?;
        Ok(ndjson_stream(response))
    }

    // ── System ───────────────────────────────────────────────────

    /// Liveness probe.
    pub async fn ping(&self) -> Result<String> {
        let response = self.send(self.request(Method::GET, "/system/ping")?).await?;
        Ok(response.text().await?)
    }

    /// Readiness probe.
    pub async fn ready(&self) -> Result<String> {
        let req = self
            .request(Method::GET, "/system/ready")?
            .header(ACCEPT, "text/plain");
        let response = self.send(req).await?;
        Ok(response.text().await?)
    }
}

fn extra_headers(config: &ClientConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, value) in &config.additional_headers {
        let name = name
            .parse::<HeaderName>()
            .map_err(|e| ApiError::InvalidResponse(format!("invalid header name {name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ApiError::InvalidResponse(format!("invalid header value: {e}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// Split a response body into newline-delimited JSON values.
pub(crate) fn ndjson_stream(response: reqwest::Response) -> JsonStream {
    Box::pin(async_stream::try_stream! {
        let mut body = response.bytes_stream();
        let mut buf: Vec<u8> = Vec::new();
        while let Some(chunk) = body.next().await {
            buf.extend_from_slice(&chunk?);
            while let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buf.drain(..=pos).collect();
                let line = line.strip_suffix(b"\n").unwrap_or(&line);
                let line = line.strip_suffix(b"\r").unwrap_or(line);
                if line.is_empty() {
                    continue;
                }
                let value: JsonValue = serde_json::from_slice(line)?;
                yield value;
            }
        }
        if !buf.iter().all(u8::is_ascii_whitespace) {
            let value: JsonValue = serde_json::from_slice(&buf)?;
            yield value;
        }
    })
}
