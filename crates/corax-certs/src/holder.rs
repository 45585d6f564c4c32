//! Certificate lifecycle: initial load, persistence, background renewal.
//!
//! The holder owns the CA bundle file and exactly one background
//! refresh task. All writes to the bundle go through a single async
//! lock, and the file itself is replaced atomically, so readers never
//! observe a torn bundle.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::bundle::write_ca_bundle;
use crate::cert::{CaCertificate, HashAlgorithm};
use crate::error::{CertsError, Result};
use crate::fetch::load_cert_from_core;

/// Settings for a [`CertificatesHolder`].
#[derive(Debug, Clone)]
pub struct CertSettings {
    /// Base URL of the core instance.
    pub core_url: String,
    /// Optional pre-shared key; without it the first fetched
    /// certificate is trusted as-is (trust-on-first-use).
    pub psk: Option<String>,
    /// A pre-provisioned CA file. When set it is authoritative: the
    /// holder never fetches and never refreshes.
    pub custom_ca_cert_path: Option<PathBuf>,
    /// Where the fetched bundle is persisted.
    pub ca_cert_path: PathBuf,
    /// Refresh proactively this long before certificate expiry.
    pub renew_before: Duration,
    /// Cadence of the background refresh task.
    pub refresh_interval: Duration,
    /// Append the platform trust store to the bundle.
    pub include_system_roots: bool,
    /// Fingerprint algorithm for change detection.
    pub hash_algorithm: HashAlgorithm,
}

impl CertSettings {
    pub fn new(core_url: impl Into<String>) -> Self {
        Self {
            core_url: core_url.into(),
            psk: None,
            custom_ca_cert_path: None,
            ca_cert_path: std::env::temp_dir().join("corax-ca-bundle.pem"),
            renew_before: Duration::from_secs(24 * 3600),
            refresh_interval: Duration::from_secs(3600),
            include_system_roots: false,
            hash_algorithm: HashAlgorithm::Sha256,
        }
    }
}

struct Inner {
    settings: CertSettings,
    cert: RwLock<Option<CaCertificate>>,
    // serializes load/reload/refresh against the bundle file
    load_lock: Mutex<()>,
}

impl Inner {
    /// Initial load. An on-disk bundle that parses and is still
    /// outside the renewal window wins over the network; otherwise a
    /// full fetch-verify-write cycle runs. Verification failures
    /// (fingerprint mismatch, missing or invalid proof) propagate
    /// untouched; anything else with no disk fallback becomes
    /// [`CertsError::Unavailable`].
    async fn load(&self) -> Result<()> {
        let _guard = self.load_lock.lock().await;

        if let Some(path) = &self.settings.custom_ca_cert_path {
            let cert = CaCertificate::from_file(path)?;
            tracing::debug!(path = %path.display(), "Loaded CA certificate from custom path");
            *self.cert.write().await = Some(cert);
            return Ok(());
        }

        let disk_state = match CaCertificate::from_file(&self.settings.ca_cert_path) {
            Ok(cert) if !cert.expires_within(self.settings.renew_before) => {
                tracing::debug!(
                    path = %self.settings.ca_cert_path.display(),
                    not_after = %cert.not_after(),
                    "Using cached CA bundle from disk"
                );
                *self.cert.write().await = Some(cert);
                return Ok(());
            }
            Ok(_) => "cached bundle is within the renewal window".to_string(),
            Err(e) => e.to_string(),
        };

        match load_cert_from_core(&self.settings.core_url, self.settings.psk.as_deref()).await {
            Ok(cert) => {
                write_ca_bundle(
                    &cert,
                    &self.settings.ca_cert_path,
                    self.settings.include_system_roots,
                    true,
                )?;
                tracing::info!(
                    fingerprint = %cert.fingerprint(self.settings.hash_algorithm),
                    "CA certificate loaded from core"
                );
                *self.cert.write().await = Some(cert);
                Ok(())
            }
            Err(
                e @ (CertsError::Fingerprint { .. } | CertsError::NoJwt | CertsError::Jwt(_)),
            ) => Err(e),
            Err(e) => Err(CertsError::Unavailable(format!(
                "disk: {disk_state}; network: {e}"
            ))),
        }
    }

    /// Fetch and rewrite the bundle only if the certificate changed.
    /// Returns whether the certificate was replaced. Comparison is by
    /// fingerprint, so a re-encoded but identical certificate does not
    /// cause a redundant write.
    async fn refresh(&self) -> Result<bool> {
        let _guard = self.load_lock.lock().await;

        let cert =
            load_cert_from_core(&self.settings.core_url, self.settings.psk.as_deref()).await?;
        let fetched = cert.fingerprint(self.settings.hash_algorithm);
        let current = self
            .cert
            .read()
            .await
            .as_ref()
            .map(|c| c.fingerprint(self.settings.hash_algorithm));

        if current.as_deref() == Some(fetched.as_str()) {
            tracing::debug!("CA certificate unchanged, skipping bundle rewrite");
            return Ok(false);
        }

        write_ca_bundle(
            &cert,
            &self.settings.ca_cert_path,
            self.settings.include_system_roots,
            true,
        )?;
        tracing::info!(fingerprint = %fetched, "CA certificate replaced");
        *self.cert.write().await = Some(cert);
        Ok(true)
    }
}

/// Owns the CA certificate used to validate the core's TLS endpoint:
/// acquires it, verifies it against the PSK, persists it, and keeps it
/// fresh on a background task.
pub struct CertificatesHolder {
    inner: Arc<Inner>,
    started: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
    refresh_task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl CertificatesHolder {
    pub fn new(settings: CertSettings) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                settings,
                cert: RwLock::new(None),
                load_lock: Mutex::new(()),
            }),
            started: AtomicBool::new(false),
            shutdown_tx,
            refresh_task: std::sync::Mutex::new(None),
        }
    }

    /// Perform the initial load and launch the background refresh task.
    ///
    /// Fails with [`CertsError::AlreadyStarted`] on a second call. A
    /// failed load leaves the holder unstarted so the caller can retry.
    pub async fn start(&self) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(CertsError::AlreadyStarted);
        }
        if let Err(e) = self.inner.load().await {
            self.started.store(false, Ordering::SeqCst);
            return Err(e);
        }
        if self.inner.settings.custom_ca_cert_path.is_none() {
            let inner = self.inner.clone();
            let shutdown_rx = self.shutdown_tx.subscribe();
            let interval = self.inner.settings.refresh_interval;
            let handle =
                tokio::spawn(async move { run_refresh_loop(inner, interval, shutdown_rx).await });
            *self
                .refresh_task
                .lock()
                .expect("refresh task mutex poisoned") = Some(handle);
        }
        Ok(())
    }

    /// Synchronous initial load without starting the refresh task.
    pub async fn load(&self) -> Result<()> {
        self.inner.load().await
    }

    /// Force an immediate fetch-verify-write cycle outside the timer,
    /// e.g. after a TLS handshake failure against the core.
    pub async fn reload(&self) -> Result<()> {
        self.inner.refresh().await.map(|_| ())
    }

    /// Stop the background refresh task. Prompt regardless of the
    /// refresh interval, safe to call repeatedly, and leaves the
    /// persisted bundle in place for the next process.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self
            .refresh_task
            .lock()
            .expect("refresh task mutex poisoned")
            .take()
        {
            handle.abort();
        }
    }

    /// Path of the trusted bundle file, for a client's TLS config.
    pub fn ca_cert_path(&self) -> &Path {
        self.inner
            .settings
            .custom_ca_cert_path
            .as_deref()
            .unwrap_or(&self.inner.settings.ca_cert_path)
    }

    /// Fingerprint of the currently held certificate, if any.
    pub async fn current_fingerprint(&self) -> Option<String> {
        self.inner
            .cert
            .read()
            .await
            .as_ref()
            .map(|c| c.fingerprint(self.inner.settings.hash_algorithm))
    }
}

impl Drop for CertificatesHolder {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run_refresh_loop(
    inner: Arc<Inner>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick fires immediately; the initial load already ran
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = inner.refresh().await {
                    tracing::warn!(
                        error = %e,
                        "CA certificate refresh failed, keeping current certificate"
                    );
                }
            }
            _ = shutdown.changed() => {
                tracing::debug!("Certificate refresh task stopped");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::self_signed_cert;

    fn disk_backed_settings(dir: &Path, cn: &str) -> CertSettings {
        let cert = self_signed_cert(cn);
        let path = dir.join("ca.pem");
        write_ca_bundle(&cert, &path, false, true).unwrap();
        // core_url is unreachable on purpose: the cached bundle must win
        let mut settings = CertSettings::new("https://127.0.0.1:1");
        settings.ca_cert_path = path;
        settings
    }

    #[tokio::test]
    async fn test_load_prefers_unexpired_disk_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let settings = disk_backed_settings(dir.path(), "corax-disk-first");
        let holder = CertificatesHolder::new(settings);

        holder.load().await.unwrap();
        assert!(holder.current_fingerprint().await.is_some());
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let dir = tempfile::tempdir().unwrap();
        let settings = disk_backed_settings(dir.path(), "corax-twice");
        let holder = CertificatesHolder::new(settings);

        holder.start().await.unwrap();
        let err = holder.start().await.unwrap_err();
        assert!(matches!(err, CertsError::AlreadyStarted));
        holder.shutdown();
    }

    #[tokio::test]
    async fn test_failed_load_leaves_holder_unstarted() {
        let mut settings = CertSettings::new("https://127.0.0.1:1");
        settings.ca_cert_path = std::env::temp_dir().join("corax-no-such-bundle.pem");
        let _ = std::fs::remove_file(&settings.ca_cert_path);
        let holder = CertificatesHolder::new(settings);

        let err = holder.start().await.unwrap_err();
        assert!(matches!(err, CertsError::Unavailable(_)));
        // not AlreadyStarted: the failed start reset the state
        let err = holder.start().await.unwrap_err();
        assert!(matches!(err, CertsError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_custom_ca_path_is_authoritative() {
        let dir = tempfile::tempdir().unwrap();
        let cert = self_signed_cert("corax-custom");
        let custom = dir.path().join("custom.pem");
        write_ca_bundle(&cert, &custom, false, true).unwrap();

        let mut settings = CertSettings::new("https://127.0.0.1:1");
        settings.custom_ca_cert_path = Some(custom.clone());
        let holder = CertificatesHolder::new(settings);

        holder.start().await.unwrap();
        assert_eq!(holder.ca_cert_path(), custom.as_path());
        assert_eq!(
            holder.current_fingerprint().await.as_deref(),
            Some(cert.fingerprint(HashAlgorithm::Sha256).as_str())
        );
        // no refresh task was spawned for a custom path
        assert!(holder
            .refresh_task
            .lock()
            .unwrap()
            .is_none());
        holder.shutdown();
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let settings = disk_backed_settings(dir.path(), "corax-shutdown");
        let holder = CertificatesHolder::new(settings);
        holder.start().await.unwrap();
        holder.shutdown();
        holder.shutdown();
    }
}
