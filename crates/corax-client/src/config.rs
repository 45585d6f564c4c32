//! Client configuration.
//!
//! Loaded from `corax.toml` (the `[core]` table) or `CORAX__`
//! environment variables, with defaults matching a local core.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use corax_certs::{CertSettings, HashAlgorithm};

/// Top-level client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the coraxcore instance.
    #[serde(default = "default_core_url")]
    pub core_url: String,

    /// Pre-shared key for authentication and certificate verification.
    #[serde(default)]
    pub psk: Option<String>,

    /// Whether to verify the core's TLS certificate at all.
    #[serde(default = "default_true")]
    pub verify: bool,

    /// Pre-provisioned CA certificate; disables fetch and refresh.
    #[serde(default)]
    pub custom_ca_cert_path: Option<PathBuf>,

    /// Where the fetched CA bundle is persisted.
    #[serde(default)]
    pub ca_cert_path: Option<PathBuf>,

    /// Renew the certificate this many seconds before it expires.
    #[serde(default = "default_renew_before")]
    pub renew_before_secs: u64,

    /// Background certificate refresh cadence in seconds.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Append the platform trust store to the CA bundle.
    #[serde(default)]
    pub include_system_roots: bool,

    /// Fingerprint algorithm for certificate change detection.
    #[serde(default)]
    pub hash_algorithm: HashAlgorithm,

    /// Extra headers sent with every request.
    #[serde(default)]
    pub additional_headers: BTreeMap<String, String>,
}

impl ClientConfig {
    pub fn new(core_url: impl Into<String>) -> Self {
        Self {
            core_url: core_url.into(),
            ..Self::default()
        }
    }

    /// Load from `{file_prefix}.toml` and `CORAX__` env vars; missing
    /// sources fall back to defaults.
    pub fn load(file_prefix: &str) -> Result<Self, config::ConfigError> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("CORAX")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        match cfg.get::<ClientConfig>("core") {
            Ok(c) => Ok(c),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Certificate holder settings derived from this config.
    pub fn cert_settings(&self) -> CertSettings {
        let mut settings = CertSettings::new(self.core_url.clone());
        settings.psk = self.psk.clone();
        settings.custom_ca_cert_path = self.custom_ca_cert_path.clone();
        if let Some(path) = &self.ca_cert_path {
            settings.ca_cert_path = path.clone();
        }
        settings.renew_before = Duration::from_secs(self.renew_before_secs);
        settings.refresh_interval = Duration::from_secs(self.refresh_interval_secs);
        settings.include_system_roots = self.include_system_roots;
        settings.hash_algorithm = self.hash_algorithm;
        settings
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            core_url: default_core_url(),
            psk: None,
            verify: true,
            custom_ca_cert_path: None,
            ca_cert_path: None,
            renew_before_secs: default_renew_before(),
            refresh_interval_secs: default_refresh_interval(),
            include_system_roots: false,
            hash_algorithm: HashAlgorithm::default(),
            additional_headers: BTreeMap::new(),
        }
    }
}

fn default_core_url() -> String {
    "https://localhost:8900".to_string()
}

fn default_true() -> bool {
    true
}

fn default_renew_before() -> u64 {
    24 * 3600
}

fn default_refresh_interval() -> u64 {
    3600
}
