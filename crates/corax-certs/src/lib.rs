//! corax-certs: TLS trust bootstrap for the corax client.
//!
//! A fresh client cannot validate the core's TLS endpoint through a
//! standard CA chain, so trust is bootstrapped instead: the CA
//! certificate is fetched from the core over an unverified connection,
//! cross-checked against a fingerprint proof signed with the shared
//! PSK, persisted as a PEM bundle, and renewed on a background task
//! before it expires. The ordering is fixed: fetch, fingerprint,
//! compare, only then trust.

pub mod bundle;
pub mod cert;
pub mod error;
pub mod fetch;
pub mod holder;
pub mod jwt;

pub use bundle::{render_ca_bundle, write_ca_bundle};
pub use cert::{CaCertificate, HashAlgorithm};
pub use error::CertsError;
pub use fetch::{fetch_ca_cert, load_ca_cert, load_cert_from_core};
pub use holder::{CertSettings, CertificatesHolder};
