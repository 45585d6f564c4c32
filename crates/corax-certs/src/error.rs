//! Error types for the corax-certs crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CertsError {
    #[error("Failed to parse certificate: {0}")]
    Parse(String),

    #[error("PSK is configured but the core provided no JWT proof")]
    NoJwt,

    #[error("CA certificate fingerprint mismatch: expected {expected}, got {actual}")]
    Fingerprint { expected: String, actual: String },

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("CA certificate unavailable: {0}")]
    Unavailable(String),

    #[error("Certificates holder is already started")]
    AlreadyStarted,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CertsError>;
