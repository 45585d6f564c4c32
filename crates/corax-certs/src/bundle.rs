//! CA bundle rendering and atomic on-disk persistence.
//!
//! A bundle is a PEM file with issuer/subject/serial/fingerprint
//! comment lines ahead of the certificate block, optionally prefixed
//! with the platform trust store so a single file can serve as the
//! complete trust root for an HTTP client.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::cert::{der_to_pem, CaCertificate, HashAlgorithm};
use crate::error::{CertsError, Result};

/// Render the bundle text for a certificate.
///
/// With `include_system_roots`, the platform's native trust store is
/// prepended, making the bundle a drop-in replacement for the default
/// CA file.
pub fn render_ca_bundle(cert: &CaCertificate, include_system_roots: bool) -> String {
    let mut out = String::new();
    if include_system_roots {
        let roots = rustls_native_certs::load_native_certs();
        for err in &roots.errors {
            tracing::warn!(error = %err, "Skipping unreadable platform trust root");
        }
        for root in &roots.certs {
            out.push_str(&der_to_pem(root.as_ref()));
        }
        out.push('\n');
    }
    out.push_str(&format!("# Issuer: {}\n", cert.issuer()));
    out.push_str(&format!("# Subject: {}\n", cert.subject()));
    if let Some(label) = cert.issuer_cn() {
        out.push_str(&format!("# Label: {label}\n"));
    }
    out.push_str(&format!("# Serial: {}\n", cert.serial()));
    out.push_str(&format!(
        "# SHA256 Fingerprint: {}\n",
        cert.fingerprint(HashAlgorithm::Sha256)
    ));
    out.push_str(&cert.to_pem());
    out
}

/// Write the bundle for `cert` to `path`.
///
/// With `atomic` set, the bundle is written to a temp file in the
/// target directory and moved into place with a rename, so a reader
/// opening the path mid-write sees either the old file or the new one,
/// never a truncated one. On Unix the file is restricted to the owner.
pub fn write_ca_bundle(
    cert: &CaCertificate,
    path: &Path,
    include_system_roots: bool,
    atomic: bool,
) -> Result<()> {
    let text = render_ca_bundle(cert, include_system_roots);
    if atomic {
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
        let mut tmp = match dir {
            Some(dir) => tempfile::NamedTempFile::new_in(dir)?,
            None => tempfile::NamedTempFile::new()?,
        };
        tmp.write_all(text.as_bytes())?;
        tmp.flush()?;
        restrict_permissions(tmp.path())?;
        tmp.persist(path)
            .map_err(|e| CertsError::Io(e.error))?;
    } else {
        fs::write(path, &text)?;
        restrict_permissions(path)?;
    }
    tracing::debug!(path = %path.display(), "CA bundle written");
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
