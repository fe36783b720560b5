//! Self-signed certificate provisioning for HTTPS mode.
//!
//! A fresh key pair and certificate are generated on every start with a short
//! validity window, then written to temporary PEM files so they can be loaded
//! by the TLS layer and imported into a browser trust store if needed. The
//! files live exactly as long as the returned [`ProvisionedCert`].

use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};

use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
use tempfile::TempPath;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info};

const COMMON_NAME: &str = "devserve localhost";

/// Errors from certificate provisioning and cleanup.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Key generation, SAN parsing, or self-signing failed.
    #[error("failed to generate self-signed certificate: {0}")]
    Generate(#[from] rcgen::Error),

    /// A temporary PEM file could not be created or written.
    #[error("failed to write temporary {what} file: {source}")]
    Write {
        what: &'static str,
        #[source]
        source: io::Error,
    },

    /// A temporary PEM file could not be deleted.
    #[error("failed to remove temporary file {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Parameters for the generated certificate.
#[derive(Debug, Clone)]
pub struct CertConfig {
    /// DNS names and IP addresses placed in the subject alternative name list.
    pub hostnames: Vec<String>,
    /// Days from now until the certificate expires.
    pub validity_days: u32,
}

impl Default for CertConfig {
    fn default() -> Self {
        Self {
            hostnames: vec!["localhost".into(), "127.0.0.1".into(), "::1".into()],
            validity_days: 7,
        }
    }
}

/// A certificate and private key on disk, in temporary PEM files.
///
/// Dropping the handle deletes both files; [`ProvisionedCert::close`] does the
/// same but reports failures.
#[derive(Debug)]
pub struct ProvisionedCert {
    cert: TempPath,
    key: TempPath,
}

impl ProvisionedCert {
    /// Write already-encoded PEM material to fresh temporary files.
    pub fn write(cert_pem: &str, key_pem: &str) -> Result<Self, ProvisionError> {
        let cert = write_temp("certificate", ".pem", cert_pem)?;
        let key = write_temp("private key", ".key", key_pem)?;
        Ok(Self { cert, key })
    }

    /// Path of the PEM-encoded certificate.
    pub fn cert_path(&self) -> &Path {
        &self.cert
    }

    /// Path of the PEM-encoded PKCS#8 private key.
    pub fn key_path(&self) -> &Path {
        &self.key
    }

    /// Delete both files.
    ///
    /// # Errors
    ///
    /// Returns the first deletion failure. The other file is still removed.
    pub fn close(self) -> Result<(), ProvisionError> {
        let Self { cert, key } = self;
        let cert_result = close_temp(cert);
        let key_result = close_temp(key);
        cert_result.and(key_result)?;
        debug!("removed temporary certificate files");
        Ok(())
    }
}

/// Generate a fresh self-signed certificate and write it to temporary files.
///
/// # Errors
///
/// Returns [`ProvisionError`] if generation fails or the files cannot be
/// written. Nothing is retried.
pub fn provision(cfg: &CertConfig) -> Result<ProvisionedCert, ProvisionError> {
    let (cert_pem, key_pem) = generate(cfg)?;
    let provisioned = ProvisionedCert::write(&cert_pem, &key_pem)?;
    info!(
        cert = %provisioned.cert_path().display(),
        key = %provisioned.key_path().display(),
        hostnames = ?cfg.hostnames,
        validity_days = cfg.validity_days,
        "generated self-signed certificate"
    );
    Ok(provisioned)
}

/// Returns `(certificate_pem, private_key_pem)`.
fn generate(cfg: &CertConfig) -> Result<(String, String), ProvisionError> {
    let mut params = CertificateParams::new(cfg.hostnames.clone())?;

    let mut name = DistinguishedName::new();
    name.push(DnType::CommonName, COMMON_NAME);
    params.distinguished_name = name;

    // Backdated a day to tolerate clock skew between server and browser.
    let now = OffsetDateTime::now_utc();
    params.not_before = now - Duration::days(1);
    params.not_after = now + Duration::days(i64::from(cfg.validity_days));

    let key_pair = KeyPair::generate()?;
    let cert = params.self_signed(&key_pair)?;
    Ok((cert.pem(), key_pair.serialize_pem()))
}

fn write_temp(
    what: &'static str,
    suffix: &str,
    contents: &str,
) -> Result<TempPath, ProvisionError> {
    let to_error = |source| ProvisionError::Write { what, source };

    let mut file = tempfile::Builder::new()
        .prefix("devserve-")
        .suffix(suffix)
        .tempfile()
        .map_err(to_error)?;
    file.write_all(contents.as_bytes()).map_err(to_error)?;
    file.flush().map_err(to_error)?;
    Ok(file.into_temp_path())
}

fn close_temp(path: TempPath) -> Result<(), ProvisionError> {
    let display = path.to_path_buf();
    path.close().map_err(|source| ProvisionError::Remove {
        path: display,
        source,
    })
}
