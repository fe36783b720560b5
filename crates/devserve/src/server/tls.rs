//! rustls server configuration from PEM material.
//!
//! The certificate and key come from [`crate::cert`], which writes them to
//! temporary files; this module reads those files back and builds the
//! `rustls::ServerConfig` the HTTPS listener wraps its sockets with.

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use rustls::{crypto::ring, ServerConfig};

/// Load a [`rustls::ServerConfig`] from PEM certificate and key files.
///
/// # Errors
///
/// Returns an error if either file cannot be read or the material is rejected
/// by [`build_server_config`].
pub fn load_server_config(cert_path: &Path, key_path: &Path) -> Result<Arc<ServerConfig>> {
    let cert_pem = std::fs::read(cert_path)
        .with_context(|| format!("failed to read certificate {}", cert_path.display()))?;
    let key_pem = std::fs::read(key_path)
        .with_context(|| format!("failed to read private key {}", key_path.display()))?;
    build_server_config(&cert_pem, &key_pem)
}

/// Build a [`rustls::ServerConfig`] from PEM-encoded certificate and private key bytes.
///
/// ALPN advertises HTTP/2 and HTTP/1.1.
///
/// # Errors
///
/// Returns an error if the certificate or key cannot be parsed, if the key
/// does not match the certificate, or if rustls rejects the configuration.
pub fn build_server_config(cert_pem: &[u8], key_pem: &[u8]) -> Result<Arc<ServerConfig>> {
    let certs = rustls_pemfile::certs(&mut std::io::BufReader::new(cert_pem))
        .collect::<Result<Vec<_>, _>>()
        .context("failed to parse TLS certificate chain")?;
    if certs.is_empty() {
        anyhow::bail!("no certificate found in PEM data");
    }

    let key = rustls_pemfile::private_key(&mut std::io::BufReader::new(key_pem))
        .context("failed to read TLS private key")?
        .context("no private key found in PEM data")?;

    let mut config = ServerConfig::builder_with_provider(Arc::new(ring::default_provider()))
        .with_safe_default_protocol_versions()
        .context("failed to select TLS protocol versions")?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .context("failed to build rustls ServerConfig")?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(Arc::new(config))
}
