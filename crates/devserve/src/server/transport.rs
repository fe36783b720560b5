//! Transport negotiation: decide between HTTPS and HTTP before binding.
//!
//! HTTPS setup either completes fully (certificate provisioned, loaded and
//! wrapped in an acceptor) or is abandoned in favour of plain HTTP. There is
//! no partially-initialised state and HTTPS is never retried.

use anyhow::Result;
use tokio_rustls::TlsAcceptor;
use tracing::{error, warn};

use super::tls;
use crate::cert::{self, CertConfig, ProvisionedCert};
use crate::cli::Mode;
use crate::config::Config;

/// The negotiated way of serving connections.
pub enum Transport {
    /// Plain HTTP, either requested or as the fallback.
    Http,
    /// TLS-ready. `cert` owns the temporary PEM files for as long as the
    /// server runs.
    Https {
        acceptor: TlsAcceptor,
        cert: ProvisionedCert,
    },
}

impl Transport {
    /// Resolve the requested mode into a transport, provisioning a fresh
    /// self-signed certificate for HTTPS.
    pub fn negotiate(mode: Mode, cert_cfg: &CertConfig) -> Self {
        Self::negotiate_with(mode, || Ok(cert::provision(cert_cfg)?))
    }

    /// Like [`Transport::negotiate`], with the certificate source supplied by
    /// the caller.
    pub fn negotiate_with<F>(mode: Mode, provision: F) -> Self
    where
        F: FnOnce() -> Result<ProvisionedCert>,
    {
        if mode == Mode::Http {
            return Transport::Http;
        }

        match prepare_tls(provision) {
            Ok(transport) => transport,
            Err(e) => {
                error!(error = %format!("{e:#}"), "error starting HTTPS server");
                warn!("falling back to HTTP server");
                Transport::Http
            }
        }
    }

    pub fn is_tls(&self) -> bool {
        matches!(self, Transport::Https { .. })
    }

    /// Port this transport listens on.
    pub fn port(&self, cfg: &Config) -> u16 {
        match self {
            Transport::Http => cfg.http_port,
            Transport::Https { .. } => cfg.https_port,
        }
    }
}

/// On error the provisioned files, if any, are dropped and thereby deleted.
fn prepare_tls<F>(provision: F) -> Result<Transport>
where
    F: FnOnce() -> Result<ProvisionedCert>,
{
    let cert = provision()?;
    let config = tls::load_server_config(cert.cert_path(), cert.key_path())?;
    Ok(Transport::Https {
        acceptor: TlsAcceptor::from(config),
        cert,
    })
}
