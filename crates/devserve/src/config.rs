//! Configuration loading and validation.
//!
//! Every value has a default, so `devserve` runs with an empty environment.
//! Overrides are read from `DEVSERVE_*` environment variables at startup; the
//! process exits with a clear error message if any of them is invalid.

use std::{
    net::{IpAddr, Ipv4Addr},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::cert::CertConfig;

/// Longest certificate lifetime browsers still accept for a leaf certificate.
const MAX_CERT_VALIDITY_DAYS: u32 = 825;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Validated server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Port the plain HTTP server listens on.
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Port the HTTPS server listens on.
    #[serde(default = "default_https_port")]
    pub https_port: u16,

    /// Interface to bind. Defaults to all IPv4 interfaces.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: IpAddr,

    /// Directory tree to serve. Canonicalised by [`Config::from_env`].
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Lifetime of the generated self-signed certificate.
    #[serde(default = "default_cert_validity_days")]
    pub cert_validity_days: u32,

    /// Subject alternative names of the generated certificate.
    #[serde(default = "default_cert_hostnames")]
    pub cert_hostnames: Vec<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`). `RUST_LOG` wins if set.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_http_port() -> u16 {
    8000
}
fn default_https_port() -> u16 {
    8443
}
fn default_bind_addr() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}
fn default_root() -> PathBuf {
    PathBuf::from(".")
}
fn default_cert_validity_days() -> u32 {
    7
}
fn default_cert_hostnames() -> Vec<String> {
    vec!["localhost".into(), "127.0.0.1".into(), "::1".into()]
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            https_port: default_https_port(),
            bind_addr: default_bind_addr(),
            root: default_root(),
            cert_validity_days: default_cert_validity_days(),
            cert_hostnames: default_cert_hostnames(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed, fails validation, or
    /// `DEVSERVE_ROOT` does not name an existing directory.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("DEVSERVE")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cert_hostnames"),
            )
            .build()
            .context("failed to build configuration from environment")?;

        let mut c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        c.root = canonical_root(&c.root)?;
        Ok(c)
    }

    /// Parameters for the self-signed certificate provisioner.
    pub fn cert(&self) -> CertConfig {
        CertConfig {
            hostnames: self.cert_hostnames.clone(),
            validity_days: self.cert_validity_days,
        }
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        if self.http_port == 0 {
            anyhow::bail!("DEVSERVE_HTTP_PORT must be > 0");
        }
        if self.https_port == 0 {
            anyhow::bail!("DEVSERVE_HTTPS_PORT must be > 0");
        }
        if !(1..=MAX_CERT_VALIDITY_DAYS).contains(&self.cert_validity_days) {
            anyhow::bail!(
                "DEVSERVE_CERT_VALIDITY_DAYS must be between 1 and {MAX_CERT_VALIDITY_DAYS}"
            );
        }
        if self.cert_hostnames.is_empty() {
            anyhow::bail!("DEVSERVE_CERT_HOSTNAMES must list at least one name");
        }
        if self.cert_hostnames.iter().any(|h| h.trim().is_empty()) {
            anyhow::bail!("DEVSERVE_CERT_HOSTNAMES must not contain blank entries");
        }
        Ok(())
    }
}

/// Resolve the served root to an absolute path, symlinks included, so that
/// request paths can later be checked against it with a prefix comparison.
fn canonical_root(root: &Path) -> Result<PathBuf> {
    let canonical = std::fs::canonicalize(root)
        .with_context(|| format!("DEVSERVE_ROOT {} does not exist", root.display()))?;
    if !canonical.is_dir() {
        anyhow::bail!("DEVSERVE_ROOT {} is not a directory", root.display());
    }
    Ok(canonical)
}
