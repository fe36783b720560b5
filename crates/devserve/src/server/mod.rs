//! HTTP/HTTPS server bootstrap.
//!
//! # Responsibilities
//! - Negotiate the transport and bind the port that belongs to it.
//! - Serve the root directory until SIGINT/SIGTERM.
//! - Delete the temporary certificate files once an HTTPS session ends.

pub mod handlers;
pub mod listing;
pub mod middleware;
pub mod router;
pub mod state;
pub mod tls;
pub mod transport;

use std::{future::Future, net::SocketAddr};

use anyhow::{Context, Result};
use axum::{extract::Request, Router};
use hyper::body::Incoming;
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto,
};
use tokio::{
    net::{TcpListener, TcpStream},
    task::JoinSet,
};
use tokio_rustls::TlsAcceptor;
use tower::ServiceExt;
use tracing::{debug, error, info, warn};

use crate::cli::Mode;
use crate::config::Config;
use state::AppState;
use transport::Transport;

/// Negotiate, bind and serve until the process is interrupted.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
/// Certificate problems never surface here; they fall back to HTTP.
pub async fn run(cfg: &Config, mode: Mode) -> Result<()> {
    let transport = Transport::negotiate(mode, &cfg.cert());
    debug!(%mode, tls = transport.is_tls(), "transport negotiated");
    serve(cfg, transport, shutdown_signal()).await
}

/// Bind the transport's port and serve until `shutdown` resolves.
///
/// In HTTPS mode the certificate files are removed after the loop ends,
/// whether it ended cleanly or not.
pub async fn serve<F>(cfg: &Config, transport: Transport, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = SocketAddr::new(cfg.bind_addr, transport.port(cfg));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let router = router::build(AppState::new(cfg.root.clone()));

    match transport {
        Transport::Http => {
            info!(%addr, "Starting HTTP server at http://localhost:{}/", addr.port());
            info!("Note: camera access may be blocked over plain HTTP in some browsers");

            let served = serve_http(listener, router, shutdown).await;
            info!("HTTP server stopped");
            served
        }
        Transport::Https { acceptor, cert } => {
            info!(%addr, "Starting HTTPS server at https://localhost:{}/", addr.port());
            info!(
                cert = %cert.cert_path().display(),
                "Note: you may need to accept the self-signed certificate in your browser"
            );

            let served = serve_https(listener, acceptor, router, shutdown).await;
            info!("HTTPS server stopped");
            if let Err(e) = cert.close() {
                warn!(error = %e, "failed to clean up certificate files");
            }
            served
        }
    }
}

/// Serve plain HTTP with graceful shutdown.
pub async fn serve_http<F>(listener: TcpListener, router: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")
}

/// Accept loop: complete a TLS handshake on each connection and serve HTTP
/// over the decrypted stream.
///
/// Handshake and connection errors are logged and only affect that
/// connection. Open connections are aborted once `shutdown` resolves.
pub async fn serve_https<F>(
    listener: TcpListener,
    acceptor: TlsAcceptor,
    router: Router,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            () = &mut shutdown => break,
            accepted = listener.accept() => {
                let (tcp, peer_addr) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!(error = %e, "accept error");
                        continue;
                    }
                };
                debug!(%peer_addr, "accepted TCP connection");
                let acceptor = acceptor.clone();
                let router = router.clone();
                connections.spawn(async move {
                    if let Err(e) = serve_tls_connection(tcp, acceptor, router).await {
                        let error = format!("{e:#}");
                        debug!(%peer_addr, %error, "connection closed with error");
                    }
                });
            }
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    connections.shutdown().await;
    Ok(())
}

async fn serve_tls_connection(
    tcp: TcpStream,
    acceptor: TlsAcceptor,
    router: Router,
) -> Result<()> {
    let stream = acceptor.accept(tcp).await.context("TLS handshake failed")?;

    let service = hyper::service::service_fn(move |request: Request<Incoming>| {
        router.clone().oneshot(request)
    });

    auto::Builder::new(TokioExecutor::new())
        .serve_connection_with_upgrades(TokioIo::new(stream), service)
        .await
        .map_err(|e| anyhow::anyhow!("failed to serve connection: {e}"))
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
