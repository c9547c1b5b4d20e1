//! Process setup shared by both binaries.
use std::net::SocketAddr;

use salvo::prelude::*;
use salvo::server::ServerHandle;
use tokio::signal;
use tracing_subscriber::EnvFilter;

/// Log to stdout, filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Serve `service` on `addr` until Ctrl+C or SIGTERM, then drain in-flight requests.
pub async fn serve(service: Service, addr: SocketAddr) {
    let acceptor = TcpListener::new(addr).bind().await;
    let server = Server::new(acceptor);
    tokio::spawn(listen_shutdown_signal(server.handle()));
    tracing::info!(%addr, "listening");
    server.serve(service).await;
}

async fn listen_shutdown_signal(handle: ServerHandle) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = ?e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = ?e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("ctrl_c signal received"),
        _ = terminate => tracing::info!("terminate signal received"),
    };
    handle.stop_graceful(None);
}
