use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))
}

/// Serves `router` on `listener` until `cancel` fires.
pub async fn serve(
    name: &'static str,
    listener: TcpListener,
    router: Router,
    cancel: CancellationToken,
) -> Result<()> {
    let addr = listener.local_addr()?;
    info!("{name} server running on http://{addr}");

    let shutdown = async move {
        cancel.cancelled().await;
        info!("{name} server shutting down");
    };

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .with_context(|| format!("{name} server failed"))
}

/// Cancels the returned token on Ctrl-C.
pub fn shutdown_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl-C");
                token.cancel();
            }
            Err(e) => warn!(error = %e, "unable to listen for Ctrl-C"),
        }
    });
    cancel
}

/// A bound listener and the router it serves.
pub struct Endpoint {
    pub name: &'static str,
    pub listener: TcpListener,
    pub router: Router,
}

/// Serves two endpoints side by side.
///
/// Whichever stops first, by error or cancellation, cancels `cancel` so the
/// other drains and stops too.
pub async fn serve_both(
    first: Endpoint,
    second: Endpoint,
    cancel: CancellationToken,
) -> Result<()> {
    let run = |endpoint: Endpoint| {
        let cancel = cancel.clone();
        async move {
            let result =
                serve(endpoint.name, endpoint.listener, endpoint.router, cancel.clone()).await;
            cancel.cancel();
            result
        }
    };
    let (first, second) = tokio::join!(run(first), run(second));
    first.and(second)
}
