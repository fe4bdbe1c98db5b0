//! hostgate gateway binary.
//!
//! - Proxy listener: every request is authorized against the allowlist, then
//!   forwarded (forward-proxy or reverse-proxy mode).
//! - Ops listener: /healthz, /readyz, /metrics
//! - Config path: first CLI argument, default `hostgate.yaml`

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::process::ExitCode;

use tracing_subscriber::{fmt, EnvFilter};

use hostgate_core::error::{HostGateError, Result};
use hostgate_gateway::{app_state, config, router};

#[tokio::main]
async fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(severity = "critical", kind = e.kind().as_str(), error = %e, "hostgate failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "hostgate.yaml".to_string());
    let cfg = config::load_from_file(&path)?;

    let listen = parse_addr("gateway.listen", &cfg.gateway.listen)?;
    let ops_listen = parse_addr("gateway.ops_listen", &cfg.gateway.ops_listen)?;

    let state = app_state::AppState::new(cfg)?;
    let app = router::build_router(state.clone());
    let ops_app = router::build_ops_router(state.clone());

    let listener = bind(listen).await?;
    let ops_listener = bind(ops_listen).await?;
    tracing::info!(%listen, %ops_listen, "hostgate starting");

    let proxy = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());
    let ops = axum::serve(ops_listener, ops_app).with_graceful_shutdown(shutdown_signal());

    let served = tokio::try_join!(proxy.into_future(), ops.into_future());
    state.shutdown();
    served.map_err(|e| HostGateError::Internal(format!("server failed: {e}")))?;

    tracing::info!("hostgate stopped");
    Ok(())
}

fn parse_addr(field: &str, raw: &str) -> Result<SocketAddr> {
    raw.parse()
        .map_err(|_| HostGateError::Config(format!("{field} must be a valid SocketAddr")))
}

async fn bind(addr: SocketAddr) -> Result<tokio::net::TcpListener> {
    tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| HostGateError::Internal(format!("failed to bind {addr}: {e}")))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
