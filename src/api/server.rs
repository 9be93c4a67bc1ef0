use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::errors::{Error, Result};

use super::routes::{build_router, ApiState};

/// Bind the configured address and serve until Ctrl-C.
pub async fn start_api_server(state: ApiState) -> Result<()> {
    let bind_address = state.config.server.bind_address();
    let addr: SocketAddr = bind_address
        .parse()
        .map_err(|e| Error::config(format!("Invalid API address '{}': {}", bind_address, e)))?;

    let router: Router = build_router(state);

    let listener = TcpListener::bind(addr).await.map_err(|e| Error::Io {
        source: e,
        context: format!("Failed to bind API server to {}", addr),
    })?;

    info!(address = %addr, "Starting HTTP API server");
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "API server shutdown listener failed");
            }
        })
        .await
        .map_err(|e| Error::Io { source: e, context: "API server error".to_string() })?;

    info!("API server shutdown completed");
    Ok(())
}
