// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;

use edge_gateway::{
    api::router,
    app::{self, StartupError},
    config::GatewayConfig,
    observability::init_tracing,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match GatewayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid gateway configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(config.log_format);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Gateway stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: GatewayConfig) -> Result<(), StartupError> {
    let addr = config.bind;
    let auth_mode = config.auth_mode;
    let gateway = app::build(config)?;

    let shutdown = CancellationToken::new();
    if let Some(reloader) = gateway.reloader {
        tokio::spawn(reloader.run(shutdown.clone()));
    }

    let app = router(gateway.state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, %auth_mode, "Edge gateway listening");

    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown signal received");
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    Ok(())
}
