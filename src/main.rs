// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use dust_sweeper::{
    api::router,
    blockchain::AlloyRpc,
    config::{LogFormat, ServiceConfig, DEFAULT_LOG_FILTER},
    providers::bridge::HttpBridgeQuoter,
    state::AppState,
};
use tokio::net::TcpListener;
use tracing::{error, info};

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));

    match LogFormat::from_env() {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(env_filter)
            .init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = ServiceConfig::from_env().inspect_err(|e| error!(error = %e, "Invalid configuration"))?;
    let quoter = HttpBridgeQuoter::new(config.bridge.clone())?;
    let state = AppState::new(&config, Arc::new(AlloyRpc::new()), Arc::new(quoter));

    info!(
        chains = config.chains.len(),
        fee_policy = ?config.fee.policy,
        fee_wallet = %config.fee_wallet,
        default_destination = ?config.default_destination,
        sponsor = config.sponsor.is_some(),
        "Configuration loaded"
    );

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr).await?;
    info!("Dust sweeper listening on http://{addr} (docs at /docs)");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
