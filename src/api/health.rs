// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Health check response with a summary of the loaded configuration.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall health status.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Number of configured chains.
    pub chains: usize,
    /// Destination used when a request names none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_destination: Option<String>,
    /// Whether sponsored gas top-ups are available.
    pub sponsor_enabled: bool,
    /// Sponsor wallet address, when enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sponsor_address: Option<String>,
}

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Health check endpoint handler.
///
/// Configuration is validated at startup, so a running service is healthy.
/// The body reports what was loaded.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = ReadyResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<ReadyResponse> {
    Json(ReadyResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        chains: state.registry.len(),
        default_destination: state.default_destination.clone(),
        sponsor_enabled: state.sponsor.is_some(),
        sponsor_address: state.sponsor.as_ref().map(|s| s.address().to_checksum(None)),
    })
}

/// Liveness probe handler.
///
/// Always returns 200 if the process is running.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
