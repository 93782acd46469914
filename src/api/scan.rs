// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain catalogue and balance scan endpoints.

use axum::{extract::State, Json};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::{parse_field, resolve_chains};
use crate::{
    error::ApiError,
    models::{ChainInfo, ChainsResponse, ScanRequest, ScanResponse},
    scanner::ScanSummary,
    state::AppState,
};

/// List the configured chains.
#[utoipa::path(
    get,
    path = "/v1/chains",
    tag = "Chains",
    responses(
        (status = 200, description = "Configured chains", body = ChainsResponse)
    )
)]
pub async fn list_chains(State(state): State<AppState>) -> Json<ChainsResponse> {
    Json(ChainsResponse {
        chains: state.registry.all().iter().map(ChainInfo::from).collect(),
        default_destination: state.default_destination.clone(),
    })
}

/// Scan an address for native balances across chains.
///
/// Every requested chain appears in the response. A chain whose RPC failed or
/// timed out is reported with a zero balance and an `error` tag.
#[utoipa::path(
    post,
    path = "/v1/scan",
    tag = "Scan",
    request_body = ScanRequest,
    responses(
        (status = 200, description = "Scan completed", body = ScanResponse),
        (status = 400, description = "Invalid address or unknown chain")
    )
)]
pub async fn scan(
    State(state): State<AppState>,
    Json(request): Json<ScanRequest>,
) -> Result<Json<ScanResponse>, ApiError> {
    let address = parse_field("address", &request.address)?;
    let chains = resolve_chains(&state, request.chains.as_deref())?;

    let scan_id = Uuid::new_v4();
    info!(%scan_id, %address, chains = chains.len(), "Scan requested");

    let balances = state.scanner.scan(address, &chains).await;
    let summary = ScanSummary::from_results(&balances, &state.planner.policy().fee, &state.prices);

    Ok(Json(ScanResponse {
        scan_id,
        address: address.to_checksum(None),
        scanned_at: Utc::now(),
        balances,
        summary,
    }))
}
