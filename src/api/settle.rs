// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Settlement estimate and transaction preparation endpoints.

use alloy::primitives::Address;
use axum::{extract::State, Json};
use tracing::info;

use super::{parse_field, resolve_chains, resolve_destination};
use crate::{
    blockchain::types::{ChainEndpoint, UnknownChain},
    error::{ApiError, ValidationError},
    models::{EstimateResponse, PrepareResponse, SettlementRequest, SuppliedBalance},
    scanner::BalanceResult,
    state::AppState,
};

/// Validated settlement input. Built before any network call.
struct Plan {
    from: Address,
    destination: Option<ChainEndpoint>,
    source: BalanceSource,
}

enum BalanceSource {
    Supplied(Vec<BalanceResult>),
    Rescan(Vec<ChainEndpoint>),
}

impl Plan {
    fn validate(state: &AppState, request: &SettlementRequest) -> Result<Self, ValidationError> {
        let from = parse_field("from_address", &request.from_address)?;
        let destination = resolve_destination(state, request.destination_chain.as_deref())?;
        let source = match &request.balances {
            Some(balances) => BalanceSource::Supplied(supplied_balances(state, balances)?),
            None => BalanceSource::Rescan(resolve_chains(state, request.chains.as_deref())?),
        };
        Ok(Self {
            from,
            destination,
            source,
        })
    }

    async fn balances(self, state: &AppState) -> (Address, Option<ChainEndpoint>, Vec<BalanceResult>) {
        let balances = match self.source {
            BalanceSource::Supplied(balances) => balances,
            BalanceSource::Rescan(chains) => state.scanner.scan(self.from, &chains).await,
        };
        (self.from, self.destination, balances)
    }
}

fn supplied_balances(
    state: &AppState,
    supplied: &[SuppliedBalance],
) -> Result<Vec<BalanceResult>, ValidationError> {
    let mut balances: Vec<BalanceResult> = Vec::with_capacity(supplied.len());
    for entry in supplied {
        let chain = state
            .chain(entry.chain.trim())
            .ok_or_else(|| UnknownChain(entry.chain.clone()))?;
        if balances.iter().any(|b| b.chain == chain.key) {
            return Err(ValidationError::DuplicateBalance(chain.key.clone()));
        }
        balances.push(BalanceResult::from_raw(chain, entry.balance_raw, &state.prices));
    }
    if balances.is_empty() {
        return Err(ValidationError::NoChains);
    }
    Ok(balances)
}

/// Estimate gas, fee and net amount per chain.
///
/// Chains whose balance cannot cover gas and fee are left out. Chains whose gas
/// price lookup failed are listed under `skipped`.
#[utoipa::path(
    post,
    path = "/v1/estimate",
    tag = "Settlement",
    request_body = SettlementRequest,
    responses(
        (status = 200, description = "Per-chain estimates", body = EstimateResponse),
        (status = 400, description = "Invalid address or unknown chain")
    )
)]
pub async fn estimate(
    State(state): State<AppState>,
    Json(request): Json<SettlementRequest>,
) -> Result<Json<EstimateResponse>, ApiError> {
    let plan = Plan::validate(&state, &request)?;
    let (from, destination, balances) = plan.balances(&state).await;

    let estimate = state.planner.estimate(&balances, destination.as_ref()).await;

    Ok(Json(EstimateResponse {
        from_address: from.to_checksum(None),
        destination_chain: destination.map(|c| c.key),
        estimates: estimate.estimates,
        skipped: estimate.skipped,
        summary: estimate.summary,
    }))
}

/// Build unsigned transaction descriptors for every viable chain.
///
/// Each chain yields a fee transfer followed by either a direct transfer or a
/// bridge call. A failed bridge quote falls back to a direct transfer noted
/// `"fallback"`. Sponsored requests add a reimbursement of the gas reserve to
/// the sponsor wallet.
#[utoipa::path(
    post,
    path = "/v1/prepare",
    tag = "Settlement",
    request_body = SettlementRequest,
    responses(
        (status = 200, description = "Unsigned transaction descriptors", body = PrepareResponse),
        (status = 400, description = "Invalid address or unknown chain"),
        (status = 503, description = "Sponsoring requested but not configured")
    )
)]
pub async fn prepare(
    State(state): State<AppState>,
    Json(request): Json<SettlementRequest>,
) -> Result<Json<PrepareResponse>, ApiError> {
    let to_raw = request
        .to_address
        .as_deref()
        .ok_or(ValidationError::Missing { field: "to_address" })?;
    let to = parse_field("to_address", to_raw)?;
    let sponsor = match (request.sponsored, &state.sponsor) {
        (false, _) => None,
        (true, Some(sponsor)) => Some(sponsor.address()),
        (true, None) => {
            return Err(ApiError::service_unavailable(
                "Sponsored gas is not configured on this server",
            ))
        }
    };
    let plan = Plan::validate(&state, &request)?;
    let (from, destination, balances) = plan.balances(&state).await;

    let prepared = state
        .planner
        .prepare(&balances, destination.as_ref(), from, to, sponsor)
        .await;
    let transactions = prepared.transactions();

    info!(
        from = %from,
        to = %to,
        sponsored = sponsor.is_some(),
        chains = prepared.settlements.len(),
        transactions = transactions.len(),
        "Prepared settlement"
    );

    Ok(Json(PrepareResponse {
        from_address: from.to_checksum(None),
        to_address: to.to_checksum(None),
        destination_chain: destination.map(|c| c.key),
        settlements: prepared.settlements,
        transactions,
        skipped: prepared.skipped,
        summary: prepared.summary,
    }))
}
