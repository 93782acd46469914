// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sponsored gas top-up endpoint.

use axum::{extract::State, Json};

use super::{parse_field, resolve_chains, resolve_destination};
use crate::{
    error::{ApiError, ValidationError},
    models::SponsorTopUpRequest,
    sponsor::SponsorPlan,
    state::AppState,
};

/// Sign gas top-ups from the sponsor wallet to `address`.
///
/// One transfer per source chain that differs from the destination, each
/// worth that chain's gas reserve. Transactions are returned signed but not
/// broadcast.
#[utoipa::path(
    post,
    path = "/v1/sponsor/top-ups",
    tag = "Sponsor",
    request_body = SponsorTopUpRequest,
    responses(
        (status = 200, description = "Signed top-up transactions", body = SponsorPlan),
        (status = 400, description = "Invalid address, unknown chain or missing destination"),
        (status = 503, description = "Sponsoring is not configured")
    )
)]
pub async fn sponsor_top_ups(
    State(state): State<AppState>,
    Json(request): Json<SponsorTopUpRequest>,
) -> Result<Json<SponsorPlan>, ApiError> {
    let Some(sponsor) = state.sponsor.clone() else {
        return Err(ApiError::service_unavailable(
            "Sponsored gas is not configured on this server",
        ));
    };

    let address = parse_field("address", &request.address)?;
    let destination = resolve_destination(&state, request.destination_chain.as_deref())?
        .ok_or(ValidationError::Missing {
            field: "destination_chain",
        })?;
    let sources = resolve_chains(&state, request.chains.as_deref())?;

    Ok(Json(sponsor.top_ups(address, &sources, &destination).await))
}
