// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! This module defines the request and response data structures used by
//! the REST API. All types derive `Serialize`, `Deserialize`, and `ToSchema`
//! for automatic JSON handling and OpenAPI documentation.
//!
//! Addresses arrive as strings and are validated by the handlers, so a
//! malformed address produces a descriptive `400` instead of a generic
//! deserialization failure. Amounts travel as decimal strings.
//!
//! ## Model Categories
//!
//! - **Chains**: The configured chain catalogue
//! - **Scan**: Balance scans across chains
//! - **Settlement**: Fee estimates and unsigned transaction descriptors
//! - **Sponsor**: Sponsor-signed gas top-ups

use alloy::primitives::U256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    blockchain::{types::ChainEndpoint, units::u256_decimal},
    scanner::{BalanceResult, ScanSummary},
    settlement::{ChainEstimate, ChainSettlement, SettlementSummary, SkippedChain, TransactionDescriptor},
};

// =============================================================================
// Chain Models
// =============================================================================

/// Public view of a configured chain. RPC URLs are not exposed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ChainInfo {
    /// Chain key used in requests (e.g. "base")
    pub key: String,
    pub name: String,
    pub chain_id: u64,
    pub symbol: String,
    pub decimals: u8,
    pub color: String,
    pub explorer_url: String,
}

impl From<&ChainEndpoint> for ChainInfo {
    fn from(chain: &ChainEndpoint) -> Self {
        Self {
            key: chain.key.clone(),
            name: chain.name.clone(),
            chain_id: chain.chain_id,
            symbol: chain.symbol.clone(),
            decimals: chain.decimals,
            color: chain.color.clone(),
            explorer_url: chain.explorer_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChainsResponse {
    pub chains: Vec<ChainInfo>,
    /// Destination used when a request names none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_destination: Option<String>,
}

// =============================================================================
// Scan Models
// =============================================================================

/// Request to scan an address for native balances.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScanRequest {
    /// Address to scan (0x-prefixed, EIP-55 checksum enforced for mixed case)
    pub address: String,
    /// Chain keys to scan. Omit to scan every configured chain.
    #[serde(default)]
    pub chains: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScanResponse {
    /// Identifier for log correlation
    pub scan_id: Uuid,
    /// Scanned address, checksummed
    pub address: String,
    pub scanned_at: DateTime<Utc>,
    /// One entry per requested chain, highest value first
    pub balances: Vec<BalanceResult>,
    pub summary: ScanSummary,
}

// =============================================================================
// Settlement Models
// =============================================================================

/// A balance the client already knows, in smallest units.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct SuppliedBalance {
    pub chain: String,
    #[serde(with = "u256_decimal")]
    #[schema(value_type = String)]
    pub balance_raw: U256,
}

/// Shared body of `/v1/estimate` and `/v1/prepare`.
///
/// When `balances` is omitted the selected chains are rescanned.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SettlementRequest {
    /// Address holding the dust
    pub from_address: String,
    /// Address receiving the net amounts. Required by `/v1/prepare`.
    #[serde(default)]
    pub to_address: Option<String>,
    /// Chain every balance is moved to. Omit to settle each chain on itself.
    #[serde(default)]
    pub destination_chain: Option<String>,
    /// Chains to rescan when `balances` is omitted
    #[serde(default)]
    pub chains: Option<Vec<String>>,
    #[serde(default)]
    pub balances: Option<Vec<SuppliedBalance>>,
    /// Gas was topped up by the server's sponsor; `/v1/prepare` then repays
    /// each withheld reserve to it.
    #[serde(default)]
    pub sponsored: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EstimateResponse {
    pub from_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_chain: Option<String>,
    /// Chains worth settling, in input order
    pub estimates: Vec<ChainEstimate>,
    /// Chains that could not be evaluated
    pub skipped: Vec<SkippedChain>,
    pub summary: SettlementSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PrepareResponse {
    pub from_address: String,
    pub to_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_chain: Option<String>,
    /// Descriptors grouped by source chain
    pub settlements: Vec<ChainSettlement>,
    /// Every descriptor in execution order
    pub transactions: Vec<TransactionDescriptor>,
    pub skipped: Vec<SkippedChain>,
    pub summary: SettlementSummary,
}

// =============================================================================
// Sponsor Models
// =============================================================================

/// Request sponsor-paid gas for an upcoming settlement.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SponsorTopUpRequest {
    /// Address that will sign the settlement and needs gas
    pub address: String,
    /// Destination chain of the settlement. Falls back to the configured default.
    #[serde(default)]
    pub destination_chain: Option<String>,
    /// Source chains. Omit for every configured chain.
    #[serde(default)]
    pub chains: Option<Vec<String>>,
}
