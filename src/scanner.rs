// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Balance Scanner
//!
//! Fans out one native-balance query per selected chain with bounded
//! concurrency. Each query runs under the earlier of its chain's per-call
//! timeout and the scan-wide deadline. A chain that fails or runs out of time
//! still yields a result: zero balance plus an error tag. The output therefore
//! always has one entry per requested chain.

use std::{cmp::Ordering, sync::Arc, time::Duration};

use alloy::primitives::{Address, U256};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::{
    blockchain::{
        client::{ChainRpc, RpcError},
        types::{ChainEndpoint, PriceTable},
        units::{format_amount, u256_decimal},
    },
    fees::{split, FeeConfig},
};

/// Default number of chains queried at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// Default deadline for a whole scan.
pub const DEFAULT_SCAN_DEADLINE: Duration = Duration::from_secs(20);

/// Outcome of scanning one chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BalanceResult {
    /// Chain key
    pub chain: String,
    /// Chain display name
    pub name: String,
    /// EIP-155 chain ID
    pub chain_id: u64,
    /// Native currency symbol
    pub symbol: String,
    /// Native currency decimals
    pub decimals: u8,
    /// Balance in smallest units (decimal string)
    #[serde(with = "u256_decimal")]
    #[schema(value_type = String)]
    pub balance_raw: U256,
    /// Balance in whole units, for display
    pub balance: String,
    /// Approximate USD value, when the symbol has a price
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_usd: Option<f64>,
    /// "timeout" or a truncated RPC error when the query failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BalanceResult {
    /// Successful result for `chain`.
    pub fn from_raw(chain: &ChainEndpoint, raw: U256, prices: &PriceTable) -> Self {
        Self {
            chain: chain.key.clone(),
            name: chain.name.clone(),
            chain_id: chain.chain_id,
            symbol: chain.symbol.clone(),
            decimals: chain.decimals,
            balance_raw: raw,
            balance: format_amount(raw, chain.decimals),
            balance_usd: prices.usd_value(&chain.symbol, chain.decimals, raw),
            error: None,
        }
    }

    /// Zero-balance result tagged with the failure.
    pub fn failed(chain: &ChainEndpoint, tag: String) -> Self {
        Self {
            chain: chain.key.clone(),
            name: chain.name.clone(),
            chain_id: chain.chain_id,
            symbol: chain.symbol.clone(),
            decimals: chain.decimals,
            balance_raw: U256::ZERO,
            balance: "0".to_string(),
            balance_usd: None,
            error: Some(tag),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Presentation order: valued results by descending USD, then unvalued
/// results by descending raw balance, ties broken by chain key.
pub fn compare_results(a: &BalanceResult, b: &BalanceResult) -> Ordering {
    let by_value = match (a.balance_usd, b.balance_usd) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.balance_raw.cmp(&a.balance_raw),
    };
    by_value.then_with(|| a.chain.cmp(&b.chain))
}

/// Scanner tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub max_concurrency: usize,
    pub deadline: Duration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            deadline: DEFAULT_SCAN_DEADLINE,
        }
    }
}

pub struct BalanceScanner {
    rpc: Arc<dyn ChainRpc>,
    prices: Arc<PriceTable>,
    options: ScanOptions,
}

impl BalanceScanner {
    pub fn new(rpc: Arc<dyn ChainRpc>, prices: Arc<PriceTable>, options: ScanOptions) -> Self {
        Self {
            rpc,
            prices,
            options,
        }
    }

    /// Scan `address` on every chain in `chains`.
    ///
    /// `chains` must already be resolved against the registry; the scanner
    /// performs no validation of its own.
    pub async fn scan(&self, address: Address, chains: &[ChainEndpoint]) -> Vec<BalanceResult> {
        let deadline = Instant::now() + self.options.deadline;
        let limit = self.options.max_concurrency.max(1);

        info!(
            address = %address,
            chains = chains.len(),
            concurrency = limit,
            "Starting balance scan"
        );

        let queries: Vec<_> = chains
            .iter()
            .map(|chain| self.scan_chain(chain, address, deadline))
            .collect();
        let mut results: Vec<BalanceResult> = stream::iter(queries)
            .buffer_unordered(limit)
            .collect()
            .await;

        results.sort_by(compare_results);

        let failed = results.iter().filter(|r| r.is_failed()).count();
        info!(
            address = %address,
            chains = results.len(),
            failed,
            "Balance scan completed"
        );

        results
    }

    async fn scan_chain(
        &self,
        chain: &ChainEndpoint,
        address: Address,
        deadline: Instant,
    ) -> BalanceResult {
        let call_deadline = deadline.min(Instant::now() + chain.timeout);
        let outcome = timeout_at(call_deadline, self.rpc.get_native_balance(chain, address))
            .await
            .unwrap_or(Err(RpcError::Timeout));

        match outcome {
            Ok(raw) => {
                debug!(chain = %chain.key, balance = %raw, "Fetched native balance");
                BalanceResult::from_raw(chain, raw, &self.prices)
            }
            Err(e) => {
                warn!(chain = %chain.key, error = %e, "Balance query failed");
                BalanceResult::failed(chain, e.tag())
            }
        }
    }
}

/// Aggregate totals over a scan, in USD.
///
/// Fee and net are what a same-chain settlement of each balance would yield.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ScanSummary {
    pub chains_scanned: usize,
    pub chains_with_balance: usize,
    pub chains_failed: usize,
    pub total_balance_usd: f64,
    pub estimated_fee_usd: f64,
    pub estimated_net_usd: f64,
}

impl ScanSummary {
    pub fn from_results(results: &[BalanceResult], fees: &FeeConfig, prices: &PriceTable) -> Self {
        let mut summary = ScanSummary {
            chains_scanned: results.len(),
            ..Default::default()
        };

        for result in results {
            if result.is_failed() {
                summary.chains_failed += 1;
                continue;
            }
            if result.balance_raw.is_zero() {
                continue;
            }
            summary.chains_with_balance += 1;

            let Some(price) = prices.price(&result.symbol, result.decimals) else {
                continue;
            };
            summary.total_balance_usd += price.usd_value(result.balance_raw);
            if let Some(split) = split(result.balance_raw, U256::ZERO, fees, Some(price)).viable() {
                summary.estimated_fee_usd += price.usd_value(split.platform_fee);
                summary.estimated_net_usd += price.usd_value(split.net_amount);
            }
        }

        summary
    }
}
