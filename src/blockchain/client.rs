// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Read-only JSON-RPC access to the configured chains.

use std::time::Duration;

use alloy::{
    primitives::{Address, U256},
    providers::{Provider, ProviderBuilder},
};
use async_trait::async_trait;

use super::types::ChainEndpoint;

/// Maximum length of an error message carried on a scan result.
const ERROR_TAG_MAX_LEN: usize = 120;

/// Error tag recorded when a call misses its deadline.
pub const TIMEOUT_TAG: &str = "timeout";

/// Errors that can occur while talking to a chain endpoint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RpcError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("RPC call timed out")]
    Timeout,
}

impl RpcError {
    /// Short tag stored on a failed [`crate::scanner::BalanceResult`].
    pub fn tag(&self) -> String {
        match self {
            RpcError::Timeout => TIMEOUT_TAG.to_string(),
            other => truncate(&other.to_string(), ERROR_TAG_MAX_LEN),
        }
    }
}

fn truncate(message: &str, max: usize) -> String {
    match message.char_indices().nth(max) {
        Some((idx, _)) => message[..idx].to_string(),
        None => message.to_string(),
    }
}

/// Chain RPC capability used by the scanner and the settlement planner.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Native balance of `address`, in smallest units.
    async fn get_native_balance(
        &self,
        chain: &ChainEndpoint,
        address: Address,
    ) -> Result<U256, RpcError>;

    /// Current gas price, in smallest units per gas.
    async fn get_gas_price(&self, chain: &ChainEndpoint) -> Result<U256, RpcError>;

    /// Next nonce for `address`.
    async fn get_transaction_count(
        &self,
        chain: &ChainEndpoint,
        address: Address,
    ) -> Result<u64, RpcError>;
}

/// Run an RPC future under the chain's per-call timeout.
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, RpcError>
where
    F: std::future::Future<Output = Result<T, RpcError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or(Err(RpcError::Timeout))
}

/// [`ChainRpc`] over alloy's HTTP provider.
///
/// Connections are request-scoped: a provider is built per call and dropped
/// afterwards, so nothing is shared between requests.
#[derive(Debug, Clone, Default)]
pub struct AlloyRpc;

impl AlloyRpc {
    pub fn new() -> Self {
        Self
    }

    fn connect(chain: &ChainEndpoint) -> Result<impl Provider, RpcError> {
        let url: url::Url = chain
            .rpc_url
            .parse()
            .map_err(|e: url::ParseError| RpcError::InvalidRpcUrl(e.to_string()))?;
        Ok(ProviderBuilder::new().connect_http(url))
    }
}

#[async_trait]
impl ChainRpc for AlloyRpc {
    async fn get_native_balance(
        &self,
        chain: &ChainEndpoint,
        address: Address,
    ) -> Result<U256, RpcError> {
        let provider = Self::connect(chain)?;
        provider
            .get_balance(address)
            .await
            .map_err(|e| RpcError::Rpc(e.to_string()))
    }

    async fn get_gas_price(&self, chain: &ChainEndpoint) -> Result<U256, RpcError> {
        let provider = Self::connect(chain)?;
        let price = provider
            .get_gas_price()
            .await
            .map_err(|e| RpcError::Rpc(e.to_string()))?;
        Ok(U256::from(price))
    }

    async fn get_transaction_count(
        &self,
        chain: &ChainEndpoint,
        address: Address,
    ) -> Result<u64, RpcError> {
        let provider = Self::connect(chain)?;
        provider
            .get_transaction_count(address)
            .await
            .map_err(|e| RpcError::Rpc(e.to_string()))
    }
}
