// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory collaborators for unit and router tests.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;

use crate::{
    blockchain::{
        client::{ChainRpc, RpcError},
        signing::LocalKeySigner,
        types::ChainEndpoint,
    },
    providers::bridge::{BridgeError, BridgeQuote, BridgeQuoter, QuoteRequest},
};

/// Well-known development key (first anvil/hardhat account).
pub const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Address derived from [`DEV_KEY`].
pub const DEV_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

/// Chain endpoint pointing at an unroutable host.
pub fn test_chain(key: &str, chain_id: u64, symbol: &str) -> ChainEndpoint {
    ChainEndpoint {
        key: key.to_string(),
        name: format!("{key} network"),
        rpc_url: format!("http://{key}.invalid"),
        chain_id,
        symbol: symbol.to_string(),
        decimals: 18,
        color: String::new(),
        explorer_url: String::new(),
        timeout: Duration::from_secs(10),
    }
}

pub fn dev_signer() -> LocalKeySigner {
    LocalKeySigner::from_hex(DEV_KEY).unwrap()
}

/// A quote as the bridge service would return it.
pub fn test_quote() -> BridgeQuote {
    BridgeQuote {
        to: Address::repeat_byte(0x1b),
        value: U256::from(945_250_000_000_000_000u64),
        data: Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]),
        gas_limit: Some(250_000),
        estimated_output: U256::from(940_000_000_000_000_000u64),
        tool: Some("stargate".to_string()),
    }
}

#[derive(Debug, Clone)]
enum Reply<T> {
    Value(T),
    Error(String),
    Hang,
}

/// Scripted [`ChainRpc`].
///
/// Unscripted balances read as zero, gas prices as 1 gwei and nonces as 0.
#[derive(Debug, Clone, Default)]
pub struct MockChainRpc {
    balances: HashMap<String, Reply<U256>>,
    gas_prices: HashMap<String, Reply<U256>>,
    nonces: HashMap<String, u64>,
}

impl MockChainRpc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(mut self, chain: &str, balance: U256) -> Self {
        self.balances.insert(chain.to_string(), Reply::Value(balance));
        self
    }

    pub fn with_error(mut self, chain: &str, message: &str) -> Self {
        self.balances
            .insert(chain.to_string(), Reply::Error(message.to_string()));
        self
    }

    /// Balance query that never completes.
    pub fn with_hang(mut self, chain: &str) -> Self {
        self.balances.insert(chain.to_string(), Reply::Hang);
        self
    }

    pub fn with_gas_price(mut self, chain: &str, price: U256) -> Self {
        self.gas_prices.insert(chain.to_string(), Reply::Value(price));
        self
    }

    pub fn with_gas_error(mut self, chain: &str, message: &str) -> Self {
        self.gas_prices
            .insert(chain.to_string(), Reply::Error(message.to_string()));
        self
    }

    /// Gas price query that never completes.
    pub fn with_gas_hang(mut self, chain: &str) -> Self {
        self.gas_prices.insert(chain.to_string(), Reply::Hang);
        self
    }

    pub fn with_nonce(mut self, chain: &str, nonce: u64) -> Self {
        self.nonces.insert(chain.to_string(), nonce);
        self
    }
}

async fn reply<T: Clone>(scripted: Option<&Reply<T>>, default: T) -> Result<T, RpcError> {
    match scripted {
        None => Ok(default),
        Some(Reply::Value(v)) => Ok(v.clone()),
        Some(Reply::Error(msg)) => Err(RpcError::Rpc(msg.clone())),
        Some(Reply::Hang) => std::future::pending().await,
    }
}

#[async_trait]
impl ChainRpc for MockChainRpc {
    async fn get_native_balance(
        &self,
        chain: &ChainEndpoint,
        _address: Address,
    ) -> Result<U256, RpcError> {
        reply(self.balances.get(&chain.key), U256::ZERO).await
    }

    async fn get_gas_price(&self, chain: &ChainEndpoint) -> Result<U256, RpcError> {
        reply(self.gas_prices.get(&chain.key), U256::from(1_000_000_000u64)).await
    }

    async fn get_transaction_count(
        &self,
        chain: &ChainEndpoint,
        _address: Address,
    ) -> Result<u64, RpcError> {
        Ok(self.nonces.get(&chain.key).copied().unwrap_or_default())
    }
}

/// [`BridgeQuoter`] answering every request the same way and recording what
/// it was asked.
#[derive(Debug, Clone)]
pub struct MockBridgeQuoter {
    response: Result<BridgeQuote, BridgeError>,
    requests: Arc<Mutex<Vec<QuoteRequest>>>,
}

impl MockBridgeQuoter {
    pub fn returning(quote: BridgeQuote) -> Self {
        Self {
            response: Ok(quote),
            requests: Arc::default(),
        }
    }

    pub fn failing(error: BridgeError) -> Self {
        Self {
            response: Err(error),
            requests: Arc::default(),
        }
    }

    pub fn requests(&self) -> Vec<QuoteRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl BridgeQuoter for MockBridgeQuoter {
    async fn quote(&self, request: &QuoteRequest) -> Result<BridgeQuote, BridgeError> {
        self.requests.lock().unwrap().push(request.clone());
        self.response.clone()
    }
}
