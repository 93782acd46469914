// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain configuration table and static price table.

use std::{collections::HashMap, time::Duration};

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::units::{pow10, to_display_f64};

/// Default per-call RPC timeout.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(10);

/// Native currency decimals on every supported EVM chain.
pub const NATIVE_DECIMALS: u8 = 18;

/// Compile-time description of a supported chain.
#[derive(Debug, Clone, Copy)]
pub struct ChainSpec {
    pub key: &'static str,
    pub name: &'static str,
    pub rpc_url: &'static str,
    pub chain_id: u64,
    pub symbol: &'static str,
    pub color: &'static str,
    pub explorer_url: &'static str,
}

/// Chains scanned when no configuration file is supplied.
#[rustfmt::skip]
pub const DEFAULT_CHAINS: [ChainSpec; 15] = [
    ChainSpec { key: "ethereum", name: "Ethereum", rpc_url: "https://eth.llamarpc.com", chain_id: 1, symbol: "ETH", color: "#627EEA", explorer_url: "https://etherscan.io/tx/" },
    ChainSpec { key: "polygon", name: "Polygon", rpc_url: "https://polygon-rpc.com", chain_id: 137, symbol: "MATIC", color: "#8247E5", explorer_url: "https://polygonscan.com/tx/" },
    ChainSpec { key: "bsc", name: "BNB Chain", rpc_url: "https://bsc-dataseed.binance.org", chain_id: 56, symbol: "BNB", color: "#F3BA2F", explorer_url: "https://bscscan.com/tx/" },
    ChainSpec { key: "arbitrum", name: "Arbitrum", rpc_url: "https://arb1.arbitrum.io/rpc", chain_id: 42161, symbol: "ETH", color: "#28A0F0", explorer_url: "https://arbiscan.io/tx/" },
    ChainSpec { key: "optimism", name: "Optimism", rpc_url: "https://mainnet.optimism.io", chain_id: 10, symbol: "ETH", color: "#FF0420", explorer_url: "https://optimistic.etherscan.io/tx/" },
    ChainSpec { key: "avalanche", name: "Avalanche", rpc_url: "https://api.avax.network/ext/bc/C/rpc", chain_id: 43114, symbol: "AVAX", color: "#E84142", explorer_url: "https://snowtrace.io/tx/" },
    ChainSpec { key: "fantom", name: "Fantom", rpc_url: "https://rpc.ftm.tools", chain_id: 250, symbol: "FTM", color: "#1969FF", explorer_url: "https://ftmscan.com/tx/" },
    ChainSpec { key: "moonbeam", name: "Moonbeam", rpc_url: "https://rpc.api.moonbeam.network", chain_id: 1284, symbol: "GLMR", color: "#00D0FF", explorer_url: "https://moonscan.io/tx/" },
    ChainSpec { key: "celo", name: "Celo", rpc_url: "https://forno.celo.org", chain_id: 42220, symbol: "CELO", color: "#FBCC5C", explorer_url: "https://celoscan.io/tx/" },
    ChainSpec { key: "aurora", name: "Aurora", rpc_url: "https://mainnet.aurora.dev", chain_id: 1313161554, symbol: "ETH", color: "#00A9FF", explorer_url: "https://explorer.mainnet.aurora.dev/tx/" },
    ChainSpec { key: "polygon_zkevm", name: "Polygon zkEVM", rpc_url: "https://zkevm-rpc.com", chain_id: 1101, symbol: "ETH", color: "#8247E5", explorer_url: "https://zkevm.polygonscan.com/tx/" },
    ChainSpec { key: "linea", name: "Linea", rpc_url: "https://rpc.linea.build", chain_id: 59144, symbol: "ETH", color: "#5A9BC4", explorer_url: "https://lineascan.build/tx/" },
    ChainSpec { key: "base", name: "Base", rpc_url: "https://mainnet.base.org", chain_id: 8453, symbol: "ETH", color: "#0052FF", explorer_url: "https://basescan.org/tx/" },
    ChainSpec { key: "scroll", name: "Scroll", rpc_url: "https://rpc.scroll.io", chain_id: 534352, symbol: "ETH", color: "#FFD700", explorer_url: "https://scrollscan.com/tx/" },
    ChainSpec { key: "zksync", name: "zkSync Era", rpc_url: "https://mainnet.era.zksync.io", chain_id: 324, symbol: "ETH", color: "#2E2E2E", explorer_url: "https://explorer.zksync.io/tx/" },
];

/// A configured chain endpoint. Immutable once the registry is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChainEndpoint {
    /// Unique chain key (e.g. "ethereum")
    pub key: String,
    /// Display name
    pub name: String,
    /// JSON-RPC endpoint URL
    pub rpc_url: String,
    /// EIP-155 chain ID
    pub chain_id: u64,
    /// Native currency symbol
    pub symbol: String,
    /// Native currency decimals
    #[serde(default = "default_decimals")]
    pub decimals: u8,
    /// UI colour
    #[serde(default)]
    pub color: String,
    /// Block explorer transaction URL prefix
    #[serde(default)]
    pub explorer_url: String,
    /// Per-call RPC timeout
    #[serde(skip, default = "default_timeout")]
    pub timeout: Duration,
}

fn default_decimals() -> u8 {
    NATIVE_DECIMALS
}

fn default_timeout() -> Duration {
    DEFAULT_RPC_TIMEOUT
}

impl ChainEndpoint {
    pub fn from_spec(spec: &ChainSpec, timeout: Duration) -> Self {
        Self {
            key: spec.key.to_string(),
            name: spec.name.to_string(),
            rpc_url: spec.rpc_url.to_string(),
            chain_id: spec.chain_id,
            symbol: spec.symbol.to_string(),
            decimals: NATIVE_DECIMALS,
            color: spec.color.to_string(),
            explorer_url: spec.explorer_url.to_string(),
            timeout,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("chain table is empty")]
    Empty,

    #[error("duplicate chain key `{0}`")]
    DuplicateKey(String),

    #[error("invalid RPC URL for `{key}`: {reason}")]
    InvalidRpcUrl { key: String, reason: String },

    #[error("invalid chain table: {0}")]
    Parse(String),
}

/// Raised when a caller selects a chain the registry does not know.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown chain `{0}`")]
pub struct UnknownChain(pub String);

/// Ordered, immutable set of configured chains.
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    chains: Vec<ChainEndpoint>,
}

impl ChainRegistry {
    /// Build a registry, rejecting duplicate keys and unparseable RPC URLs.
    pub fn new(chains: Vec<ChainEndpoint>) -> Result<Self, RegistryError> {
        if chains.is_empty() {
            return Err(RegistryError::Empty);
        }
        for (i, chain) in chains.iter().enumerate() {
            if chains[..i].iter().any(|c| c.key == chain.key) {
                return Err(RegistryError::DuplicateKey(chain.key.clone()));
            }
            url::Url::parse(&chain.rpc_url).map_err(|e| RegistryError::InvalidRpcUrl {
                key: chain.key.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(Self { chains })
    }

    /// The built-in 15-chain table.
    pub fn defaults(timeout: Duration) -> Self {
        Self {
            chains: DEFAULT_CHAINS
                .iter()
                .map(|spec| ChainEndpoint::from_spec(spec, timeout))
                .collect(),
        }
    }

    /// Load a chain table from a JSON array of [`ChainEndpoint`] objects.
    pub fn from_json(json: &str, timeout: Duration) -> Result<Self, RegistryError> {
        let mut chains: Vec<ChainEndpoint> =
            serde_json::from_str(json).map_err(|e| RegistryError::Parse(e.to_string()))?;
        for chain in &mut chains {
            chain.timeout = timeout;
        }
        Self::new(chains)
    }

    /// Replace RPC URLs for chains that have an override in `lookup`.
    ///
    /// `lookup` receives the upper-cased chain key, e.g. `ETHEREUM`.
    pub fn with_rpc_overrides<F>(self, lookup: F) -> Result<Self, RegistryError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let chains = self
            .chains
            .into_iter()
            .map(|mut chain| {
                if let Some(url) = lookup(&chain.key.to_ascii_uppercase()) {
                    chain.rpc_url = url;
                }
                chain
            })
            .collect();
        Self::new(chains)
    }

    pub fn get(&self, key: &str) -> Option<&ChainEndpoint> {
        self.chains.iter().find(|c| c.key == key)
    }

    pub fn all(&self) -> &[ChainEndpoint] {
        &self.chains
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Resolve a chain selection, defaulting to every configured chain.
    ///
    /// Duplicate keys collapse to their first occurrence.
    pub fn resolve(&self, selection: Option<&[String]>) -> Result<Vec<ChainEndpoint>, UnknownChain> {
        let Some(keys) = selection else {
            return Ok(self.chains.clone());
        };

        let mut resolved: Vec<ChainEndpoint> = Vec::with_capacity(keys.len());
        for key in keys {
            let key = key.trim();
            let chain = self.get(key).ok_or_else(|| UnknownChain(key.to_string()))?;
            if !resolved.iter().any(|c| c.key == chain.key) {
                resolved.push(chain.clone());
            }
        }
        Ok(resolved)
    }
}

/// Approximate USD price of one whole native unit, in micro-USD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitPrice {
    pub micro_usd: u64,
    pub decimals: u8,
}

impl UnitPrice {
    /// Convert a micro-USD amount into smallest native units (rounded down).
    pub fn micro_usd_to_units(&self, micro_usd: u64) -> Option<U256> {
        if self.micro_usd == 0 {
            return None;
        }
        Some(U256::from(micro_usd) * pow10(self.decimals) / U256::from(self.micro_usd))
    }

    /// USD value of `amount` smallest units, for display.
    pub fn usd_value(&self, amount: U256) -> f64 {
        to_display_f64(amount, self.decimals) * self.micro_usd as f64 / 1_000_000.0
    }
}

/// Static symbol → price table used for valuation and fee clamping.
#[derive(Debug, Clone)]
pub struct PriceTable {
    prices: HashMap<String, u64>,
}

/// Built-in approximate prices, micro-USD per whole unit.
const DEFAULT_PRICES: [(&str, u64); 8] = [
    ("ETH", 3_500_000_000),
    ("MATIC", 700_000),
    ("BNB", 600_000_000),
    ("AVAX", 35_000_000),
    ("FTM", 700_000),
    ("GLMR", 250_000),
    ("CELO", 700_000),
    ("USDC", 1_000_000),
];

impl Default for PriceTable {
    fn default() -> Self {
        Self::new(DEFAULT_PRICES.iter().map(|(s, p)| (s.to_string(), *p)))
    }
}

impl PriceTable {
    pub fn new(prices: impl IntoIterator<Item = (String, u64)>) -> Self {
        Self {
            prices: prices
                .into_iter()
                .map(|(symbol, price)| (symbol.to_ascii_uppercase(), price))
                .collect(),
        }
    }

    pub fn price(&self, symbol: &str, decimals: u8) -> Option<UnitPrice> {
        self.prices
            .get(&symbol.to_ascii_uppercase())
            .map(|&micro_usd| UnitPrice { micro_usd, decimals })
    }

    pub fn usd_value(&self, symbol: &str, decimals: u8, amount: U256) -> Option<f64> {
        self.price(symbol, decimals).map(|p| p.usd_value(amount))
    }
}
