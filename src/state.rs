// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::{
    blockchain::{
        client::ChainRpc,
        signing::TransactionSigner,
        types::{ChainEndpoint, ChainRegistry, PriceTable},
    },
    config::ServiceConfig,
    providers::bridge::BridgeQuoter,
    scanner::BalanceScanner,
    settlement::{SettlementPlanner, SettlementPolicy},
    sponsor::SponsorService,
};

/// Shared, read-only application state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ChainRegistry>,
    pub prices: Arc<PriceTable>,
    pub scanner: Arc<BalanceScanner>,
    pub planner: Arc<SettlementPlanner>,
    pub sponsor: Option<Arc<SponsorService>>,
    pub default_destination: Option<String>,
}

impl AppState {
    /// Wire the services from validated configuration and the injected
    /// chain and bridge collaborators.
    pub fn new(config: &ServiceConfig, rpc: Arc<dyn ChainRpc>, quoter: Arc<dyn BridgeQuoter>) -> Self {
        let registry = Arc::new(config.chains.clone());
        let prices = Arc::new(PriceTable::default());

        let scanner = BalanceScanner::new(rpc.clone(), prices.clone(), config.scan);
        let planner = SettlementPlanner::new(
            rpc.clone(),
            quoter,
            registry.clone(),
            prices.clone(),
            SettlementPolicy {
                fee: config.fee,
                gas: config.gas,
                fee_wallet: config.fee_wallet,
                slippage_bps: config.slippage_bps,
            },
        );
        let sponsor = config.sponsor.clone().map(|signer| {
            let signer: Arc<dyn TransactionSigner> = signer;
            Arc::new(SponsorService::new(rpc.clone(), signer, config.gas))
        });

        Self {
            registry,
            prices,
            scanner: Arc::new(scanner),
            planner: Arc::new(planner),
            sponsor,
            default_destination: config.default_destination.clone(),
        }
    }

    /// Explicit destination, else the configured default, else none.
    pub fn destination<'a>(&'a self, requested: Option<&'a str>) -> Option<&'a str> {
        requested
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .or(self.default_destination.as_deref())
    }

    pub fn chain(&self, key: &str) -> Option<&ChainEndpoint> {
        self.registry.get(key)
    }
}
