// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sponsor-pays gas top-ups.
//!
//! A user whose dust sits on chains where they hold nothing else cannot pay
//! for the bridge call. When sponsoring is enabled, a service-held key signs a
//! native transfer of exactly the gas reserve to the user on each such chain.
//! The sponsored settlement repays that reserve to the sponsor. Broadcasting
//! is left to the caller.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes, U256};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::{
    blockchain::{
        client::{with_timeout, ChainRpc, RpcError},
        signing::{SignableTransfer, SigningError, TransactionSigner},
        types::ChainEndpoint,
        units::u256_decimal,
    },
    fees::GasPolicy,
    settlement::{SkippedChain, TRANSFER_GAS_LIMIT},
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SponsorError {
    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error("gas price {0} does not fit a legacy transaction")]
    GasPriceOverflow(U256),
}

/// A signed top-up, ready to broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SignedTopUp {
    pub chain: String,
    pub chain_id: u64,
    /// Recipient of the gas
    #[schema(value_type = String)]
    pub to: Address,
    #[serde(with = "u256_decimal")]
    #[schema(value_type = String)]
    pub value: U256,
    pub nonce: u64,
    /// EIP-2718 encoded signed transaction
    #[schema(value_type = String)]
    pub raw_transaction: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SponsorPlan {
    /// Address paying for the top-ups
    #[schema(value_type = String)]
    pub sponsor: Address,
    pub top_ups: Vec<SignedTopUp>,
    pub skipped: Vec<SkippedChain>,
}

pub struct SponsorService {
    rpc: Arc<dyn ChainRpc>,
    signer: Arc<dyn TransactionSigner>,
    gas: GasPolicy,
}

impl SponsorService {
    pub fn new(rpc: Arc<dyn ChainRpc>, signer: Arc<dyn TransactionSigner>, gas: GasPolicy) -> Self {
        Self { rpc, signer, gas }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Sign a gas top-up to `recipient` on every source chain other than
    /// `destination`. Chains are handled concurrently; those whose lookups or
    /// signing fail are skipped.
    pub async fn top_ups(
        &self,
        recipient: Address,
        sources: &[ChainEndpoint],
        destination: &ChainEndpoint,
    ) -> SponsorPlan {
        let chains: Vec<_> = sources.iter().filter(|c| c.key != destination.key).collect();
        let results = join_all(chains.iter().map(|chain| self.top_up(recipient, chain))).await;

        let mut top_ups = Vec::new();
        let mut skipped = Vec::new();
        for (chain, result) in chains.into_iter().zip(results) {
            match result {
                Ok(top_up) => top_ups.push(top_up),
                Err(e) => {
                    warn!(chain = %chain.key, error = %e, "Skipping gas top-up");
                    skipped.push(SkippedChain {
                        chain: chain.key.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            sponsor = %self.address(),
            recipient = %recipient,
            top_ups = top_ups.len(),
            skipped = skipped.len(),
            "Prepared sponsored gas top-ups"
        );

        SponsorPlan {
            sponsor: self.address(),
            top_ups,
            skipped,
        }
    }

    async fn top_up(&self, recipient: Address, chain: &ChainEndpoint) -> Result<SignedTopUp, SponsorError> {
        let gas_price = with_timeout(chain.timeout, self.rpc.get_gas_price(chain)).await?;
        let nonce = with_timeout(
            chain.timeout,
            self.rpc.get_transaction_count(chain, self.address()),
        )
        .await?;

        let value = self.gas.reserve(gas_price);
        let transfer = SignableTransfer {
            chain_id: chain.chain_id,
            nonce,
            gas_price: u128::try_from(gas_price).map_err(|_| SponsorError::GasPriceOverflow(gas_price))?,
            gas_limit: TRANSFER_GAS_LIMIT,
            to: recipient,
            value,
            data: Bytes::new(),
        };
        let raw_transaction = self.signer.sign(&transfer)?;

        Ok(SignedTopUp {
            chain: chain.key.clone(),
            chain_id: chain.chain_id,
            to: recipient,
            value,
            nonce,
            raw_transaction,
        })
    }
}

#[cfg(test)]
mod tests {
    use alloy::{consensus::TxEnvelope, eips::eip2718::Decodable2718};

    use super::*;
    use crate::mocks::{dev_signer, test_chain, MockChainRpc, DEV_ADDRESS};

    fn service(rpc: MockChainRpc) -> SponsorService {
        SponsorService::new(Arc::new(rpc), Arc::new(dev_signer()), GasPolicy::default())
    }

    #[tokio::test]
    async fn tops_up_every_chain_except_destination() {
        let chains = vec![
            test_chain("base", 8453, "ETH"),
            test_chain("ethereum", 1, "ETH"),
            test_chain("arbitrum", 42161, "ETH"),
        ];
        let rpc = MockChainRpc::new()
            .with_gas_price("base", U256::from(1_000_000_000u64))
            .with_nonce("base", 4);
        let recipient = Address::repeat_byte(0xcd);

        let plan = service(rpc).top_ups(recipient, &chains, &chains[1]).await;

        assert_eq!(plan.sponsor.to_checksum(None), DEV_ADDRESS);
        assert!(plan.skipped.is_empty());
        let keys: Vec<_> = plan.top_ups.iter().map(|t| t.chain.as_str()).collect();
        assert_eq!(keys, ["base", "arbitrum"]);

        let base = &plan.top_ups[0];
        assert_eq!(base.nonce, 4);
        // 1 gwei * 342000 * 1.2
        assert_eq!(base.value, U256::from(410_400_000_000_000u64));
        assert_eq!(base.to, recipient);
    }

    #[tokio::test]
    async fn raw_transaction_recovers_to_sponsor() {
        let chains = vec![test_chain("base", 8453, "ETH"), test_chain("ethereum", 1, "ETH")];
        let plan = service(MockChainRpc::new())
            .top_ups(Address::repeat_byte(0xcd), &chains, &chains[1])
            .await;

        let raw = &plan.top_ups[0].raw_transaction;
        let envelope = TxEnvelope::decode_2718(&mut raw.as_ref()).unwrap();
        let TxEnvelope::Legacy(signed) = envelope else {
            panic!("expected legacy transaction");
        };
        assert_eq!(signed.tx().chain_id, Some(8453));
        assert_eq!(
            signed.recover_signer().unwrap().to_checksum(None),
            DEV_ADDRESS
        );
    }

    #[tokio::test(start_paused = true)]
    async fn chains_are_topped_up_concurrently() {
        let chains = vec![
            test_chain("base", 8453, "ETH"),
            test_chain("optimism", 10, "ETH"),
            test_chain("arbitrum", 42161, "ETH"),
            test_chain("ethereum", 1, "ETH"),
        ];
        let rpc = MockChainRpc::new()
            .with_gas_hang("base")
            .with_gas_hang("optimism")
            .with_gas_hang("arbitrum");
        let started = tokio::time::Instant::now();

        let plan = service(rpc)
            .top_ups(Address::repeat_byte(0xcd), &chains, &chains[3])
            .await;

        assert_eq!(plan.skipped.len(), 3);
        assert!(plan.skipped.iter().all(|s| s.reason == "RPC call timed out"));
        // One per-call timeout, not one per chain.
        assert!(started.elapsed() < chains[0].timeout * 2);
    }

    #[tokio::test]
    async fn gas_lookup_failure_is_skipped() {
        let chains = vec![
            test_chain("base", 8453, "ETH"),
            test_chain("optimism", 10, "ETH"),
            test_chain("ethereum", 1, "ETH"),
        ];
        let rpc = MockChainRpc::new().with_gas_error("optimism", "503 Service Unavailable");

        let plan = service(rpc)
            .top_ups(Address::repeat_byte(0xcd), &chains, &chains[2])
            .await;

        assert_eq!(plan.top_ups.len(), 1);
        assert_eq!(plan.skipped.len(), 1);
        assert_eq!(plan.skipped[0].chain, "optimism");
        assert!(plan.skipped[0].reason.contains("503"));
    }
}
