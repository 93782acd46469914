// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Settlement Planning
//!
//! Turns scan results into unsigned [`TransactionDescriptor`]s.
//!
//! Per source chain the planner:
//! 1. Reserves gas (zero when the funds stay on the same chain, otherwise the
//!    buffered `gas_price * gas_units`, where `gas_units` bounds the combined
//!    gas limit of the descriptors emitted).
//! 2. Splits the balance with [`crate::fees::split`]; non-viable chains drop
//!    out silently.
//! 3. Emits a fee descriptor followed by either a plain transfer (same chain)
//!    or a bridge call from the quote service. A failed quote falls back to a
//!    plain transfer annotated `"fallback"`, as does a quote whose gas limit
//!    does not fit the reserve.
//! 4. When a sponsor fronted the gas, appends a reimbursement paying the
//!    withheld reserve back to the sponsor.
//!
//! Nothing here signs or broadcasts.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes, U256};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::{
    blockchain::{
        client::{with_timeout, ChainRpc, RpcError},
        types::{ChainEndpoint, ChainRegistry, PriceTable},
        units::{u256_decimal, u256_decimal_opt},
    },
    fees::{split, FeeConfig, FeeSplit, GasPolicy, SplitOutcome, BRIDGE_GAS_UNITS, TRANSFER_GAS_UNITS},
    providers::bridge::{BridgeQuoter, QuoteRequest},
    scanner::BalanceResult,
};

/// Gas limit hint for a plain native transfer.
pub const TRANSFER_GAS_LIMIT: u64 = TRANSFER_GAS_UNITS;

/// Gas limit hint for a bridge call when the quote carries none.
pub const DEFAULT_BRIDGE_GAS_LIMIT: u64 = BRIDGE_GAS_UNITS;

/// Note attached to a transfer that replaced a failed bridge quote.
pub const FALLBACK_NOTE: &str = "fallback";

/// Default bridge slippage tolerance (0.5%).
pub const DEFAULT_SLIPPAGE_BPS: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorKind {
    Fee,
    Transfer,
    Bridge,
    /// Repays the gas reserve to the sponsor that fronted it
    Reimbursement,
}

/// An unsigned transaction for the client (or a sponsor) to sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TransactionDescriptor {
    pub kind: DescriptorKind,
    /// Source chain key
    pub chain: String,
    /// Chain the transaction executes on
    pub chain_id: u64,
    /// Recipient or contract address
    #[schema(value_type = String)]
    pub to: Address,
    /// Native value in smallest units
    #[serde(with = "u256_decimal")]
    #[schema(value_type = String)]
    pub value: U256,
    /// Call data for bridge calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub data: Option<Bytes>,
    pub gas_limit: u64,
    /// Expected amount on the destination chain (bridge calls)
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "u256_decimal_opt"
    )]
    #[schema(value_type = Option<String>)]
    pub estimated_output: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl TransactionDescriptor {
    fn transfer(kind: DescriptorKind, chain: &ChainEndpoint, to: Address, value: U256) -> Self {
        Self {
            kind,
            chain: chain.key.clone(),
            chain_id: chain.chain_id,
            to,
            value,
            data: None,
            gas_limit: TRANSFER_GAS_LIMIT,
            estimated_output: None,
            note: None,
        }
    }

    fn fallback(chain: &ChainEndpoint, to: Address, value: U256) -> Self {
        let mut transfer = Self::transfer(DescriptorKind::Transfer, chain, to, value);
        transfer.note = Some(FALLBACK_NOTE.to_string());
        transfer
    }

    pub fn is_fallback(&self) -> bool {
        self.note.as_deref() == Some(FALLBACK_NOTE)
    }
}

/// Who pays and who receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementParties {
    pub sender: Address,
    pub recipient: Address,
    pub fee_wallet: Address,
    /// Sponsor that topped up the sender's gas, repaid from the reserve
    pub sponsor: Option<Address>,
}

/// Build the ordered descriptors for one source chain.
///
/// The combined gas limit stays within `gas.gas_units`, so the reserve held
/// back in `fee_split` pays for every descriptor returned. The only side
/// effect is the quote request when `target` differs from `source`.
pub async fn assemble(
    source: &ChainEndpoint,
    fee_split: &FeeSplit,
    target: &ChainEndpoint,
    parties: &SettlementParties,
    slippage_bps: u32,
    gas: &GasPolicy,
    quoter: &dyn BridgeQuoter,
) -> Vec<TransactionDescriptor> {
    let fee = TransactionDescriptor::transfer(
        DescriptorKind::Fee,
        source,
        parties.fee_wallet,
        fee_split.platform_fee,
    );
    let reimbursement = parties
        .sponsor
        .filter(|_| !fee_split.gas_reserve.is_zero())
        .map(|sponsor| {
            TransactionDescriptor::transfer(
                DescriptorKind::Reimbursement,
                source,
                sponsor,
                fee_split.gas_reserve,
            )
        });

    let settlement = if source.key == target.key {
        TransactionDescriptor::transfer(
            DescriptorKind::Transfer,
            source,
            parties.recipient,
            fee_split.net_amount,
        )
    } else {
        let budget = gas.call_budget(1 + u64::from(reimbursement.is_some()));
        bridge_or_fallback(source, fee_split, target, parties, slippage_bps, budget, quoter).await
    };

    let mut descriptors = vec![fee, settlement];
    descriptors.extend(reimbursement);
    descriptors
}

async fn bridge_or_fallback(
    source: &ChainEndpoint,
    fee_split: &FeeSplit,
    target: &ChainEndpoint,
    parties: &SettlementParties,
    slippage_bps: u32,
    gas_budget: u64,
    quoter: &dyn BridgeQuoter,
) -> TransactionDescriptor {
    let request = QuoteRequest {
        from_chain_id: source.chain_id,
        to_chain_id: target.chain_id,
        from_address: parties.sender,
        to_address: parties.recipient,
        amount: fee_split.net_amount,
        slippage_bps,
    };

    match quoter.quote(&request).await {
        Ok(quote) => {
            let gas_limit = quote
                .gas_limit
                .unwrap_or_else(|| DEFAULT_BRIDGE_GAS_LIMIT.min(gas_budget));
            if gas_limit <= gas_budget {
                return TransactionDescriptor {
                    kind: DescriptorKind::Bridge,
                    chain: source.key.clone(),
                    chain_id: source.chain_id,
                    to: quote.to,
                    value: quote.value,
                    data: Some(quote.data),
                    gas_limit,
                    estimated_output: Some(quote.estimated_output),
                    note: quote.tool,
                };
            }
            warn!(
                source = %source.key,
                target = %target.key,
                gas_limit,
                gas_budget,
                "Bridge call needs more gas than reserved, falling back to direct transfer"
            );
        }
        Err(e) => {
            warn!(
                source = %source.key,
                target = %target.key,
                error = %e,
                "Bridge quote unavailable, falling back to direct transfer"
            );
        }
    }

    TransactionDescriptor::fallback(source, parties.recipient, fee_split.net_amount)
}

/// Fee, gas and routing parameters shared by every settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementPolicy {
    pub fee: FeeConfig,
    pub gas: GasPolicy,
    pub fee_wallet: Address,
    pub slippage_bps: u32,
}

/// Viable split for one chain, with display valuations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChainEstimate {
    pub chain: String,
    pub name: String,
    pub chain_id: u64,
    pub symbol: String,
    /// Chain the net amount ends up on
    pub destination_chain: String,
    #[serde(with = "u256_decimal")]
    #[schema(value_type = String)]
    pub balance_raw: U256,
    #[serde(flatten)]
    pub split: FeeSplit,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_usd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_cost_usd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_fee_usd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_usd: Option<f64>,
}

/// A chain that could not be planned because of a transient failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SkippedChain {
    pub chain: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SettlementSummary {
    pub total_balance_usd: f64,
    pub total_gas_cost_usd: f64,
    pub total_service_fee_usd: f64,
    pub total_fees_usd: f64,
    pub total_transfer_usd: f64,
    pub count: usize,
}

impl SettlementSummary {
    fn from_estimates<'a>(estimates: impl IntoIterator<Item = &'a ChainEstimate>) -> Self {
        let mut summary = Self::default();
        for estimate in estimates {
            summary.count += 1;
            summary.total_balance_usd += estimate.balance_usd.unwrap_or_default();
            summary.total_gas_cost_usd += estimate.gas_cost_usd.unwrap_or_default();
            summary.total_service_fee_usd += estimate.service_fee_usd.unwrap_or_default();
            summary.total_transfer_usd += estimate.net_usd.unwrap_or_default();
        }
        summary.total_fees_usd = summary.total_gas_cost_usd + summary.total_service_fee_usd;
        summary
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SettlementEstimate {
    pub estimates: Vec<ChainEstimate>,
    pub skipped: Vec<SkippedChain>,
    pub summary: SettlementSummary,
}

/// Descriptors for one source chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChainSettlement {
    #[serde(flatten)]
    pub estimate: ChainEstimate,
    pub transactions: Vec<TransactionDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PreparedSettlement {
    pub settlements: Vec<ChainSettlement>,
    pub skipped: Vec<SkippedChain>,
    pub summary: SettlementSummary,
}

impl PreparedSettlement {
    /// Every descriptor in execution order.
    pub fn transactions(&self) -> Vec<TransactionDescriptor> {
        self.settlements
            .iter()
            .flat_map(|s| s.transactions.iter().cloned())
            .collect()
    }
}

enum PlanOutcome {
    Viable(ChainEndpoint, ChainEstimate),
    Dropped,
    Skipped(SkippedChain),
}

/// Orchestrates gas estimation, splitting and descriptor assembly.
pub struct SettlementPlanner {
    rpc: Arc<dyn ChainRpc>,
    quoter: Arc<dyn BridgeQuoter>,
    registry: Arc<ChainRegistry>,
    prices: Arc<PriceTable>,
    policy: SettlementPolicy,
}

impl SettlementPlanner {
    pub fn new(
        rpc: Arc<dyn ChainRpc>,
        quoter: Arc<dyn BridgeQuoter>,
        registry: Arc<ChainRegistry>,
        prices: Arc<PriceTable>,
        policy: SettlementPolicy,
    ) -> Self {
        Self {
            rpc,
            quoter,
            registry,
            prices,
            policy,
        }
    }

    pub fn policy(&self) -> &SettlementPolicy {
        &self.policy
    }

    /// Gas to hold back on `source` before funds can move to `target`.
    pub async fn gas_reserve(
        &self,
        source: &ChainEndpoint,
        target: &ChainEndpoint,
    ) -> Result<U256, RpcError> {
        if source.key == target.key {
            return Ok(U256::ZERO);
        }
        let gas_price = with_timeout(source.timeout, self.rpc.get_gas_price(source)).await?;
        Ok(self.policy.gas.reserve(gas_price))
    }

    /// Split every balance toward `destination` (or its own chain when
    /// `None`) without building descriptors.
    pub async fn estimate(
        &self,
        balances: &[BalanceResult],
        destination: Option<&ChainEndpoint>,
    ) -> SettlementEstimate {
        let outcomes = join_all(balances.iter().map(|b| self.plan_chain(b, destination))).await;

        let mut estimates = Vec::new();
        let mut skipped = Vec::new();
        for outcome in outcomes {
            match outcome {
                PlanOutcome::Viable(_, estimate) => estimates.push(estimate),
                PlanOutcome::Skipped(s) => skipped.push(s),
                PlanOutcome::Dropped => {}
            }
        }

        let summary = SettlementSummary::from_estimates(&estimates);
        SettlementEstimate {
            estimates,
            skipped,
            summary,
        }
    }

    /// Split every balance and assemble its descriptors.
    ///
    /// With a `sponsor`, every chain that withheld a gas reserve also repays
    /// it to the sponsor.
    pub async fn prepare(
        &self,
        balances: &[BalanceResult],
        destination: Option<&ChainEndpoint>,
        sender: Address,
        recipient: Address,
        sponsor: Option<Address>,
    ) -> PreparedSettlement {
        let parties = SettlementParties {
            sender,
            recipient,
            fee_wallet: self.policy.fee_wallet,
            sponsor,
        };

        let outcomes = join_all(balances.iter().map(|b| self.plan_chain(b, destination))).await;

        let mut viable = Vec::new();
        let mut skipped = Vec::new();
        for outcome in outcomes {
            match outcome {
                PlanOutcome::Viable(source, estimate) => viable.push((source, estimate)),
                PlanOutcome::Skipped(s) => skipped.push(s),
                PlanOutcome::Dropped => {}
            }
        }

        let settlements = join_all(viable.into_iter().map(|(source, estimate)| async move {
            let target = destination.unwrap_or(&source);
            let transactions = assemble(
                &source,
                &estimate.split,
                target,
                &parties,
                self.policy.slippage_bps,
                &self.policy.gas,
                self.quoter.as_ref(),
            )
            .await;
            ChainSettlement {
                estimate,
                transactions,
            }
        }))
        .await;

        let summary = SettlementSummary::from_estimates(settlements.iter().map(|s| &s.estimate));
        PreparedSettlement {
            settlements,
            skipped,
            summary,
        }
    }

    async fn plan_chain(
        &self,
        balance: &BalanceResult,
        destination: Option<&ChainEndpoint>,
    ) -> PlanOutcome {
        let Some(source) = self.registry.get(&balance.chain) else {
            return PlanOutcome::Skipped(SkippedChain {
                chain: balance.chain.clone(),
                reason: format!("unknown chain `{}`", balance.chain),
            });
        };
        if let Some(tag) = &balance.error {
            return PlanOutcome::Skipped(SkippedChain {
                chain: source.key.clone(),
                reason: tag.clone(),
            });
        }
        if balance.balance_raw.is_zero() {
            return PlanOutcome::Dropped;
        }

        let target = destination.unwrap_or(source);
        let gas_reserve = match self.gas_reserve(source, target).await {
            Ok(reserve) => reserve,
            Err(e) => {
                warn!(chain = %source.key, error = %e, "Gas price lookup failed");
                return PlanOutcome::Skipped(SkippedChain {
                    chain: source.key.clone(),
                    reason: e.tag(),
                });
            }
        };

        let price = self.prices.price(&source.symbol, source.decimals);
        let fee_split = match split(balance.balance_raw, gas_reserve, &self.policy.fee, price) {
            SplitOutcome::Viable(s) => s,
            SplitOutcome::Dropped(reason) => {
                debug!(chain = %source.key, ?reason, "Balance not worth settling");
                return PlanOutcome::Dropped;
            }
        };

        let usd = |amount: U256| price.map(|p| p.usd_value(amount));
        let estimate = ChainEstimate {
            chain: source.key.clone(),
            name: source.name.clone(),
            chain_id: source.chain_id,
            symbol: source.symbol.clone(),
            destination_chain: target.key.clone(),
            balance_raw: balance.balance_raw,
            split: fee_split,
            balance_usd: usd(balance.balance_raw),
            gas_cost_usd: usd(fee_split.gas_reserve),
            service_fee_usd: usd(fee_split.platform_fee),
            net_usd: usd(fee_split.net_amount),
        };
        PlanOutcome::Viable(source.clone(), estimate)
    }
}
