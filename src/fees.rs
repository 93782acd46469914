// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Fee and Gas Netting
//!
//! Turns a raw per-chain balance into the three-way split
//! `gas_reserve + platform_fee + net_amount`. All arithmetic is done on
//! [`U256`] smallest units; USD figures only enter through [`UnitPrice`] when
//! converting the clamp bounds of [`FeePolicy::Clamped`].
//!
//! A chain that cannot cover its gas, or whose fee would consume everything
//! left, is dropped. Dropping is an expected outcome, not an error.

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::blockchain::{types::UnitPrice, units::u256_decimal};

/// Basis-point denominator (100% = 10 000 bps).
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Gas units of a plain native transfer.
pub const TRANSFER_GAS_UNITS: u64 = 21_000;

/// Gas units budgeted for a bridge call.
pub const BRIDGE_GAS_UNITS: u64 = 300_000;

/// Gas units reserved per cross-chain settlement: the fee transfer, a sponsor
/// reimbursement transfer and the bridge call.
pub const SETTLEMENT_GAS_UNITS: u64 = 2 * TRANSFER_GAS_UNITS + BRIDGE_GAS_UNITS;

/// Gas estimates are padded by this percentage (120 = +20%).
pub const DEFAULT_GAS_BUFFER_PERCENT: u64 = 120;

/// How the platform fee is sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FeePolicy {
    /// Fixed percentage of the fee base.
    Flat { bps: u32 },
    /// Percentage clamped to `[min, max]`, bounds in micro-USD.
    Clamped {
        bps: u32,
        min_micro_usd: u64,
        max_micro_usd: u64,
    },
}

impl FeePolicy {
    pub fn bps(&self) -> u32 {
        match self {
            FeePolicy::Flat { bps } | FeePolicy::Clamped { bps, .. } => *bps,
        }
    }
}

/// Amount the fee percentage is applied to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FeeBase {
    /// Balance after the gas reserve.
    #[default]
    Usable,
    /// Whole balance, before gas.
    Gross,
}

/// Complete fee configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeConfig {
    pub policy: FeePolicy,
    pub base: FeeBase,
    /// Balances below this many smallest units are ignored.
    pub dust_threshold: U256,
}

/// Gas reserve sizing for cross-chain settlements.
///
/// `gas_units` is the combined gas limit of every descriptor one settlement
/// may emit. Descriptors are kept within it, so the buffered reserve always
/// pays for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasPolicy {
    pub gas_units: u64,
    pub buffer_percent: u64,
}

impl Default for GasPolicy {
    fn default() -> Self {
        Self {
            gas_units: SETTLEMENT_GAS_UNITS,
            buffer_percent: DEFAULT_GAS_BUFFER_PERCENT,
        }
    }
}

impl GasPolicy {
    /// `gas_price * gas_units`, padded by the safety buffer.
    pub fn reserve(&self, gas_price: U256) -> U256 {
        gas_price * U256::from(self.gas_units) * U256::from(self.buffer_percent) / U256::from(100u64)
    }

    /// Gas units left for the settlement call once `transfers` plain
    /// transfers are accounted for.
    pub fn call_budget(&self, transfers: u64) -> u64 {
        self.gas_units.saturating_sub(transfers * TRANSFER_GAS_UNITS)
    }
}

/// Result of netting one balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FeeSplit {
    /// Amount left behind to pay gas
    #[serde(with = "u256_decimal")]
    #[schema(value_type = String)]
    pub gas_reserve: U256,
    /// Amount sent to the fee wallet
    #[serde(with = "u256_decimal")]
    #[schema(value_type = String)]
    pub platform_fee: U256,
    /// Amount delivered to the recipient
    #[serde(with = "u256_decimal")]
    #[schema(value_type = String)]
    pub net_amount: U256,
}

impl FeeSplit {
    pub fn total(&self) -> U256 {
        self.gas_reserve + self.platform_fee + self.net_amount
    }
}

/// Why a chain produced no split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    BelowDustThreshold,
    GasExceedsBalance,
    FeeExceedsUsable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitOutcome {
    Viable(FeeSplit),
    Dropped(DropReason),
}

impl SplitOutcome {
    pub fn viable(self) -> Option<FeeSplit> {
        match self {
            SplitOutcome::Viable(split) => Some(split),
            SplitOutcome::Dropped(_) => None,
        }
    }
}

/// Split `balance` into gas reserve, platform fee and net amount.
///
/// `valuation` is only consulted for [`FeePolicy::Clamped`]; without one the
/// unclamped percentage applies.
pub fn split(
    balance: U256,
    gas_reserve: U256,
    config: &FeeConfig,
    valuation: Option<UnitPrice>,
) -> SplitOutcome {
    if balance.is_zero() || balance < config.dust_threshold {
        return SplitOutcome::Dropped(DropReason::BelowDustThreshold);
    }
    if balance <= gas_reserve {
        return SplitOutcome::Dropped(DropReason::GasExceedsBalance);
    }
    let usable = balance - gas_reserve;

    let base = match config.base {
        FeeBase::Usable => usable,
        FeeBase::Gross => balance,
    };
    let fee = platform_fee(base, &config.policy, valuation);

    if fee >= usable {
        return SplitOutcome::Dropped(DropReason::FeeExceedsUsable);
    }

    SplitOutcome::Viable(FeeSplit {
        gas_reserve,
        platform_fee: fee,
        net_amount: usable - fee,
    })
}

fn platform_fee(base: U256, policy: &FeePolicy, valuation: Option<UnitPrice>) -> U256 {
    let percentage = base * U256::from(policy.bps()) / U256::from(BPS_DENOMINATOR);

    match (policy, valuation) {
        (
            FeePolicy::Clamped {
                min_micro_usd,
                max_micro_usd,
                ..
            },
            Some(price),
        ) => {
            let (Some(min), Some(max)) = (
                price.micro_usd_to_units(*min_micro_usd),
                price.micro_usd_to_units(*max_micro_usd),
            ) else {
                return percentage;
            };
            percentage.max(min).min(max)
        }
        _ => percentage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_ETH: u64 = 1_000_000_000_000_000_000;
    const ETH_PRICE: UnitPrice = UnitPrice {
        micro_usd: 3_500_000_000,
        decimals: 18,
    };

    fn flat(bps: u32) -> FeeConfig {
        FeeConfig {
            policy: FeePolicy::Flat { bps },
            base: FeeBase::Usable,
            dust_threshold: U256::ZERO,
        }
    }

    fn clamped() -> FeeConfig {
        FeeConfig {
            policy: FeePolicy::Clamped {
                bps: 500,
                min_micro_usd: 50_000,
                max_micro_usd: 500_000,
            },
            base: FeeBase::Usable,
            dust_threshold: U256::ZERO,
        }
    }

    fn eth(milli: u64) -> U256 {
        U256::from(milli) * U256::from(ONE_ETH / 1_000)
    }

    #[test]
    fn flat_fee_on_usable_balance() {
        let gas = U256::from(5_000_000_000_000_000u64); // 0.005
        let split = split(U256::from(ONE_ETH), gas, &flat(500), None)
            .viable()
            .expect("viable");

        assert_eq!(split.gas_reserve, gas);
        assert_eq!(split.platform_fee, U256::from(49_750_000_000_000_000u64));
        assert_eq!(split.net_amount, U256::from(945_250_000_000_000_000u64));
        assert_eq!(split.total(), U256::from(ONE_ETH));
        assert_eq!(
            split.platform_fee + split.net_amount,
            U256::from(ONE_ETH) - gas
        );
    }

    #[test]
    fn zero_balance_is_dropped() {
        assert_eq!(
            split(U256::ZERO, U256::ZERO, &flat(500), None),
            SplitOutcome::Dropped(DropReason::BelowDustThreshold)
        );
    }

    #[test]
    fn balance_below_gas_is_dropped() {
        let outcome = split(
            U256::from(100_000_000_000_000u64), // 0.0001
            U256::from(5_000_000_000_000_000u64),
            &flat(500),
            None,
        );
        assert_eq!(outcome, SplitOutcome::Dropped(DropReason::GasExceedsBalance));

        let exact = split(eth(5), eth(5), &flat(500), None);
        assert_eq!(exact, SplitOutcome::Dropped(DropReason::GasExceedsBalance));
    }

    #[test]
    fn dust_threshold_drops_small_balances() {
        let config = FeeConfig {
            dust_threshold: U256::from(10_000_000_000_000u64),
            ..flat(500)
        };
        let outcome = split(U256::from(9_999_999_999_999u64), U256::ZERO, &config, None);
        assert_eq!(outcome, SplitOutcome::Dropped(DropReason::BelowDustThreshold));
    }

    #[test]
    fn clamped_fee_respects_minimum() {
        // 0.001 ETH = $3.50, 5% = $0.175 -> within bounds
        let within = split(eth(1), U256::ZERO, &clamped(), Some(ETH_PRICE))
            .viable()
            .unwrap();
        assert_eq!(within.platform_fee, eth(1) / U256::from(20u64));

        // 0.0001 ETH = $0.35, 5% = $0.0175 -> raised to $0.05
        let small = U256::from(100_000_000_000_000u64);
        let raised = split(small, U256::ZERO, &clamped(), Some(ETH_PRICE))
            .viable()
            .unwrap();
        assert_eq!(raised.platform_fee, ETH_PRICE.micro_usd_to_units(50_000).unwrap());
        assert_eq!(raised.total(), small);
    }

    #[test]
    fn clamped_fee_respects_maximum() {
        // 1 ETH = $3500, 5% = $175 -> capped at $0.50
        let capped = split(eth(1_000), U256::ZERO, &clamped(), Some(ETH_PRICE))
            .viable()
            .unwrap();
        assert_eq!(capped.platform_fee, ETH_PRICE.micro_usd_to_units(500_000).unwrap());
    }

    #[test]
    fn minimum_fee_larger_than_usable_drops_chain() {
        // $0.035 of ETH cannot pay a $0.05 minimum
        let tiny = U256::from(10_000_000_000_000u64);
        assert_eq!(
            split(tiny, U256::ZERO, &clamped(), Some(ETH_PRICE)),
            SplitOutcome::Dropped(DropReason::FeeExceedsUsable)
        );
    }

    #[test]
    fn clamped_without_valuation_uses_percentage() {
        let split = split(eth(1_000), U256::ZERO, &clamped(), None).viable().unwrap();
        assert_eq!(split.platform_fee, eth(50));
    }

    #[test]
    fn gross_base_charges_on_full_balance() {
        let config = FeeConfig {
            base: FeeBase::Gross,
            ..flat(500)
        };
        let gas = eth(5);
        let split = split(eth(1_000), gas, &config, None).viable().unwrap();
        assert_eq!(split.platform_fee, eth(50));
        assert_eq!(split.net_amount, eth(945));
        assert_eq!(split.total(), eth(1_000));
    }

    #[test]
    fn splits_never_exceed_balance() {
        let gas = U256::from(37_000_000_000_000u64);
        for raw in [
            40_000_000_000_000u64,
            123_456_789_012_345,
            999_999_999_999_999_999,
            5_000_000_000_000_000_000,
        ] {
            let balance = U256::from(raw);
            for config in [flat(500), flat(0), clamped()] {
                if let Some(split) = split(balance, gas, &config, Some(ETH_PRICE)).viable() {
                    assert_eq!(split.total(), balance);
                    assert!(split.net_amount > U256::ZERO);
                }
            }
        }
    }

    #[test]
    fn gas_reserve_applies_buffer() {
        let policy = GasPolicy {
            gas_units: TRANSFER_GAS_UNITS,
            ..GasPolicy::default()
        };
        // 1 gwei * 21000 * 1.2
        assert_eq!(
            policy.reserve(U256::from(1_000_000_000u64)),
            U256::from(25_200_000_000_000u64)
        );
    }

    #[test]
    fn default_reserve_covers_fee_reimbursement_and_bridge() {
        let policy = GasPolicy::default();
        assert_eq!(policy.gas_units, 342_000);
        // 1 gwei * 342000 * 1.2
        assert_eq!(
            policy.reserve(U256::from(1_000_000_000u64)),
            U256::from(410_400_000_000_000u64)
        );
        assert_eq!(policy.call_budget(1), 321_000);
        assert_eq!(policy.call_budget(2), BRIDGE_GAS_UNITS);
        assert_eq!(GasPolicy { gas_units: 30_000, ..policy }.call_budget(2), 0);
    }
}
