// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! once at startup; any invalid value aborts the process with a
//! [`ConfigError`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `FEE_WALLET` | Address receiving platform fees | Required |
//! | `FEE_MODE` | `flat` or `clamped` | `clamped` |
//! | `FEE_BPS` | Fee percentage in basis points | `500` |
//! | `FEE_MIN_USD` | Lower clamp bound (clamped mode) | `0.05` |
//! | `FEE_MAX_USD` | Upper clamp bound (clamped mode) | `0.50` |
//! | `FEE_BASE` | `usable` (after gas) or `gross` | `usable` |
//! | `GAS_UNITS` | Gas units reserved per cross-chain settlement (at least `63000`) | `342000` |
//! | `GAS_BUFFER_PERCENT` | Gas reserve padding (120 = +20%) | `120` |
//! | `DUST_THRESHOLD_WEI` | Balances below this are ignored | `10000000000000` |
//! | `RPC_TIMEOUT_SECS` | Per-call RPC timeout | `10` |
//! | `SCAN_DEADLINE_SECS` | Deadline for a whole scan | `20` |
//! | `SCAN_CONCURRENCY` | Chains queried at once | `10` |
//! | `DEFAULT_DESTINATION_CHAIN` | Destination when a request names none | Each chain settles on itself |
//! | `BRIDGE_API_URL` | Bridge quote API base URL | `https://li.quest/v1` |
//! | `BRIDGE_API_KEY` | Bridge quote API key | Optional |
//! | `BRIDGE_INTEGRATOR` | Integrator tag sent with quotes | Optional |
//! | `BRIDGE_SLIPPAGE_BPS` | Bridge slippage tolerance | `50` |
//! | `BRIDGE_TIMEOUT_SECS` | Bridge quote timeout | `15` |
//! | `SPONSOR_ENABLED` | Enable sponsored gas top-ups | `false` |
//! | `SPONSOR_PRIVATE_KEY` | Sponsor key (hex or PEM) | Required when sponsoring |
//! | `SPONSOR_PRIVATE_KEY_PATH` | File holding the sponsor key | Optional |
//! | `CHAINS_CONFIG` | JSON file replacing the built-in chain table | Optional |
//! | `CHAIN_RPC_<KEY>` | RPC URL override for one chain (e.g. `CHAIN_RPC_BASE`) | Optional |

use std::{fmt, str::FromStr, sync::Arc, time::Duration};

use alloy::primitives::{Address, U256};

use crate::{
    blockchain::{
        address::parse_address,
        signing::{LocalKeySigner, SigningError},
        types::{ChainRegistry, RegistryError, DEFAULT_RPC_TIMEOUT},
        units::parse_amount,
    },
    fees::{
        FeeBase, FeeConfig, FeePolicy, GasPolicy, BPS_DENOMINATOR, DEFAULT_GAS_BUFFER_PERCENT,
        SETTLEMENT_GAS_UNITS, TRANSFER_GAS_UNITS,
    },
    providers::bridge::BridgeSettings,
    scanner::{ScanOptions, DEFAULT_MAX_CONCURRENCY, DEFAULT_SCAN_DEADLINE},
    settlement::DEFAULT_SLIPPAGE_BPS,
};

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default `RUST_LOG` filter.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

pub const FEE_WALLET_ENV: &str = "FEE_WALLET";
pub const FEE_MODE_ENV: &str = "FEE_MODE";
pub const FEE_BPS_ENV: &str = "FEE_BPS";
pub const FEE_MIN_USD_ENV: &str = "FEE_MIN_USD";
pub const FEE_MAX_USD_ENV: &str = "FEE_MAX_USD";
pub const FEE_BASE_ENV: &str = "FEE_BASE";
pub const GAS_UNITS_ENV: &str = "GAS_UNITS";
pub const GAS_BUFFER_PERCENT_ENV: &str = "GAS_BUFFER_PERCENT";
pub const DUST_THRESHOLD_ENV: &str = "DUST_THRESHOLD_WEI";

pub const RPC_TIMEOUT_ENV: &str = "RPC_TIMEOUT_SECS";
pub const SCAN_DEADLINE_ENV: &str = "SCAN_DEADLINE_SECS";
pub const SCAN_CONCURRENCY_ENV: &str = "SCAN_CONCURRENCY";
pub const DEFAULT_DESTINATION_ENV: &str = "DEFAULT_DESTINATION_CHAIN";

pub const BRIDGE_API_URL_ENV: &str = "BRIDGE_API_URL";
pub const BRIDGE_API_KEY_ENV: &str = "BRIDGE_API_KEY";
pub const BRIDGE_INTEGRATOR_ENV: &str = "BRIDGE_INTEGRATOR";
pub const BRIDGE_SLIPPAGE_ENV: &str = "BRIDGE_SLIPPAGE_BPS";
pub const BRIDGE_TIMEOUT_ENV: &str = "BRIDGE_TIMEOUT_SECS";

/// Sponsoring is off unless this is `true`.
///
/// When on, key material must come from `SPONSOR_PRIVATE_KEY` or
/// `SPONSOR_PRIVATE_KEY_PATH`. There is no built-in fallback key.
pub const SPONSOR_ENABLED_ENV: &str = "SPONSOR_ENABLED";
pub const SPONSOR_KEY_ENV: &str = "SPONSOR_PRIVATE_KEY";
pub const SPONSOR_KEY_PATH_ENV: &str = "SPONSOR_PRIVATE_KEY_PATH";

pub const CHAINS_CONFIG_ENV: &str = "CHAINS_CONFIG";

/// Prefix of per-chain RPC overrides, followed by the upper-cased chain key.
pub const CHAIN_RPC_PREFIX: &str = "CHAIN_RPC_";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_FEE_BPS: u32 = 500;
const DEFAULT_FEE_MIN_MICRO_USD: u64 = 50_000;
const DEFAULT_FEE_MAX_MICRO_USD: u64 = 500_000;
const DEFAULT_DUST_THRESHOLD: u64 = 10_000_000_000_000;
const DEFAULT_BRIDGE_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} is required")]
    Missing { name: &'static str },

    #[error("invalid {name}: {reason}")]
    Invalid { name: String, reason: String },

    #[error("SPONSOR_ENABLED is set but neither SPONSOR_PRIVATE_KEY nor SPONSOR_PRIVATE_KEY_PATH provides a key")]
    MissingSponsorKey,

    #[error("invalid sponsor key: {0}")]
    SponsorKey(#[from] SigningError),

    #[error("chain table: {0}")]
    Registry(#[from] RegistryError),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

fn invalid(name: &str, reason: impl fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

/// Log output format selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    pub fn from_env() -> Self {
        match std::env::var(LOG_FORMAT_ENV) {
            Ok(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Fully validated service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub fee: FeeConfig,
    pub gas: GasPolicy,
    pub fee_wallet: Address,
    pub slippage_bps: u32,
    pub scan: ScanOptions,
    pub default_destination: Option<String>,
    pub bridge: BridgeSettings,
    pub sponsor: Option<Arc<LocalKeySigner>>,
    pub chains: ChainRegistry,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = var(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or(&var, PORT_ENV, DEFAULT_PORT)?;

        let fee_wallet = var(FEE_WALLET_ENV).ok_or(ConfigError::Missing {
            name: FEE_WALLET_ENV,
        })?;
        let fee_wallet = parse_address(&fee_wallet).map_err(|e| invalid(FEE_WALLET_ENV, e))?;

        let fee = FeeConfig {
            policy: fee_policy(&var)?,
            base: match var(FEE_BASE_ENV).as_deref() {
                None => FeeBase::default(),
                Some(v) if v.eq_ignore_ascii_case("usable") => FeeBase::Usable,
                Some(v) if v.eq_ignore_ascii_case("gross") => FeeBase::Gross,
                Some(v) => return Err(invalid(FEE_BASE_ENV, format!("expected usable or gross, got `{v}`"))),
            },
            dust_threshold: match var(DUST_THRESHOLD_ENV) {
                Some(v) => U256::from_str(&v).map_err(|e| invalid(DUST_THRESHOLD_ENV, e))?,
                None => U256::from(DEFAULT_DUST_THRESHOLD),
            },
        };

        let gas = GasPolicy {
            gas_units: parse_or(&var, GAS_UNITS_ENV, SETTLEMENT_GAS_UNITS)?,
            buffer_percent: parse_or(&var, GAS_BUFFER_PERCENT_ENV, DEFAULT_GAS_BUFFER_PERCENT)?,
        };
        // Fee, reimbursement and fallback transfers must always fit.
        if gas.gas_units < 3 * TRANSFER_GAS_UNITS {
            return Err(invalid(GAS_UNITS_ENV, "must cover three plain transfers (63000)"));
        }
        if gas.buffer_percent < 100 {
            return Err(invalid(GAS_BUFFER_PERCENT_ENV, "must be at least 100"));
        }

        let rpc_timeout = secs_or(&var, RPC_TIMEOUT_ENV, DEFAULT_RPC_TIMEOUT)?;
        let scan = ScanOptions {
            max_concurrency: parse_or(&var, SCAN_CONCURRENCY_ENV, DEFAULT_MAX_CONCURRENCY)?,
            deadline: secs_or(&var, SCAN_DEADLINE_ENV, DEFAULT_SCAN_DEADLINE)?,
        };
        if scan.max_concurrency == 0 {
            return Err(invalid(SCAN_CONCURRENCY_ENV, "must be at least 1"));
        }

        let chains = match var(CHAINS_CONFIG_ENV) {
            Some(path) => ChainRegistry::from_json(&read_file(&path)?, rpc_timeout)?,
            None => ChainRegistry::defaults(rpc_timeout),
        };
        let chains = chains.with_rpc_overrides(|key| var(&format!("{CHAIN_RPC_PREFIX}{key}")))?;

        let default_destination = var(DEFAULT_DESTINATION_ENV);
        if let Some(key) = &default_destination {
            if chains.get(key).is_none() {
                return Err(invalid(DEFAULT_DESTINATION_ENV, format!("unknown chain `{key}`")));
            }
        }

        let slippage_bps = parse_or(&var, BRIDGE_SLIPPAGE_ENV, DEFAULT_SLIPPAGE_BPS)?;
        if u64::from(slippage_bps) > BPS_DENOMINATOR {
            return Err(invalid(BRIDGE_SLIPPAGE_ENV, "must not exceed 10000"));
        }
        let bridge_defaults = BridgeSettings::default();
        let bridge = BridgeSettings {
            base_url: var(BRIDGE_API_URL_ENV).unwrap_or(bridge_defaults.base_url),
            api_key: var(BRIDGE_API_KEY_ENV),
            integrator: var(BRIDGE_INTEGRATOR_ENV),
            timeout: secs_or(&var, BRIDGE_TIMEOUT_ENV, DEFAULT_BRIDGE_TIMEOUT)?,
        };
        url::Url::parse(&bridge.base_url).map_err(|e| invalid(BRIDGE_API_URL_ENV, e))?;

        let sponsor = if parse_or(&var, SPONSOR_ENABLED_ENV, false)? {
            let material = match (var(SPONSOR_KEY_ENV), var(SPONSOR_KEY_PATH_ENV)) {
                (Some(key), _) => key,
                (None, Some(path)) => read_file(&path)?,
                (None, None) => return Err(ConfigError::MissingSponsorKey),
            };
            Some(Arc::new(LocalKeySigner::from_key_material(&material)?))
        } else {
            None
        };

        Ok(Self {
            host,
            port,
            fee,
            gas,
            fee_wallet,
            slippage_bps,
            scan,
            default_destination,
            bridge,
            sponsor,
            chains,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn fee_policy(var: &impl Fn(&str) -> Option<String>) -> Result<FeePolicy, ConfigError> {
    let bps: u32 = parse_or(var, FEE_BPS_ENV, DEFAULT_FEE_BPS)?;
    if u64::from(bps) > BPS_DENOMINATOR {
        return Err(invalid(FEE_BPS_ENV, "must not exceed 10000"));
    }

    match var(FEE_MODE_ENV).as_deref() {
        Some(m) if m.eq_ignore_ascii_case("flat") => Ok(FeePolicy::Flat { bps }),
        None => clamped_policy(var, bps),
        Some(m) if m.eq_ignore_ascii_case("clamped") => clamped_policy(var, bps),
        Some(m) => Err(invalid(FEE_MODE_ENV, format!("expected flat or clamped, got `{m}`"))),
    }
}

fn clamped_policy(var: &impl Fn(&str) -> Option<String>, bps: u32) -> Result<FeePolicy, ConfigError> {
    let min_micro_usd = micro_usd_or(var, FEE_MIN_USD_ENV, DEFAULT_FEE_MIN_MICRO_USD)?;
    let max_micro_usd = micro_usd_or(var, FEE_MAX_USD_ENV, DEFAULT_FEE_MAX_MICRO_USD)?;
    if min_micro_usd > max_micro_usd {
        return Err(invalid(FEE_MIN_USD_ENV, format!("must not exceed {FEE_MAX_USD_ENV}")));
    }
    Ok(FeePolicy::Clamped {
        bps,
        min_micro_usd,
        max_micro_usd,
    })
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match var(name) {
        Some(raw) => raw.parse().map_err(|e| invalid(name, e)),
        None => Ok(default),
    }
}

fn secs_or(
    var: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let secs: u64 = parse_or(var, name, default.as_secs())?;
    if secs == 0 {
        return Err(invalid(name, "must be at least 1 second"));
    }
    Ok(Duration::from_secs(secs))
}

/// USD amount (e.g. `"0.05"`) as integer micro-USD.
fn micro_usd_or(
    var: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    match var(name) {
        Some(raw) => {
            let micro = parse_amount(&raw, 6).map_err(|e| invalid(name, e))?;
            u64::try_from(micro).map_err(|_| invalid(name, "too large"))
        }
        None => Ok(default),
    }
}

fn read_file(path: &str) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_string(),
        source,
    })
}
