// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! EVM chain integration.
//!
//! This module provides:
//! - The configured chain table and static price table
//! - Address validation and smallest-unit amount conversions
//! - Read-only RPC access (balances, gas prices, nonces)
//! - Local-key transaction signing for sponsored top-ups

pub mod address;
pub mod client;
pub mod signing;
pub mod types;
pub mod units;

pub use address::{parse_address, AddressError};
pub use client::{AlloyRpc, ChainRpc, RpcError};
pub use signing::{LocalKeySigner, SignableTransfer, SigningError, TransactionSigner};
pub use types::{ChainEndpoint, ChainRegistry, PriceTable, UnitPrice};
