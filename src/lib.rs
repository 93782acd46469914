// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Dust Sweeper - Multi-chain native balance sweeper
//!
//! Scans an address for native-currency balances across EVM chains, nets out
//! gas and a platform fee with integer arithmetic, and assembles unsigned
//! transaction descriptors that move what remains to a recipient, bridging
//! when the destination is another chain.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `blockchain` - Chain table, RPC access, signing
//! - `scanner` - Concurrent balance scans
//! - `fees` - Gas reserve and fee netting
//! - `settlement` - Transaction descriptor assembly
//! - `sponsor` - Sponsor-paid gas top-ups
//! - `providers` - Bridge quote service

pub mod api;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod fees;
pub mod models;
pub mod providers;
pub mod scanner;
pub mod settlement;
pub mod sponsor;
pub mod state;

#[cfg(test)]
mod mocks;
