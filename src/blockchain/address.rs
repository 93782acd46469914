// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account address validation.

use std::str::FromStr;

use alloy::primitives::Address;

/// Length of a `0x`-prefixed 20-byte address.
const ADDRESS_STR_LEN: usize = 42;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address is empty")]
    Empty,

    #[error("address must start with 0x")]
    MissingPrefix,

    #[error("address must be 42 characters, got {0}")]
    Length(usize),

    #[error("address contains non-hex characters")]
    NotHex,

    #[error("address checksum does not match")]
    Checksum,
}

/// Parse an account address, failing fast on anything malformed.
///
/// All-lowercase and all-uppercase hex are accepted as-is. Mixed case is
/// treated as an EIP-55 checksum and must verify.
pub fn parse_address(raw: &str) -> Result<Address, AddressError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AddressError::Empty);
    }
    let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) else {
        return Err(AddressError::MissingPrefix);
    };
    if raw.len() != ADDRESS_STR_LEN {
        return Err(AddressError::Length(raw.len()));
    }
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AddressError::NotHex);
    }

    let has_lower = hex.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = hex.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        let prefixed = format!("0x{hex}");
        return Address::parse_checksummed(&prefixed, None).map_err(|_| AddressError::Checksum);
    }

    Address::from_str(hex).map_err(|_| AddressError::NotHex)
}
