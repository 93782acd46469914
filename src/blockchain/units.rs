// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Conversions between smallest-unit integers and decimal strings.
//!
//! Every amount that decides whether funds move stays a [`U256`]. The decimal
//! strings produced here are for display and for valuation lookups only.

use alloy::primitives::U256;

/// Errors raised while parsing a decimal amount.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("invalid amount format: {0}")]
    Format(String),

    #[error("too many decimal places (max {0})")]
    Precision(u8),

    #[error("amount overflow")]
    Overflow,
}

/// Parse a human-readable amount (e.g. `"1.5"`) into smallest units.
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256, AmountError> {
    let amount = amount.trim();
    let (whole, fraction) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(AmountError::Format(amount.to_string()));
    }
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if !all_digits(whole) || !all_digits(fraction) {
        return Err(AmountError::Format(amount.to_string()));
    }
    if fraction.len() > decimals as usize {
        return Err(AmountError::Precision(decimals));
    }

    let whole = if whole.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(whole, 10).map_err(|_| AmountError::Overflow)?
    };
    let padded = format!("{:0<width$}", fraction, width = decimals as usize);
    let fraction = if padded.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(&padded, 10).map_err(|_| AmountError::Overflow)?
    };

    whole
        .checked_mul(pow10(decimals))
        .and_then(|w| w.checked_add(fraction))
        .ok_or(AmountError::Overflow)
}

/// Format smallest units as a decimal string without trailing zeros.
pub fn format_amount(amount: U256, decimals: u8) -> String {
    if amount.is_zero() {
        return "0".to_string();
    }

    let divisor = pow10(decimals);
    let whole = amount / divisor;
    let remainder = amount % divisor;

    if remainder.is_zero() {
        return whole.to_string();
    }

    let decimal_str = format!("{:0>width$}", remainder, width = decimals as usize);
    let trimmed = decimal_str.trim_end_matches('0');
    format!("{}.{}", whole, trimmed)
}

/// Lossy float view of an amount, for USD display only.
pub fn to_display_f64(amount: U256, decimals: u8) -> f64 {
    format_amount(amount, decimals).parse().unwrap_or(0.0)
}

/// `10^decimals` as a [`U256`].
pub fn pow10(decimals: u8) -> U256 {
    U256::from(10u64).pow(U256::from(decimals))
}

/// Serde adapter writing a [`U256`] as a base-10 string.
///
/// Deserialization also accepts `0x`-prefixed hex, which is what wallets and
/// most RPC tooling emit.
pub mod u256_decimal {
    use std::str::FromStr;

    use alloy::primitives::U256;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let raw = String::deserialize(deserializer)?;
        U256::from_str(raw.trim()).map_err(D::Error::custom)
    }
}

/// Same as [`u256_decimal`] for optional amounts.
pub mod u256_decimal_opt {
    use std::str::FromStr;

    use alloy::primitives::U256;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<U256>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_some(&v.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<U256>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| U256::from_str(raw.trim()).map_err(D::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount_whole() {
        let result = parse_amount("1", 18).unwrap();
        assert_eq!(result, U256::from(1_000_000_000_000_000_000u64));
    }

    #[test]
    fn test_parse_amount_decimal() {
        let result = parse_amount("0.995", 18).unwrap();
        assert_eq!(result, U256::from(995_000_000_000_000_000u64));
    }

    #[test]
    fn test_parse_amount_micro_usd() {
        assert_eq!(parse_amount("0.05", 6).unwrap(), U256::from(50_000u64));
        assert_eq!(parse_amount(".5", 6).unwrap(), U256::from(500_000u64));
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        assert!(matches!(parse_amount("1.2.3", 18), Err(AmountError::Format(_))));
        assert!(matches!(parse_amount("-1", 18), Err(AmountError::Format(_))));
        assert!(matches!(parse_amount("", 18), Err(AmountError::Format(_))));
        assert_eq!(parse_amount("0.1234567", 6), Err(AmountError::Precision(6)));
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(U256::from(1_000_000_000_000_000_000u64), 18), "1");
        assert_eq!(
            format_amount(U256::from(49_750_000_000_000_000u64), 18),
            "0.04975"
        );
        assert_eq!(format_amount(U256::ZERO, 18), "0");
        assert_eq!(format_amount(U256::from(1u64), 18), "0.000000000000000001");
    }

    #[test]
    fn test_decimal_serde_accepts_hex() {
        #[derive(serde::Deserialize, serde::Serialize)]
        struct Wrapper {
            #[serde(with = "u256_decimal")]
            value: U256,
        }

        let parsed: Wrapper = serde_json::from_str(r#"{"value":"0x10"}"#).unwrap();
        assert_eq!(parsed.value, U256::from(16u64));

        let json = serde_json::to_string(&Wrapper { value: U256::from(1234u64) }).unwrap();
        assert_eq!(json, r#"{"value":"1234"}"#);
    }
}
