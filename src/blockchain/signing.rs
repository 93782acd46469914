// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction signing capability for the sponsor-pays flow.
//!
//! Core logic only sees [`TransactionSigner`]. The production implementation
//! wraps a local secp256k1 key loaded from hex or PEM key material; tests
//! substitute their own signer.

use alloy::{
    consensus::{SignableTransaction, TxEnvelope, TxLegacy},
    eips::eip2718::Encodable2718,
    network::TxSignerSync,
    primitives::{Address, Bytes, TxKind, U256},
    signers::{local::PrivateKeySigner, Signer},
};
use k256::SecretKey;

/// A fully specified legacy transaction ready to be signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignableTransfer {
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SigningError {
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Signing failed: {0}")]
    Signer(String),
}

/// Injected signing capability: `sign(transaction) -> signed_bytes`.
pub trait TransactionSigner: Send + Sync {
    /// Address the signatures recover to.
    fn address(&self) -> Address;

    /// Sign and return the EIP-2718 encoded raw transaction.
    fn sign(&self, tx: &SignableTransfer) -> Result<Bytes, SigningError>;
}

/// Signer backed by an in-process secp256k1 key.
pub struct LocalKeySigner {
    inner: PrivateKeySigner,
}

impl std::fmt::Debug for LocalKeySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalKeySigner")
            .field("address", &self.inner.address())
            .finish_non_exhaustive()
    }
}

impl LocalKeySigner {
    /// Create a signer from a hex private key, with or without `0x`.
    pub fn from_hex(private_key_hex: &str) -> Result<Self, SigningError> {
        let trimmed = private_key_hex.trim();
        let hex = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let key_bytes = alloy::hex::decode(hex)
            .map_err(|e| SigningError::InvalidPrivateKey(e.to_string()))?;

        let inner = PrivateKeySigner::from_slice(&key_bytes)
            .map_err(|e| SigningError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Create a signer from PEM-encoded key material (SEC1 or PKCS#8).
    pub fn from_pem(pem_bytes: &[u8]) -> Result<Self, SigningError> {
        Self::from_hex(&pem_to_hex(pem_bytes)?)
    }

    /// Accept either encoding, choosing by the PEM armour line.
    pub fn from_key_material(material: &str) -> Result<Self, SigningError> {
        if material.contains("-----BEGIN") {
            Self::from_pem(material.as_bytes())
        } else {
            Self::from_hex(material)
        }
    }
}

impl TransactionSigner for LocalKeySigner {
    fn address(&self) -> Address {
        self.inner.address()
    }

    fn sign(&self, tx: &SignableTransfer) -> Result<Bytes, SigningError> {
        let mut legacy = TxLegacy {
            chain_id: Some(tx.chain_id),
            nonce: tx.nonce,
            gas_price: tx.gas_price,
            gas_limit: tx.gas_limit,
            to: TxKind::Call(tx.to),
            value: tx.value,
            input: tx.data.clone(),
        };

        let signature = self
            .inner
            .sign_transaction_sync(&mut legacy)
            .map_err(|e| SigningError::Signer(e.to_string()))?;

        let envelope = TxEnvelope::Legacy(legacy.into_signed(signature));
        Ok(Bytes::from(envelope.encoded_2718()))
    }
}

/// Parse a private key from PEM format to a hex string.
pub fn pem_to_hex(pem_bytes: &[u8]) -> Result<String, SigningError> {
    let pem_str = std::str::from_utf8(pem_bytes)
        .map_err(|e| SigningError::InvalidPrivateKey(format!("Invalid UTF-8: {}", e)))?;

    let pem = pem::parse(pem_str)
        .map_err(|e| SigningError::InvalidPrivateKey(format!("Invalid PEM: {}", e)))?;

    let secret_key = SecretKey::from_sec1_der(pem.contents())
        .or_else(|_| {
            use k256::pkcs8::DecodePrivateKey;
            SecretKey::from_pkcs8_der(pem.contents()).map_err(|e| e.to_string())
        })
        .map_err(|e| SigningError::InvalidPrivateKey(format!("Invalid key format: {}", e)))?;

    Ok(alloy::hex::encode(secret_key.to_bytes()))
}
