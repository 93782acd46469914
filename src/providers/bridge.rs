// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cross-chain bridge quote integration.
//!
//! The HTTP client speaks the LI.FI `GET /quote` dialect: native token in,
//! native token out, and a ready-to-sign `transactionRequest` back.

use std::time::Duration;

use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info};

const DEFAULT_BASE_URL: &str = "https://li.quest/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const API_KEY_HEADER: &str = "x-lifi-api-key";
const ERROR_BODY_MAX_LEN: usize = 200;

/// Token address the quote API uses for a chain's native currency.
pub const NATIVE_TOKEN: Address = Address::ZERO;

/// Parameters of one bridge quote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub from_chain_id: u64,
    pub to_chain_id: u64,
    pub from_address: Address,
    pub to_address: Address,
    pub amount: U256,
    pub slippage_bps: u32,
}

/// A route returned by the quote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeQuote {
    /// Contract the bridge call goes to
    pub to: Address,
    /// Native value attached to the call
    pub value: U256,
    /// Opaque call data, passed through verbatim
    pub data: Bytes,
    pub gas_limit: Option<u64>,
    /// Amount expected on the destination chain
    pub estimated_output: U256,
    /// Bridge or DEX the route uses
    pub tool: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    #[error("Bridge quote request failed: {0}")]
    Request(String),

    #[error("Bridge quote service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("No bridge route available")]
    NoRoute,

    #[error("Bridge quote response was invalid: {0}")]
    InvalidResponse(String),
}

/// Bridge-quote collaborator.
#[async_trait]
pub trait BridgeQuoter: Send + Sync {
    async fn quote(&self, request: &QuoteRequest) -> Result<BridgeQuote, BridgeError>;
}

/// Settings for [`HttpBridgeQuoter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub integrator: Option<String>,
    pub timeout: Duration,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            integrator: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpBridgeQuoter {
    base_url: String,
    api_key: Option<String>,
    integrator: Option<String>,
    http: Client,
}

impl HttpBridgeQuoter {
    pub fn new(settings: BridgeSettings) -> Result<Self, BridgeError> {
        let http = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| BridgeError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key,
            integrator: settings.integrator,
            http,
        })
    }

    fn query_params(&self, request: &QuoteRequest) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("fromChain", request.from_chain_id.to_string()),
            ("toChain", request.to_chain_id.to_string()),
            ("fromToken", NATIVE_TOKEN.to_string()),
            ("toToken", NATIVE_TOKEN.to_string()),
            ("fromAddress", request.from_address.to_string()),
            ("toAddress", request.to_address.to_string()),
            ("fromAmount", request.amount.to_string()),
            ("slippage", slippage_fraction(request.slippage_bps)),
        ];
        if let Some(integrator) = &self.integrator {
            params.push(("integrator", integrator.clone()));
        }
        params
    }
}

#[async_trait]
impl BridgeQuoter for HttpBridgeQuoter {
    async fn quote(&self, request: &QuoteRequest) -> Result<BridgeQuote, BridgeError> {
        let url = format!("{}/quote", self.base_url);
        debug!(
            from_chain = request.from_chain_id,
            to_chain = request.to_chain_id,
            amount = %request.amount,
            "Requesting bridge quote"
        );

        let mut builder = self.http.get(&url).query(&self.query_params(request));
        if let Some(key) = &self.api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| BridgeError::Request(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(BridgeError::NoRoute);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::Status {
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_MAX_LEN).collect(),
            });
        }

        let body: QuoteResponse = response
            .json()
            .await
            .map_err(|e| BridgeError::InvalidResponse(e.to_string()))?;
        let quote = BridgeQuote::try_from(body)?;

        info!(
            from_chain = request.from_chain_id,
            to_chain = request.to_chain_id,
            tool = ?quote.tool,
            estimated_output = %quote.estimated_output,
            "Received bridge quote"
        );
        Ok(quote)
    }
}

/// `50` bps → `"0.0050"`.
fn slippage_fraction(bps: u32) -> String {
    format!("{}.{:04}", bps / 10_000, bps % 10_000)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    tool: Option<String>,
    estimate: Option<QuoteEstimate>,
    transaction_request: Option<QuoteTransaction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteEstimate {
    to_amount: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteTransaction {
    to: Address,
    #[serde(default)]
    data: Bytes,
    value: Option<String>,
    gas_limit: Option<String>,
}

fn parse_u256(field: &str, raw: &str) -> Result<U256, BridgeError> {
    raw.trim()
        .parse::<U256>()
        .map_err(|e| BridgeError::InvalidResponse(format!("{field}: {e}")))
}

impl TryFrom<QuoteResponse> for BridgeQuote {
    type Error = BridgeError;

    fn try_from(response: QuoteResponse) -> Result<Self, Self::Error> {
        let tx = response.transaction_request.ok_or(BridgeError::NoRoute)?;

        let value = match tx.value.as_deref() {
            Some(raw) => parse_u256("value", raw)?,
            None => U256::ZERO,
        };
        let gas_limit = match tx.gas_limit.as_deref() {
            Some(raw) => Some(
                u64::try_from(parse_u256("gasLimit", raw)?)
                    .map_err(|_| BridgeError::InvalidResponse("gasLimit overflow".into()))?,
            ),
            None => None,
        };
        let estimated_output = match response.estimate {
            Some(estimate) => parse_u256("toAmount", &estimate.to_amount)?,
            None => U256::ZERO,
        };

        Ok(BridgeQuote {
            to: tx.to,
            value,
            data: tx.data,
            gas_limit,
            estimated_output,
            tool: response.tool,
        })
    }
}
