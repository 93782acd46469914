// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use alloy::primitives::Address;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    blockchain::{
        address::parse_address,
        types::{ChainEndpoint, UnknownChain},
    },
    error::ValidationError,
    fees::{FeeBase, FeePolicy, FeeSplit},
    models::{
        ChainInfo, ChainsResponse, EstimateResponse, PrepareResponse, ScanRequest, ScanResponse,
        SettlementRequest, SponsorTopUpRequest, SuppliedBalance,
    },
    scanner::{BalanceResult, ScanSummary},
    settlement::{
        ChainEstimate, ChainSettlement, DescriptorKind, SettlementSummary, SkippedChain,
        TransactionDescriptor,
    },
    sponsor::{SignedTopUp, SponsorPlan},
    state::AppState,
};

pub mod health;
pub mod scan;
pub mod settle;
pub mod sponsor;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/chains", get(scan::list_chains))
        .route("/scan", post(scan::scan))
        .route("/estimate", post(settle::estimate))
        .route("/prepare", post(settle::prepare))
        .route("/sponsor/top-ups", post(sponsor::sponsor_top_ups))
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .with_state(state);

    let request_id = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id());

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(request_id)
        .layer(CorsLayer::permissive())
}

/// Validate an address field from a request body.
fn parse_field(field: &'static str, raw: &str) -> Result<Address, ValidationError> {
    parse_address(raw).map_err(|source| ValidationError::Address { field, source })
}

/// Resolve a chain selection; an explicit empty list is rejected.
fn resolve_chains(
    state: &AppState,
    selection: Option<&[String]>,
) -> Result<Vec<ChainEndpoint>, ValidationError> {
    let chains = state.registry.resolve(selection)?;
    if chains.is_empty() {
        return Err(ValidationError::NoChains);
    }
    Ok(chains)
}

/// Requested destination, else the configured default.
fn resolve_destination(
    state: &AppState,
    requested: Option<&str>,
) -> Result<Option<ChainEndpoint>, ValidationError> {
    match state.destination(requested) {
        None => Ok(None),
        Some(key) => state
            .chain(key)
            .cloned()
            .map(Some)
            .ok_or_else(|| UnknownChain(key.to_string()).into()),
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        scan::list_chains,
        scan::scan,
        settle::estimate,
        settle::prepare,
        sponsor::sponsor_top_ups,
        health::health,
        health::liveness
    ),
    components(
        schemas(
            ChainInfo,
            ChainsResponse,
            ScanRequest,
            ScanResponse,
            BalanceResult,
            ScanSummary,
            SettlementRequest,
            SuppliedBalance,
            EstimateResponse,
            PrepareResponse,
            ChainEstimate,
            ChainSettlement,
            SettlementSummary,
            SkippedChain,
            FeeSplit,
            FeePolicy,
            FeeBase,
            TransactionDescriptor,
            DescriptorKind,
            SponsorTopUpRequest,
            SponsorPlan,
            SignedTopUp,
            health::ReadyResponse,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Chains", description = "Configured chain catalogue"),
        (name = "Scan", description = "Multi-chain native balance scans"),
        (name = "Settlement", description = "Fee estimates and unsigned transaction descriptors"),
        (name = "Sponsor", description = "Sponsor-paid gas top-ups"),
        (name = "Health", description = "Service health")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Arc};

    use alloy::primitives::U256;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        config::ServiceConfig,
        mocks::{test_quote, MockBridgeQuoter, MockChainRpc, DEV_KEY},
        providers::bridge::BridgeError,
    };

    const FEE_WALLET: &str = "0x000000000000000000000000000000000000fee1";
    const USER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
    const RECIPIENT: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

    fn one_eth() -> U256 {
        U256::from(1_000_000_000_000_000_000u64)
    }

    fn state_with(rpc: MockChainRpc, quoter: MockBridgeQuoter, extra: &[(&str, &str)]) -> AppState {
        let mut vars: HashMap<String, String> =
            HashMap::from([("FEE_WALLET".to_string(), FEE_WALLET.to_string())]);
        vars.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        let config = ServiceConfig::from_lookup(|name| vars.get(name).cloned()).unwrap();
        AppState::new(&config, Arc::new(rpc), Arc::new(quoter))
    }

    fn app(rpc: MockChainRpc) -> Router {
        router(state_with(rpc, MockBridgeQuoter::failing(BridgeError::NoRoute), &[]))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        read(response).await
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        read(response).await
    }

    async fn read(response: axum::response::Response) -> (StatusCode, Value) {
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn lists_configured_chains_without_rpc_urls() {
        let (status, body) = get_json(app(MockChainRpc::new()), "/v1/chains").await;

        assert_eq!(status, StatusCode::OK);
        let chains = body["chains"].as_array().unwrap();
        assert_eq!(chains.len(), 15);
        assert_eq!(chains[0]["key"], "ethereum");
        assert!(chains[0].get("rpc_url").is_none());
    }

    #[tokio::test]
    async fn scan_rejects_malformed_address() {
        let (status, body) = post_json(
            app(MockChainRpc::new()),
            "/v1/scan",
            json!({"address": "0x1234"}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("address"));
    }

    #[tokio::test]
    async fn scan_rejects_unknown_chain() {
        let (status, body) = post_json(
            app(MockChainRpc::new()),
            "/v1/scan",
            json!({"address": USER, "chains": ["base", "atlantis"]}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("atlantis"));
    }

    #[tokio::test]
    async fn scan_reports_every_requested_chain() {
        let rpc = MockChainRpc::new()
            .with_balance("base", one_eth())
            .with_error("optimism", "connection refused");

        let (status, body) = post_json(
            app(rpc),
            "/v1/scan",
            json!({"address": USER.to_lowercase(), "chains": ["optimism", "base", "arbitrum", "base"]}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["address"], USER);
        let balances = body["balances"].as_array().unwrap();
        assert_eq!(balances.len(), 3);
        assert_eq!(balances[0]["chain"], "base");
        assert_eq!(balances[0]["balance_raw"], "1000000000000000000");
        let optimism = balances.iter().find(|b| b["chain"] == "optimism").unwrap();
        assert_eq!(optimism["balance_raw"], "0");
        assert!(optimism["error"].as_str().unwrap().contains("connection refused"));
        assert_eq!(body["summary"]["chains_scanned"], 3);
        assert_eq!(body["summary"]["chains_failed"], 1);
    }

    #[tokio::test]
    async fn estimate_with_supplied_balances_settles_in_place() {
        let (status, body) = post_json(
            app(MockChainRpc::new()),
            "/v1/estimate",
            json!({
                "from_address": USER,
                "balances": [
                    {"chain": "base", "balance_raw": "1000000000000000000"},
                    {"chain": "arbitrum", "balance_raw": "1000"}
                ]
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let estimates = body["estimates"].as_array().unwrap();
        assert_eq!(estimates.len(), 1, "sub-threshold arbitrum balance is dropped");
        assert_eq!(estimates[0]["chain"], "base");
        assert_eq!(estimates[0]["destination_chain"], "base");
        assert_eq!(estimates[0]["gas_reserve"], "0");
        assert_eq!(body["summary"]["count"], 1);
    }

    #[tokio::test]
    async fn estimate_rejects_duplicate_balances() {
        let (status, _) = post_json(
            app(MockChainRpc::new()),
            "/v1/estimate",
            json!({
                "from_address": USER,
                "balances": [
                    {"chain": "base", "balance_raw": "1"},
                    {"chain": "base", "balance_raw": "2"}
                ]
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn prepare_requires_recipient() {
        let (status, body) = post_json(
            app(MockChainRpc::new()),
            "/v1/prepare",
            json!({"from_address": USER}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "to_address is required");
    }

    #[tokio::test]
    async fn prepare_bridges_to_destination() {
        let rpc = MockChainRpc::new().with_balance("base", one_eth());
        let quoter = MockBridgeQuoter::returning(test_quote());
        let app = router(state_with(rpc, quoter.clone(), &[]));

        let (status, body) = post_json(
            app,
            "/v1/prepare",
            json!({
                "from_address": USER,
                "to_address": RECIPIENT,
                "destination_chain": "ethereum",
                "chains": ["base", "ethereum"]
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let txs = body["transactions"].as_array().unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0]["kind"], "fee");
        assert_eq!(txs[0]["to"].as_str().unwrap().to_lowercase(), FEE_WALLET);
        assert_eq!(txs[1]["kind"], "bridge");
        assert_eq!(txs[1]["data"], "0xdeadbeef");
        assert_eq!(quoter.requests().len(), 1);
        assert_eq!(quoter.requests()[0].to_chain_id, 1);
    }

    #[tokio::test]
    async fn sponsor_without_key_is_unavailable() {
        let (status, _) = post_json(
            app(MockChainRpc::new()),
            "/v1/sponsor/top-ups",
            json!({"address": USER, "destination_chain": "ethereum"}),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn sponsor_signs_top_ups() {
        let state = state_with(
            MockChainRpc::new(),
            MockBridgeQuoter::failing(BridgeError::NoRoute),
            &[("SPONSOR_ENABLED", "true"), ("SPONSOR_PRIVATE_KEY", DEV_KEY)],
        );

        let (status, _) = post_json(
            router(state.clone()),
            "/v1/sponsor/top-ups",
            json!({"address": RECIPIENT, "chains": ["base", "optimism", "ethereum"]}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "destination is required");

        let (status, body) = post_json(
            router(state),
            "/v1/sponsor/top-ups",
            json!({
                "address": RECIPIENT,
                "destination_chain": "ethereum",
                "chains": ["base", "optimism", "ethereum"]
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["sponsor"].as_str().unwrap().to_lowercase(), USER.to_lowercase());
        assert_eq!(body["top_ups"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn sponsored_prepare_repays_sponsor() {
        let request = json!({
            "from_address": USER,
            "to_address": RECIPIENT,
            "destination_chain": "ethereum",
            "chains": ["base"],
            "sponsored": true
        });
        let rpc = || MockChainRpc::new().with_balance("base", one_eth());

        let (status, _) = post_json(app(rpc()), "/v1/prepare", request.clone()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let state = state_with(
            rpc(),
            MockBridgeQuoter::returning(test_quote()),
            &[("SPONSOR_ENABLED", "true"), ("SPONSOR_PRIVATE_KEY", DEV_KEY)],
        );
        let (status, body) = post_json(router(state), "/v1/prepare", request).await;

        assert_eq!(status, StatusCode::OK, "{body}");
        let txs = body["transactions"].as_array().unwrap();
        assert_eq!(txs.len(), 3);
        assert_eq!(txs[2]["kind"], "reimbursement");
        assert_eq!(txs[2]["to"].as_str().unwrap().to_lowercase(), USER.to_lowercase());
        assert_eq!(txs[2]["value"], body["settlements"][0]["gas_reserve"]);
    }

    #[tokio::test]
    async fn health_reports_configuration() {
        let (status, body) = get_json(app(MockChainRpc::new()), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["chains"], 15);
        assert_eq!(body["sponsor_enabled"], false);

        let (status, _) = get_json(app(MockChainRpc::new()), "/health/live").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let response = app(MockChainRpc::new())
            .oneshot(Request::builder().uri("/health/live").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.headers().contains_key("x-request-id"));
    }
}
