//! Axum route handlers for the facilitator service.
//!
//! `/verify` and `/settle` read the raw body and run it through the
//! schema-validating decoder, so a malformed request is reported with the
//! path of the offending field rather than a generic deserialization error.

use std::sync::Arc;

use avax402::proto::{
    SettlementResult, VerificationResult, decode_settle_request, decode_verify_request,
};
use avax402_evm::chain::SettlementChain;
use avax402_evm::supported::SupportedFilter;
use avax402_evm::{AvalancheExactFacilitator, Balance};
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::FacilitatorError;

/// Shared application state for the facilitator service.
pub type FacilitatorState<C> = Arc<AvalancheExactFacilitator<C>>;

/// Query parameters accepted by `GET /supported`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedQuery {
    /// Decimal chain ID.
    pub chain_id: Option<String>,
    /// Token contract address.
    pub token_address: Option<String>,
}

impl From<SupportedQuery> for SupportedFilter {
    fn from(query: SupportedQuery) -> Self {
        Self {
            chain_id: query.chain_id,
            token_address: query.token_address,
        }
    }
}

/// `GET /supported` - Lists supported networks, methods and tokens.
///
/// # Errors
///
/// Returns 500 if the network list cannot be serialized.
pub async fn get_supported<C: SettlementChain>(
    State(fac): State<FacilitatorState<C>>,
    Query(query): Query<SupportedQuery>,
) -> Result<Json<Value>, FacilitatorError> {
    let networks = serde_json::to_value(fac.supported(&query.into()))
        .map_err(|e| FacilitatorError::Internal(format!("failed to encode networks: {e}")))?;
    Ok(Json(json!({ "success": true, "data": { "networks": networks } })))
}

/// `POST /verify` - Checks a payment against the facilitator configuration.
///
/// # Errors
///
/// Returns 400 if the body fails schema validation.
pub async fn post_verify<C: SettlementChain>(
    State(fac): State<FacilitatorState<C>>,
    body: Bytes,
) -> Result<Json<VerificationResult>, FacilitatorError> {
    let request = decode_verify_request(&body).inspect_err(|e| {
        tracing::warn!(field = %e.field, reason = %e.reason, "verify request rejected");
    })?;
    Ok(Json(fac.verify(&request)))
}

/// `POST /settle` - Verifies and settles a payment on-chain.
///
/// # Errors
///
/// Returns 400 if the body fails schema validation.
pub async fn post_settle<C: SettlementChain>(
    State(fac): State<FacilitatorState<C>>,
    body: Bytes,
) -> Result<Json<SettlementResult>, FacilitatorError> {
    let request = decode_settle_request(&body).inspect_err(|e| {
        tracing::warn!(field = %e.field, reason = %e.reason, "settle request rejected");
    })?;
    Ok(Json(fac.settle(&request).await))
}

/// `GET /balance` - Native balance of the settlement account.
///
/// # Errors
///
/// Returns 500 if the RPC call fails.
pub async fn get_balance<C: SettlementChain>(
    State(fac): State<FacilitatorState<C>>,
) -> Result<Json<Balance>, FacilitatorError> {
    fac.balance().await.map(Json).map_err(|e| {
        tracing::error!(error = %e, "balance lookup failed");
        FacilitatorError::Balance(e)
    })
}

/// Creates an Axum [`axum::Router`] with all facilitator endpoints.
///
/// Endpoints:
/// - `GET /supported` - list supported networks and tokens
/// - `POST /verify` - verify a payment
/// - `POST /settle` - settle a payment
/// - `GET /balance` - signer balance
pub fn facilitator_router<C>(state: FacilitatorState<C>) -> axum::Router
where
    C: SettlementChain + 'static,
{
    axum::Router::new()
        .route("/supported", axum::routing::get(get_supported::<C>))
        .route("/verify", axum::routing::post(post_verify::<C>))
        .route("/settle", axum::routing::post(post_settle::<C>))
        .route("/balance", axum::routing::get(get_balance::<C>))
        .with_state(state)
}
