//! Wire format types for x402 facilitator messages.
//!
//! Clients send a [`PaymentRequest`] to `/verify` or `/settle`: a signed
//! [`PaymentPayload`] together with the [`PaymentRequirement`] it is meant to
//! satisfy. The facilitator answers with a [`VerificationResult`] or a
//! [`SettlementResult`].
//!
//! # Decoding
//!
//! Incoming bodies are decoded through [`codec`], which validates the shape of
//! every field and reports failures as a [`SchemaError`] naming the dotted
//! field path. The structs here only hold values that already passed those
//! checks, so downstream code never re-validates hex prefixes or lengths.
//!
//! # Wire Format
//!
//! All types serialize to JSON using camelCase field names. Amounts and
//! timestamps travel as decimal strings, hashes and nonces as `0x`-prefixed
//! lowercase hex.

use alloy_primitives::{Address, B256, U256};
use serde::{Serialize, Serializer};

pub mod codec;
mod error;
mod response;

pub use codec::{
    decode_payment_payload, decode_payment_requirement, decode_settle_request,
    decode_verify_request,
};
pub use error::SchemaError;
pub use response::{SettlementResult, VerificationResult};

/// The only payment scheme this facilitator settles.
pub const EXACT_SCHEME: &str = "exact";

/// An ERC-3009 `transferWithAuthorization` message signed by the payer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAuthorization {
    /// The payer.
    pub from: Address,
    /// The payee.
    pub to: Address,
    /// Amount in the token's smallest unit.
    #[serde(serialize_with = "serialize_decimal")]
    pub value: U256,
    /// Start of the validity window in unix seconds (inclusive).
    ///
    /// Held at full `uint256` width, as the contract takes it.
    #[serde(serialize_with = "serialize_decimal")]
    pub valid_after: U256,
    /// End of the validity window in unix seconds (exclusive).
    #[serde(serialize_with = "serialize_decimal")]
    pub valid_before: U256,
    /// Unique 32-byte nonce consumed by the token contract.
    pub nonce: B256,
}

/// Scheme-specific body of a payment payload for the `exact` scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExactPayload {
    /// `0x`-prefixed hex signature over the authorization.
    ///
    /// Only the prefix and hex alphabet are checked at decode time; splitting
    /// into `(v, r, s)` happens at settlement.
    pub signature: String,
    /// The signed authorization.
    pub authorization: PaymentAuthorization,
}

/// A client-constructed payment proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    /// Protocol version declared by the client.
    pub x402_version: u64,
    /// Payment scheme, normally [`EXACT_SCHEME`].
    pub scheme: String,
    /// Network identifier such as `avalanche-fuji`.
    pub network: String,
    /// Signature and authorization.
    pub payload: ExactPayload,
}

impl PaymentPayload {
    /// Shorthand for `self.payload.authorization`.
    #[must_use]
    pub const fn authorization(&self) -> &PaymentAuthorization {
        &self.payload.authorization
    }
}

/// What the resource server asks to be paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirement {
    /// Payment scheme.
    pub scheme: String,
    /// Network identifier.
    pub network: String,
    /// Minimum amount in the token's smallest unit.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_optional_decimal"
    )]
    pub max_amount_required: Option<U256>,
    /// Receiving address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pay_to: Option<Address>,
    /// Token contract address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset: Option<Address>,
    /// URL of the protected resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    /// Human-readable description of the resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// MIME type of the resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Upper bound on how long settlement may take, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_timeout_seconds: Option<u64>,
}

/// Body of a `/verify` or `/settle` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    /// Protocol version of the envelope.
    pub x402_version: u64,
    /// The signed payment.
    pub payment_payload: PaymentPayload,
    /// The requirement the payment should satisfy.
    pub payment_requirements: PaymentRequirement,
}

/// Request to verify a payment without settling it.
pub type VerifyRequest = PaymentRequest;

/// Request to settle a payment on-chain. Same shape as [`VerifyRequest`].
pub type SettleRequest = PaymentRequest;

fn serialize_decimal<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

#[allow(clippy::ref_option)]
fn serialize_optional_decimal<S: Serializer>(
    value: &Option<U256>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(value) => serializer.collect_str(value),
        None => serializer.serialize_none(),
    }
}
