#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for the x402 Avalanche facilitator.
//!
//! This crate holds the chain-agnostic half of the facilitator protocol
//! engine: the wire representations of payment authorizations and
//! requirements, their schema-validating decoder, the requirement matcher and
//! the normalized verify/settle result shapes returned to clients.
//!
//! # Modules
//!
//! - [`proto`] - Wire format types, the decoding codec and result shapes
//! - [`matcher`] - Network and receiver checks against facilitator configuration
//! - [`timestamp`] - Clock readings for authorization window checks
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation

pub mod matcher;
pub mod proto;
pub mod timestamp;

pub use matcher::{MatchOutcome, match_payload};
pub use proto::{
    ExactPayload, PaymentAuthorization, PaymentPayload, PaymentRequest, PaymentRequirement,
    SchemaError, SettleRequest, SettlementResult, VerificationResult, VerifyRequest,
};
pub use timestamp::UnixTimestamp;
