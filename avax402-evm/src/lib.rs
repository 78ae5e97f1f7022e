#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Avalanche C-Chain settlement for the x402 `exact` scheme.
//!
//! Payments are ERC-3009 `transferWithAuthorization` messages signed by the
//! payer. The facilitator verifies them against its configuration and submits
//! the transfer to the USDC contract from its own funded account.
//!
//! # Modules
//!
//! - [`networks`] - Avalanche networks and their USDC deployments
//! - [`supported`] - Static registry of supported networks, methods and tokens
//! - [`signature`] - Splitting 65-byte signatures into `(v, r, s)`
//! - [`chain`] - The [`SettlementChain`](chain::SettlementChain) seam and its alloy implementation
//! - [`exact`] - The exact-scheme facilitator and its settlement pipeline
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation

pub mod chain;
pub mod exact;
pub mod networks;
pub mod signature;
pub mod supported;

pub use exact::facilitator::{AvalancheExactFacilitator, Balance, VerificationPolicy};
pub use networks::AvalancheNetwork;
