//! The x402 `exact` scheme on Avalanche.
//!
//! Payments authorize a fixed amount through ERC-3009
//! `transferWithAuthorization` on the network's USDC contract.

pub mod facilitator;
