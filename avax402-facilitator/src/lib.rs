//! x402 facilitator server for USDC payments on Avalanche.
//!
//! Exposes [`avax402_evm::AvalancheExactFacilitator`] over HTTP with axum.
//!
//! # Modules
//!
//! - [`handlers`] - Axum route handlers and router builder
//! - [`error`] - HTTP error envelope
//! - [`config`] - Configuration from TOML, `.env` and environment variables
//! - [`util`] - Graceful shutdown

pub mod config;
pub mod error;
pub mod handlers;
pub mod util;

pub use handlers::{FacilitatorState, facilitator_router};
