//! x402 facilitator HTTP server for Avalanche USDC.
//!
//! # Usage
//!
//! ```bash
//! # Run with config.toml (if present), .env and the environment
//! cargo run -p avax402-facilitator --release
//!
//! # Run with a custom config path
//! avax402-facilitator --config /etc/avax402/config.toml
//!
//! # Configure logging level
//! RUST_LOG=debug avax402-facilitator
//! ```
//!
//! See [`avax402_facilitator::config`] for every setting.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use avax402_evm::AvalancheExactFacilitator;
use avax402_evm::chain::Eip155ChainProvider;
use axum::http::{HeaderValue, Method};
use axum::{Json, Router};
use clap::Parser;
use tower_http::cors::{self, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use avax402_facilitator::config::FacilitatorConfig;
use avax402_facilitator::handlers::{FacilitatorState, facilitator_router};
use avax402_facilitator::util::SigDown;

/// x402 payment facilitator for USDC on Avalanche.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, short, env = "CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    // .env is optional; real environment variables take precedence.
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run(args).await {
        tracing::error!("Facilitator failed: {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = FacilitatorConfig::load(args.config.as_deref())?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        network = %config.network,
        rpc = %config.rpc_url,
        receiver = %config.receiver,
        signer = %config.signer.address(),
        policy = ?config.verification_policy,
        "Loaded configuration"
    );

    let chain = Eip155ChainProvider::connect(
        config.signer.clone(),
        config.rpc_url.clone(),
        config.confirmations,
    );
    let facilitator = AvalancheExactFacilitator::new(chain, config.network, config.receiver)
        .with_policy(config.verification_policy)
        .with_receipt_timeout(config.receipt_timeout);
    let state: FacilitatorState<Eip155ChainProvider> = Arc::new(facilitator);

    let app = Router::new()
        .merge(facilitator_router(state))
        .route("/health", axum::routing::get(health))
        .layer(cors_layer(&config.cors_origins)?)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Facilitator listening on http://{addr}");

    let sig_down = SigDown::try_new()?;
    let served = axum::serve(listener, app)
        .with_graceful_shutdown({
            let sig_down = sig_down.clone();
            async move { sig_down.cancelled().await }
        })
        .await;
    sig_down.shutdown();
    served?;

    tracing::info!("Facilitator shut down gracefully");
    Ok(())
}

/// Allows the configured origins, or any origin when none are configured.
fn cors_layer(origins: &[String]) -> Result<CorsLayer, Box<dyn std::error::Error>> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(cors::Any);
    if origins.is_empty() {
        return Ok(layer.allow_origin(cors::Any));
    }
    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).map_err(|e| format!("invalid CORS origin `{origin}`: {e}"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(layer.allow_origin(origins))
}

/// Health check endpoint.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
