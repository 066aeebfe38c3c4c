//! Handy API Server Entry Point
//!
//! Reads configuration from the environment, builds an in-memory
//! marketplace and serves the Axum router until Ctrl-C.

use std::net::SocketAddr;

use axum::Router;
use handy_api::telemetry::{init_tracing, TelemetryConfig};
use handy_api::{create_api_router, ApiConfig, ApiError, ApiResult, AuthConfig};
use handy_core::HandyError;
use handy_market::Marketplace;

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::from_env();
    init_tracing(&telemetry_config)?;

    let api_config = ApiConfig::from_env().map_err(HandyError::from)?;
    let auth_config = AuthConfig::from_env();

    let marketplace = Marketplace::in_memory(api_config.market.clone())?;
    let app: Router = create_api_router(marketplace, &api_config, auth_config)?;

    let addr = api_config.bind_addr;
    tracing::info!(%addr, "Starting Handy API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    );
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
