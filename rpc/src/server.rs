//! Axum router and server.

use axum::routing::{get, post};
use axum::Router;
use landgrab_geofence::GeofenceOracle;
use landgrab_verification::{ParcelService, VerificationWorkflow};
use prometheus::Registry;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::handlers;

/// Everything the handlers need, built once by the node.
#[derive(Clone)]
pub struct ApiState {
    pub workflow: Arc<VerificationWorkflow>,
    pub parcels: Arc<ParcelService>,
    pub oracle: Arc<dyn GeofenceOracle>,
    pub listener_enabled: bool,
    pub registry: Registry,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route("/api/settings/mode", get(handlers::mode))
        .route("/api/what3words/convert-to-3wa", get(handlers::convert_to_3wa))
        .route("/api/what3words/convert-to-coordinates", get(handlers::convert_to_coordinates))
        .route("/api/what3words/adjacent", get(handlers::adjacent))
        .route("/api/what3words/check-location", get(handlers::check_location))
        .route("/api/blockchain/land-info/:code", get(handlers::land_info))
        .route("/api/blockchain/user-lands/:address", get(handlers::user_lands))
        .route("/api/blockchain/requests/:request_id", get(handlers::request_status))
        .route("/api/blockchain/verify-location", post(handlers::verify_location))
        .route("/api/blockchain/propose-swap", post(handlers::propose_swap))
        .route("/api/blockchain/release-land", post(handlers::release_land))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve on `0.0.0.0:port` until `shutdown` resolves.
pub async fn serve<F>(state: ApiState, port: u16, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!(addr = %listener.local_addr()?, "REST server listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
