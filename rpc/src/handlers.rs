//! REST handlers.

use axum::extract::{Path, Query, State};
use axum::Json;
use landgrab_types::{Address, GeoCell, RequestId, RequestStatus, VerificationRequest};
use landgrab_verification::{LandInfo, VerificationError};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::server::ApiState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub mode: &'static str,
    pub listener_enabled: bool,
    pub in_flight_requests: usize,
}

pub async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "landgrab",
        version: env!("CARGO_PKG_VERSION"),
        mode: state.workflow.mode().as_str(),
        listener_enabled: state.listener_enabled,
        in_flight_requests: state.workflow.in_flight().await,
    })
}

pub async fn metrics(State(state): State<ApiState>) -> Result<String, ApiError> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&state.registry.gather(), &mut buffer)
        .map_err(|e| ApiError::Metrics(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| ApiError::Metrics(e.to_string()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeResponse {
    pub mode: &'static str,
    pub use_mock_service: bool,
    pub enable_blockchain_listener: bool,
    pub is_demo_mode: bool,
}

pub async fn mode(State(state): State<ApiState>) -> Json<ModeResponse> {
    let mode = state.workflow.mode();
    Json(ModeResponse {
        mode: mode.as_str(),
        use_mock_service: mode.is_mock(),
        enable_blockchain_listener: state.listener_enabled,
        is_demo_mode: mode.is_mock() && state.listener_enabled,
    })
}

#[derive(Debug, Deserialize)]
pub struct PointQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub words: Option<String>,
}

fn require_point(query: &PointQuery) -> Result<(f64, f64), ApiError> {
    match (query.lat, query.lng) {
        (Some(lat), Some(lng)) => Ok((lat, lng)),
        _ => Err(ApiError::InvalidRequest("missing lat or lng parameters".into())),
    }
}

fn require_words(query: &PointQuery) -> Result<&str, ApiError> {
    query
        .words
        .as_deref()
        .filter(|w| !w.is_empty())
        .ok_or_else(|| ApiError::InvalidRequest("missing words parameter".into()))
}

pub async fn convert_to_3wa(
    State(state): State<ApiState>,
    Query(query): Query<PointQuery>,
) -> Result<Json<Value>, ApiError> {
    let (lat, lng) = require_point(&query)?;
    let words = state.oracle.coords_to_words(lat, lng).await?;
    Ok(Json(json!({ "words": words })))
}

pub async fn convert_to_coordinates(
    State(state): State<ApiState>,
    Query(query): Query<PointQuery>,
) -> Result<Json<GeoCell>, ApiError> {
    let words = require_words(&query)?;
    Ok(Json(state.oracle.words_to_cell(words).await?))
}

pub async fn adjacent(
    State(state): State<ApiState>,
    Query(query): Query<PointQuery>,
) -> Result<Json<Value>, ApiError> {
    let words = require_words(&query)?;
    let adjacent = state.oracle.adjacent_cells(words).await?;
    Ok(Json(json!({ "adjacentSquares": adjacent })))
}

pub async fn check_location(
    State(state): State<ApiState>,
    Query(query): Query<PointQuery>,
) -> Result<Json<Value>, ApiError> {
    let (lat, lng) = require_point(&query)?;
    let words = require_words(&query)?;
    let at_location = state.oracle.is_user_at_location(lat, lng, words).await?;
    Ok(Json(json!({ "isAtLocation": at_location })))
}

pub async fn land_info(State(state): State<ApiState>, Path(code): Path<String>) -> Result<Json<LandInfo>, ApiError> {
    Ok(Json(state.parcels.land_info(&code).await?))
}

fn parse_address(raw: &str) -> Result<Address, ApiError> {
    Address::parse(raw).map_err(|_| ApiError::InvalidRequest(format!("invalid address: {raw}")))
}

pub async fn user_lands(State(state): State<ApiState>, Path(address): Path<String>) -> Result<Json<Value>, ApiError> {
    let owner = parse_address(&address)?;
    let lands = state.parcels.user_lands(owner).await?;
    Ok(Json(json!({ "lands": lands })))
}

fn parse_request_id(raw: &str) -> Result<RequestId, ApiError> {
    RequestId::parse(raw).map_err(|_| ApiError::InvalidRequest(format!("invalid request id: {raw}")))
}

pub async fn request_status(
    State(state): State<ApiState>,
    Path(request_id): Path<String>,
) -> Result<Json<VerificationRequest>, ApiError> {
    let request_id = parse_request_id(&request_id)?;
    state
        .workflow
        .request(request_id)
        .await
        .map(Json)
        .ok_or(ApiError::Verification(VerificationError::UnknownRequest(request_id)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyLocationBody {
    pub request_id: String,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyLocationResponse {
    pub success: bool,
    pub request_id: RequestId,
    pub status: RequestStatus,
}

pub async fn verify_location(
    State(state): State<ApiState>,
    Json(body): Json<VerifyLocationBody>,
) -> Result<Json<VerifyLocationResponse>, ApiError> {
    let request_id = parse_request_id(&body.request_id)?;
    let status = state.workflow.confirm_presence(request_id, body.lat, body.lng).await?;
    Ok(Json(VerifyLocationResponse {
        success: status == RequestStatus::Claimed,
        request_id,
        status,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ProposeSwapBody {
    /// Address of the proposing owner. Required; there is no default sender.
    pub proposer: Option<String>,
    #[serde(rename = "myWhat3Words")]
    pub my_what3words: String,
    #[serde(rename = "receiverAddress")]
    pub receiver_address: String,
    #[serde(rename = "receiverWhat3Words")]
    pub receiver_what3words: String,
}

pub async fn propose_swap(
    State(state): State<ApiState>,
    Json(body): Json<ProposeSwapBody>,
) -> Result<Json<Value>, ApiError> {
    let proposer = body.proposer.as_deref().map(parse_address).transpose()?;
    let receiver = parse_address(&body.receiver_address)?;
    let submitted = state
        .parcels
        .propose_swap(proposer, &body.my_what3words, receiver, &body.receiver_what3words)
        .await?;
    Ok(Json(json!({ "success": true, "data": submitted })))
}

#[derive(Debug, Deserialize)]
pub struct ReleaseBody {
    pub what3words: String,
}

pub async fn release_land(
    State(state): State<ApiState>,
    Json(body): Json<ReleaseBody>,
) -> Result<Json<Value>, ApiError> {
    let tx_hash = state.parcels.release(&body.what3words).await?;
    Ok(Json(json!({ "success": true, "txHash": tx_hash })))
}
