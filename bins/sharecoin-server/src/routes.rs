//! Axum router and HTTP handlers.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use sharecoin_sim::error::ControlError;
use sharecoin_sim::UserAddress;

use crate::AppState;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/startMining", post(start_mining))
        .route("/api/stopMining", post(stop_mining))
        .route("/api/minerStats", get(miner_stats))
        .route("/api/clearMinedBlocks", post(clear_mined_blocks))
        .route("/api/networkHashRate", get(network_hash_rate))
        .route("/api/averageBlockTime", get(average_block_time))
        .route("/api/health", get(health))
        .with_state(state)
        .layer(cors)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn control_error(e: ControlError) -> Response {
    let status = match &e {
        ControlError::Address(_) => StatusCode::BAD_REQUEST,
        ControlError::NotSubscribed | ControlError::InvalidPlan(_) => StatusCode::FORBIDDEN,
        ControlError::SessionNotFound => StatusCode::NOT_FOUND,
        ControlError::Gateway(inner) => {
            warn!(error = %inner, "Chain call failed while handling request");
            StatusCode::BAD_GATEWAY
        }
    };
    error_response(status, e.to_string())
}

fn parse_address(raw: Option<&str>) -> Result<UserAddress, Response> {
    UserAddress::parse(raw.unwrap_or_default()).map_err(|e| control_error(e.into()))
}

/// Unwrap a JSON body, turning extractor rejections into a 400 with the
/// usual `{ "error" }` shape.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| error_response(StatusCode::BAD_REQUEST, rejection.body_text()))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartRequest {
    user_address: Option<String>,
    /// Client's idea of its tier. Only logged; the chain decides.
    plan: Option<u64>,
}

/// `POST /api/startMining` — verify the subscription on-chain and activate.
async fn start_mining(
    State(state): State<AppState>,
    payload: Result<Json<StartRequest>, JsonRejection>,
) -> Response {
    let req = match body(payload) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let user = match parse_address(req.user_address.as_deref()) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    match state.service.start(&user, req.plan).await {
        Ok(plan) => Json(json!({ "success": true, "verifiedPlan": plan })).into_response(),
        Err(e) => control_error(e),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StopRequest {
    user_address: Option<String>,
}

/// `POST /api/stopMining`
async fn stop_mining(
    State(state): State<AppState>,
    payload: Result<Json<StopRequest>, JsonRejection>,
) -> Response {
    let user = match body(payload).and_then(|req| parse_address(req.user_address.as_deref())) {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    state.service.stop(&user);
    Json(json!({ "success": true })).into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsQuery {
    user_address: Option<String>,
}

/// `GET /api/minerStats?userAddress=0x...` — session snapshot, empty for
/// addresses that never started.
async fn miner_stats(
    State(state): State<AppState>,
    query: Result<Query<StatsQuery>, QueryRejection>,
) -> Response {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    match parse_address(query.user_address.as_deref()) {
        Ok(user) => Json(state.service.status(&user)).into_response(),
        Err(resp) => resp,
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClearRequest {
    user_address: Option<String>,
    block_numbers: Option<Vec<u64>>,
}

/// `POST /api/clearMinedBlocks` — the client minted these itself; drop them
/// so settlement never resubmits.
async fn clear_mined_blocks(
    State(state): State<AppState>,
    payload: Result<Json<ClearRequest>, JsonRejection>,
) -> Response {
    let req = match body(payload) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let user = match parse_address(req.user_address.as_deref()) {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    let Some(block_numbers) = req.block_numbers else {
        return error_response(StatusCode::BAD_REQUEST, "blockNumbers must be an array");
    };

    match state.service.acknowledge_settled(&user, &block_numbers) {
        Ok(remaining) => {
            Json(json!({ "success": true, "remainingBlocks": remaining })).into_response()
        }
        Err(e) => control_error(e),
    }
}

/// `GET /api/networkHashRate` — sum of nominal rates over active sessions.
async fn network_hash_rate(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "networkHashRate": state.service.network_hash_rate() }))
}

/// `GET /api/averageBlockTime`
async fn average_block_time(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "average": state.service.average_block_interval() }))
}

/// `GET /api/health` — liveness plus a few counters for dashboards.
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let (next_block, sessions, active) = {
        let guard = state.service.state().lock();
        (
            guard.next_block_number(),
            guard.session_count(),
            guard.active_addresses().len(),
        )
    };
    Json(json!({
        "status": "ok",
        "nextBlockNumber": next_block,
        "sessions": sessions,
        "activeSessions": active,
    }))
}
