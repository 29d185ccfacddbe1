//! HTTP routes
//!
//! - `GET /ws?id=<id>&role=<role>`: WebSocket upgrade for a participant
//! - `GET /list`: currently connected participants as `[{id, role}]`
//! - `GET /health`: liveness probe
//! - `GET /stats`: relay counters

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::registry::{DuplicateIdPolicy, ParticipantInfo};
use crate::server::session::Session;
use crate::server::state::RelayState;
use crate::stats::StatsSnapshot;

/// Registration inputs supplied on the upgrade request
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    /// Participant id (required, non-empty)
    #[serde(default)]
    pub id: String,
    /// Participant role (optional)
    #[serde(default)]
    pub role: String,
}

/// Body of `GET /stats`
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    /// Currently registered participants
    pub participants: usize,
    #[serde(flatten)]
    pub stats: StatsSnapshot,
}

/// Build the axum router for the relay
pub fn app(state: RelayState) -> Router {
    Router::new()
        .route("/ws", get(ws_upgrade))
        .route("/list", get(list_participants))
        .route("/health", get(health))
        .route("/stats", get(stats))
        .with_state(state)
}

/// GET /ws?id=<id>&role=<role>
///
/// Rejects a missing id before upgrading. On success the session registers
/// the participant and runs until the socket closes.
async fn ws_upgrade(
    State(state): State<RelayState>,
    Query(params): Query<ConnectQuery>,
    ws: Option<WebSocketUpgrade>,
) -> Response {
    if params.id.is_empty() {
        state.stats.record_connection_rejected();
        tracing::warn!("Connection rejected: missing id");
        return (StatusCode::BAD_REQUEST, "missing id").into_response();
    }

    let Some(ws) = ws else {
        return (StatusCode::UPGRADE_REQUIRED, "websocket upgrade required").into_response();
    };

    if state.registry.config().duplicate_policy == DuplicateIdPolicy::Reject
        && state.registry.lookup(&params.id).await.is_some()
    {
        state.stats.record_connection_rejected();
        tracing::warn!(id = %params.id, "Connection rejected: id already in use");
        return (StatusCode::CONFLICT, "id already registered").into_response();
    }

    let Ok(permit) = state.try_acquire_slot() else {
        state.stats.record_connection_rejected();
        tracing::warn!(id = %params.id, "Connection rejected: limit reached");
        return (StatusCode::SERVICE_UNAVAILABLE, "connection limit reached").into_response();
    };

    let session_id = state.next_session_id();
    tracing::debug!(session_id = session_id, id = %params.id, "Upgrading connection");

    // Taken before the upgrade so shutdown also waits for a session that has
    // not started yet
    let tracked = state.sessions().token();

    ws.on_upgrade(move |socket| async move {
        let _permit = permit;
        let _tracked = tracked;
        Session::new(session_id, params.id, params.role, state)
            .run(socket)
            .await;
    })
}

/// GET /list
async fn list_participants(State(state): State<RelayState>) -> Json<Vec<ParticipantInfo>> {
    Json(state.registry.snapshot().await)
}

/// GET /health
async fn health() -> &'static str {
    "OK"
}

/// GET /stats
async fn stats(State(state): State<RelayState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        participants: state.registry.len().await,
        stats: state.stats.snapshot(),
    })
}
