use axum::{
    extract::{ws::WebSocketUpgrade, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::StreamExt;
use serde::Deserialize;
use tracing::{info, warn};

use super::session::{run_session, SessionSettings};
use crate::config::Config;
use crate::models::ErrorResponse;
use crate::state::AppState;

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionQuery {
    pub room_code: Option<String>,
    pub doc_id: Option<String>,
}

/// Validate the admission parameters into `(room_code, doc_id)`
pub fn parse_admission(query: &AdmissionQuery) -> Result<(String, i64), &'static str> {
    let room_code = query.room_code.as_deref().map(str::trim).unwrap_or_default();
    let doc_id = query.doc_id.as_deref().map(str::trim).unwrap_or_default();

    if room_code.is_empty() || doc_id.is_empty() {
        return Err("document id and room code are required");
    }

    let doc_id = doc_id
        .parse::<i64>()
        .map_err(|_| "document id must be a number")?;

    Ok((room_code.to_string(), doc_id))
}

/// Outside production every origin is accepted; in production only `prod_app_url`
pub fn origin_allowed(config: &Config, headers: &HeaderMap) -> bool {
    if !config.is_production() {
        return true;
    }
    let Some(allowed) = config.prod_app_url.as_deref() else {
        return false;
    };
    headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(|origin| origin == allowed.trim_end_matches('/'))
        .unwrap_or(false)
}

/// WebSocket admission: `GET /api/ws?roomCode=..&docId=..`
pub async fn websocket_handler(
    State(state): State<AppState>,
    Query(query): Query<AdmissionQuery>,
    headers: HeaderMap,
    ws: Option<WebSocketUpgrade>,
) -> Response {
    let (room_code, doc_id) = match parse_admission(&query) {
        Ok(admission) => admission,
        Err(message) => return ErrorResponse::reply(StatusCode::BAD_REQUEST, message).into_response(),
    };

    if !origin_allowed(&state.config, &headers) {
        warn!("Rejected websocket origin {:?} for room {}", headers.get(header::ORIGIN), room_code);
        return ErrorResponse::reply(StatusCode::FORBIDDEN, "origin not allowed").into_response();
    }

    let Some(ws) = ws else {
        return ErrorResponse::reply(StatusCode::BAD_REQUEST, "Expected WebSocket upgrade request")
            .into_response();
    };

    info!("New WebSocket connection for room {} doc {}", room_code, doc_id);
    let settings = SessionSettings::from_config(&state.config);

    ws.on_upgrade(move |socket| async move {
        let room = state.registry.get_or_create(&room_code).await;
        let (sink, stream) = socket.split();
        run_session(sink, stream, room, doc_id, state.store.clone(), settings).await;
    })
}
