use axum::{extract::{Path, State}, Json};

use crate::models::RoomPresenceResponse;
use crate::state::AppState;

/// Live presence of a room. Rooms nobody has joined report zero users.
pub async fn room_presence(
    State(state): State<AppState>,
    Path(room_code): Path<String>,
) -> Json<RoomPresenceResponse> {
    let (active_users, last_activity) = match state.registry.get(&room_code).await {
        Some(room) => (room.active_users().await, Some(room.last_activity().await)),
        None => (0, None),
    };

    Json(RoomPresenceResponse {
        code: room_code,
        active_users,
        last_activity,
    })
}
