use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Live presence of a room
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomPresenceResponse {
    pub code: String,
    pub active_users: usize,
    pub last_activity: Option<DateTime<Utc>>,
}
