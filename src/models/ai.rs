use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request to complete text at a cursor position
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AiRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(rename = "documentId", default)]
    pub doc_id: i64,
    #[serde(default)]
    pub room_code: String,
    #[serde(default)]
    pub cursor_position: i64,
}
