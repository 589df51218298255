use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// A document as listed in a room's sidebar
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct Document {
    pub id: i64,
    pub title: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct DocumentListResponse {
    pub documents: Vec<Document>,
}

#[derive(Serialize, Deserialize, Default, ToSchema)]
pub struct CreateDocumentRequest {
    #[serde(default)]
    pub title: String,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RoomCodeQuery {
    pub room_code: Option<String>,
}
