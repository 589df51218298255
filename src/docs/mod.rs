use utoipa::OpenApi;
use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Readiness check endpoint
#[utoipa::path(
    get,
    path = "/api/ready",
    responses(
        (status = 200, description = "Cache tier reachable", body = HealthResponse),
        (status = 503, description = "Cache tier unavailable", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn ready_check_doc() {}

/// Upgrade to a collaborative editing session
#[utoipa::path(
    get,
    path = "/api/ws",
    params(
        ("roomCode" = String, Query, description = "Room to join"),
        ("docId" = i64, Query, description = "Document to edit")
    ),
    responses(
        (status = 101, description = "Switching to the websocket protocol"),
        (status = 400, description = "Missing or malformed admission parameters", body = ErrorResponse),
        (status = 403, description = "Origin not allowed", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn websocket_doc() {}

/// List the documents of a room
#[utoipa::path(
    get,
    path = "/api/v1/documents",
    params(RoomCodeQuery),
    responses(
        (status = 200, description = "Documents of the room", body = DocumentListResponse),
        (status = 400, description = "Room code missing", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn list_documents_doc() {}

/// Create a document
#[utoipa::path(
    post,
    path = "/api/v1/documents",
    params(RoomCodeQuery),
    request_body = CreateDocumentRequest,
    responses(
        (status = 200, description = "Document created", body = Document),
        (status = 400, description = "Room code missing", body = ErrorResponse),
        (status = 500, description = "Durable tier error", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn create_document_doc() {}

/// Apply an insert or delete to a document.
///
/// Body: `{type: "insert"|"delete", position, text?, length?}`
#[utoipa::path(
    post,
    path = "/api/v1/documents/{docId}/operations",
    params(
        ("docId" = i64, Path, description = "Document id"),
        RoomCodeQuery
    ),
    responses(
        (status = 200, description = "The operation as applied, offsets clamped"),
        (status = 400, description = "Room code missing or operation not supported", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn apply_operation_doc() {}

/// Request an AI completion at a cursor position
#[utoipa::path(
    post,
    path = "/api/v1/ai",
    request_body = AiRequest,
    responses(
        (status = 202, description = "Completion queued"),
        (status = 400, description = "Room code or prompt empty", body = ErrorResponse),
        (status = 503, description = "Completions not configured", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn request_completion_doc() {}

/// Live presence of a room
#[utoipa::path(
    get,
    path = "/api/v1/rooms/{roomCode}",
    params(("roomCode" = String, Path, description = "Room code")),
    responses(
        (status = 200, description = "Presence of the room", body = RoomPresenceResponse)
    )
)]
#[allow(dead_code)]
pub async fn room_presence_doc() {}

/// Connection, room and host statistics
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Diagnostics", body = DiagnosticsResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        ready_check_doc,
        websocket_doc,
        list_documents_doc,
        create_document_doc,
        apply_operation_doc,
        request_completion_doc,
        room_presence_doc,
        diagnostics_doc,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorResponse,
            Document,
            DocumentListResponse,
            CreateDocumentRequest,
            AiRequest,
            RoomPresenceResponse,
            DiagnosticsResponse,
        )
    ),
    tags(
        (name = "api", description = "API endpoints")
    )
)]
pub struct ApiDoc;
