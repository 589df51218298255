use crate::handlers::{
    apply_operation, create_document, diagnostics, health_check, list_documents, ready_check,
    request_completion, room_presence,
};
use crate::state::AppState;
use crate::ws::handler::websocket_handler;
use axum::{routing::{get, post}, Router};

/// Create API routes
pub fn create_api_routes(state: AppState) -> Router {
    Router::<AppState>::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .route("/ws", get(websocket_handler))
        .route("/v1/documents", get(list_documents).post(create_document))
        .route("/v1/documents/:doc_id/operations", post(apply_operation))
        .route("/v1/ai", post(request_completion))
        .route("/v1/rooms/:room_code", get(room_presence))
        .route("/v1/diagnostics", get(diagnostics))
        .with_state(state)
}
