use std::sync::Arc;

use crate::config::Config;
use crate::services::ai_service::Completer;
use crate::services::content_store::ContentStore;
use crate::ws::registry::RoomRegistry;

/// Shared handles passed to every route and session
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<RoomRegistry>,
    pub store: Arc<ContentStore>,
    /// Absent when no completion API key is configured
    pub completer: Option<Arc<dyn Completer>>,
}
