use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};

use crate::models::{AiRequest, Operation, WireMessage};
use crate::services::content_store::ContentStore;
use crate::services::doc_edit_service;
use crate::ws::{broadcast, registry::RoomRegistry};

/// Author id carried by AI-produced edits
pub const AI_AUTHOR_ID: &str = "ai";

/// Characters of context taken on each side of the cursor
pub const CONTEXT_SIZE: usize = 600;

const SYSTEM_PROMPT: &str = "You are helping edit a Markdown document.
You will be given:
1. The text before the cursor
2. The user request
3. The text after the cursor
Your job is to output ONLY the text that should be inserted at the cursor.
Do NOT rewrite existing text. Do NOT restate context.
Output plain Markdown without backticks.
You are allowed to use latex for math. For both block and inline math DO NOT put
a new line between $$ and the math.
CORRECT: $$x+y$$, INCORRECT: $$\\nx+y\\n$$
CORRECT: $x+y$, INCORRECT: $\\nx\\n$";

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("completion request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("completion response had no content")]
    EmptyCompletion,
}

/// Something that turns a prompt into text to insert
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, AiError>;
}

/// Frame the request with the document text around the cursor
pub fn build_user_prompt(content: &str, raw_prompt: &str, cursor_position: i64) -> String {
    let chars: Vec<char> = content.chars().collect();
    let cursor = usize::try_from(cursor_position).map_or(0, |c| c.min(chars.len()));
    let start = cursor.saturating_sub(CONTEXT_SIZE);
    let end = (cursor + CONTEXT_SIZE).min(chars.len());

    let before: String = chars[start..cursor].iter().collect();
    let after: String = chars[cursor..end].iter().collect();

    format!("Before cursor:\n{before}\n\nUser request:\n{raw_prompt}\n\nAfter cursor:\n{after}")
}

/// Ask for a completion and push it into the document as an insert at the cursor.
///
/// The edit goes to every session of the room, not just viewers of the document.
pub async fn run_completion(
    completer: &dyn Completer,
    store: &ContentStore,
    registry: &RoomRegistry,
    request: AiRequest,
) {
    let content = store.get(&request.room_code, request.doc_id).await;
    let prompt = build_user_prompt(&content, &request.prompt, request.cursor_position);

    let text = match completer.complete(SYSTEM_PROMPT, &prompt).await {
        Ok(text) => text,
        Err(e) => {
            error!("Could not get completion for room {}: {}", request.room_code, e);
            return;
        }
    };

    let operation = Operation::insert(request.cursor_position, text);
    let Some(edit) = doc_edit_service::apply_edit(store, &request.room_code, request.doc_id, &operation).await else {
        return;
    };
    if let Err(e) = edit.persisted {
        error!("Could not update document {} with completion: {}", request.doc_id, e);
        return;
    }

    let payload = match (WireMessage::Operation {
        operation: edit.operation,
        user_id: Some(AI_AUTHOR_ID.to_string()),
    })
    .encode()
    {
        Ok(payload) => payload,
        Err(e) => {
            error!("Could not encode completion operation: {}", e);
            return;
        }
    };

    // Nobody is connected: the content is stored and reaches sessions on their next init
    let Some(room) = registry.get(&request.room_code).await else {
        return;
    };
    let delivered = broadcast::to_everyone(&room, &payload).await;
    info!("Completion for room {} doc {} sent to {} sessions", request.room_code, request.doc_id, delivered);
}

/// Run [`run_completion`] in the background
pub fn spawn_completion(
    completer: Arc<dyn Completer>,
    store: Arc<ContentStore>,
    registry: Arc<RoomRegistry>,
    request: AiRequest,
) {
    tokio::spawn(async move {
        run_completion(completer.as_ref(), &store, &registry, request).await;
    });
}


#[cfg(test)]
mod tests {
    use super::testing::CannedCompleter;
    use super::*;
    use crate::db::memdocs::MemoryDocStore;
    use crate::db::mokacache::MokaCacheTier;
    use crate::ws::room::{Payload, SessionHandle};
    use tokio::sync::mpsc;

    fn store() -> ContentStore {
        ContentStore::new(Arc::new(MokaCacheTier::default()), Arc::new(MemoryDocStore::default()))
    }

    fn request(cursor_position: i64) -> AiRequest {
        AiRequest {
            prompt: "add a greeting".to_string(),
            doc_id: 1,
            room_code: "ROOM".to_string(),
            cursor_position,
        }
    }

    #[test]
    fn prompt_includes_context_around_cursor() {
        let prompt = build_user_prompt("abcdef", "fill in", 3);
        assert_eq!(prompt, "Before cursor:\nabc\n\nUser request:\nfill in\n\nAfter cursor:\ndef");
    }

    #[test]
    fn prompt_context_is_bounded() {
        let content = "x".repeat(2000);
        let prompt = build_user_prompt(&content, "p", 1000);
        let before = prompt.split("\n\nUser request:").next().unwrap();
        assert_eq!(before.trim_start_matches("Before cursor:\n").len(), CONTEXT_SIZE);

        // Cursor beyond the end clamps to the end
        let prompt = build_user_prompt("short", "p", 99);
        assert!(prompt.starts_with("Before cursor:\nshort\n\n"));
        assert!(prompt.ends_with("After cursor:\n"));
    }

    #[tokio::test]
    async fn completion_is_inserted_and_sent_room_wide() {
        let store = store();
        let registry = RoomRegistry::new();
        store.set("ROOM", 1, "Hello world".to_string()).await.unwrap();

        let room = registry.get_or_create("ROOM").await;
        let (tx_same, mut same_doc) = mpsc::channel::<Payload>(8);
        let (tx_other, mut other_doc) = mpsc::channel::<Payload>(8);
        room.admit(SessionHandle::new("s1", 1, tx_same), |_| None).await;
        room.admit(SessionHandle::new("s2", 9, tx_other), |_| None).await;

        let completer = CannedCompleter::new(Some(","));
        run_completion(&completer, &store, &registry, request(5)).await;

        assert_eq!(store.get("ROOM", 1).await, "Hello, world");
        let expected = r#"{"type":"operation","operation":{"type":"insert","position":5,"text":","},"userId":"ai"}"#;
        assert_eq!(&*same_doc.recv().await.unwrap(), expected);
        assert_eq!(&*other_doc.recv().await.unwrap(), expected);
        assert!(completer.prompts.lock().await[0].contains("Before cursor:\nHello\n"));
    }

    #[tokio::test]
    async fn failed_completion_changes_nothing() {
        let store = store();
        let registry = RoomRegistry::new();
        store.set("ROOM", 1, "same".to_string()).await.unwrap();

        run_completion(&CannedCompleter::new(None), &store, &registry, request(0)).await;
        assert_eq!(store.get("ROOM", 1).await, "same");
    }

    #[tokio::test]
    async fn completion_without_live_room_is_still_stored() {
        let store = store();
        let registry = RoomRegistry::new();
        run_completion(&CannedCompleter::new(Some("draft")), &store, &registry, request(0)).await;
        assert_eq!(store.get("ROOM", 1).await, "draft");
        assert!(registry.get("ROOM").await.is_none());
    }
}
