use axum::extract::ws::Message;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, timeout, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::broadcast;
use super::room::{Payload, Room, SessionHandle};
use crate::config::Config;
use crate::models::WireMessage;
use crate::services::content_store::ContentStore;
use crate::services::doc_edit_service;

/// Connection timings and queue sizing
#[derive(Clone, Copy, Debug)]
pub struct SessionSettings {
    pub ping_interval: Duration,
    pub read_deadline: Duration,
    pub queue_capacity: usize,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            ping_interval: config.ping_interval(),
            read_deadline: config.read_deadline(),
            queue_capacity: config.outbound_queue_capacity.max(1),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// One live connection, bound to one room and one document for its whole lifetime
pub struct Session {
    pub id: String,
    pub doc_id: i64,
    room: Arc<Room>,
    store: Arc<ContentStore>,
    torn_down: AtomicBool,
}

impl Session {
    fn new(room: Arc<Room>, doc_id: i64, store: Arc<ContentStore>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            doc_id,
            room,
            store,
            torn_down: AtomicBool::new(false),
        }
    }

    /// Leave the room and tell the remaining peers. Safe to call more than once.
    async fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        // Dropping the room's handle closes the outbound queue, which ends the write loop
        self.room.remove_session(&self.id).await;
        info!("Session {} disconnected from room {} doc {}", self.id, self.room.code, self.doc_id);
        broadcast::broadcast_client_count(&self.room, self.doc_id).await;
    }

    async fn handle_text(&self, text: &str) {
        let msg: WireMessage = match serde_json::from_str(text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Could not parse message from session {}: {}", self.id, e);
                return;
            }
        };

        match msg {
            WireMessage::Operation { operation, .. } => {
                let Some(edit) =
                    doc_edit_service::apply_edit(&self.store, &self.room.code, self.doc_id, &operation).await
                else {
                    return;
                };

                if let Err(e) = edit.persisted {
                    // Peers still get the edit, persistence is best effort
                    error!("Could not update document {} in room {}: {}", self.doc_id, self.room.code, e);
                }

                let response = WireMessage::Operation {
                    operation: edit.operation,
                    user_id: Some(self.id.clone()),
                };
                match response.encode() {
                    Ok(payload) => {
                        broadcast::to_others(&self.room, &self.id, self.doc_id, &payload).await;
                    }
                    Err(e) => error!("Failed to encode operation from session {}: {}", self.id, e),
                }
            }
            other => debug!("Ignoring {:?} from session {}", other, self.id),
        }
    }
}

/// Run a connection from admission to teardown.
///
/// Fetches the snapshot, registers with the room (queueing `init` first), announces the new
/// count, then runs the read and write loops until either ends.
pub async fn run_session<S, R, E>(
    sink: S,
    stream: R,
    room: Arc<Room>,
    doc_id: i64,
    store: Arc<ContentStore>,
    settings: SessionSettings,
) where
    S: Sink<Message> + Unpin + Send + 'static,
    S::Error: Display + Send,
    R: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
    E: Display + Send + 'static,
{
    let session = Arc::new(Session::new(room.clone(), doc_id, store.clone()));
    let content = store.get(&room.code, doc_id).await;

    let (tx, rx) = mpsc::channel::<Payload>(settings.queue_capacity);
    let handle = SessionHandle::new(session.id.clone(), doc_id, tx);
    let user_id = session.id.clone();
    let admitted = room
        .admit(handle, move |count| {
            let init = WireMessage::Init { content, user_id, count };
            init.encode()
                .map_err(|e| error!("Failed to encode init message: {}", e))
                .ok()
        })
        .await;

    let Some(count) = admitted else {
        error!("Session id {} already registered in room {}", session.id, room.code);
        return;
    };
    info!("Session {} joined room {} doc {} ({} connected)", session.id, room.code, doc_id, count);

    let mut write_task = tokio::spawn(write_loop(sink, rx, settings.ping_interval, session.id.clone()));
    let mut read_task = tokio::spawn(read_loop(session.clone(), stream, settings.read_deadline));

    broadcast::broadcast_client_count(&room, doc_id).await;

    let write_finished = tokio::select! {
        _ = &mut read_task => false,
        _ = &mut write_task => {
            read_task.abort();
            true
        }
    };

    session.teardown().await;

    if !write_finished {
        // Drains what is still queued, then sends the close frame
        if let Err(e) = write_task.await {
            error!("Write loop of session {} failed: {}", session.id, e);
        }
    }
}

async fn read_loop<R, E>(session: Arc<Session>, mut stream: R, read_deadline: Duration)
where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    loop {
        // Any inbound frame, pongs included, extends the deadline
        let frame = match timeout(read_deadline, stream.next()).await {
            Err(_) => {
                info!("Session {} silent for {:?}, presumed dead", session.id, read_deadline);
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                debug!("Read failed for session {}: {}", session.id, e);
                break;
            }
            Ok(Some(Ok(frame))) => frame,
        };

        match frame {
            Message::Text(text) => session.handle_text(&text).await,
            Message::Close(_) => break,
            Message::Binary(_) => debug!("Ignoring binary frame from session {}", session.id),
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    session.teardown().await;
}

async fn write_loop<S>(mut sink: S, mut outbound: mpsc::Receiver<Payload>, ping_interval: Duration, session_id: String)
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let mut ticker = interval_at(Instant::now() + ping_interval, ping_interval);

    loop {
        tokio::select! {
            next = outbound.recv() => {
                let Some(payload) = next else {
                    // Queue closed by teardown
                    if let Err(e) = sink.send(Message::Close(None)).await {
                        debug!("Could not send close frame to session {}: {}", session_id, e);
                    }
                    return;
                };
                if let Err(e) = sink.send(Message::Text(payload.to_string())).await {
                    warn!("Could not write to session {}: {}", session_id, e);
                    return;
                }
            }
            _ = ticker.tick() => {
                if let Err(e) = sink.send(Message::Ping(Vec::new())).await {
                    warn!("Could not send ping to session {}: {}", session_id, e);
                    return;
                }
            }
        }
    }
}
