use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::debug;

/// A serialized message, shared by every recipient of a fan-out
pub type Payload = Arc<str>;

/// The room's view of one connected session: where it is bound and how to reach it.
///
/// The room owns the only sender of the session's outbound queue, so removing the handle
/// from the room closes the queue and stops the session's write loop.
pub struct SessionHandle {
    pub id: String,
    pub doc_id: i64,
    outbound: mpsc::Sender<Payload>,
}

impl SessionHandle {
    pub fn new(id: impl Into<String>, doc_id: i64, outbound: mpsc::Sender<Payload>) -> Self {
        Self { id: id.into(), doc_id, outbound }
    }

    /// Enqueue without waiting. A full queue drops the message for this session only.
    pub fn try_deliver(&self, payload: &Payload) -> bool {
        match self.outbound.try_send(payload.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!("Outbound queue full for session {}, message dropped", self.id);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

pub(crate) struct Members {
    pub(crate) clients: HashMap<String, SessionHandle>,
    last_activity: DateTime<Utc>,
}

impl Members {
    pub(crate) fn count_for_doc(&self, doc_id: i64) -> usize {
        self.clients.values().filter(|c| c.doc_id == doc_id).count()
    }
}

/// A named collaboration space and the sessions connected to it
pub struct Room {
    pub code: String,
    members: RwLock<Members>,
}

impl Room {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            members: RwLock::new(Members {
                clients: HashMap::new(),
                last_activity: Utc::now(),
            }),
        }
    }

    /// Register a session.
    ///
    /// `init` is called with the per-document count including the new session, and its
    /// payload is queued before the session becomes visible to broadcasts, so the snapshot
    /// is always the first message the peer sees. Returns `None` if the id is taken.
    pub async fn admit(
        &self,
        handle: SessionHandle,
        init: impl FnOnce(usize) -> Option<Payload>,
    ) -> Option<usize> {
        let mut members = self.members.write().await;
        if members.clients.contains_key(&handle.id) {
            return None;
        }

        let count = members.count_for_doc(handle.doc_id) + 1;
        if let Some(payload) = init(count) {
            handle.try_deliver(&payload);
        }
        members.clients.insert(handle.id.clone(), handle);
        members.last_activity = Utc::now();
        Some(count)
    }

    /// Remove a session, closing its outbound queue. Removing twice is a no-op.
    pub async fn remove_session(&self, session_id: &str) -> bool {
        let mut members = self.members.write().await;
        let removed = members.clients.remove(session_id).is_some();
        if removed {
            members.last_activity = Utc::now();
        }
        removed
    }

    /// Sessions across every document of the room
    pub async fn active_users(&self) -> usize {
        self.members.read().await.clients.len()
    }

    pub async fn last_activity(&self) -> DateTime<Utc> {
        self.members.read().await.last_activity
    }

    pub(crate) async fn members(&self) -> RwLockReadGuard<'_, Members> {
        self.members.read().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(id: &str, doc_id: i64) -> (SessionHandle, mpsc::Receiver<Payload>) {
        let (tx, rx) = mpsc::channel(4);
        (SessionHandle::new(id, doc_id, tx), rx)
    }

    #[tokio::test]
    async fn admit_counts_per_document() {
        let room = Room::new("ABC123");
        let (a, _ra) = handle("a", 1);
        let (b, _rb) = handle("b", 2);
        let (c, _rc) = handle("c", 1);

        assert_eq!(room.admit(a, |_| None).await, Some(1));
        assert_eq!(room.admit(b, |_| None).await, Some(1));
        assert_eq!(room.admit(c, |_| None).await, Some(2));
        assert_eq!(room.members().await.count_for_doc(1), 2);
        assert_eq!(room.active_users().await, 3);
    }

    #[tokio::test]
    async fn duplicate_session_id_is_rejected() {
        let room = Room::new("ABC123");
        let (first, _r1) = handle("same", 1);
        let (second, _r2) = handle("same", 1);
        assert!(room.admit(first, |_| None).await.is_some());
        assert!(room.admit(second, |_| None).await.is_none());
        assert_eq!(room.members().await.count_for_doc(1), 1);
    }

    #[tokio::test]
    async fn init_payload_is_queued_first() {
        let room = Room::new("ABC123");
        let (a, mut rx) = handle("a", 1);
        room.admit(a, |count| Some(Payload::from(format!("init:{count}")))).await;
        assert_eq!(&*rx.recv().await.unwrap(), "init:1");
    }

    #[tokio::test]
    async fn removal_closes_the_outbound_queue() {
        let room = Room::new("ABC123");
        let (a, mut rx) = handle("a", 1);
        room.admit(a, |_| None).await;

        assert!(room.remove_session("a").await);
        assert!(!room.remove_session("a").await);
        assert!(rx.recv().await.is_none());
        assert_eq!(room.active_users().await, 0);
    }
}
