use tracing::error;

use super::room::{Payload, Room};
use crate::models::WireMessage;

// Every fan-out runs under the room's read lock and enqueues without blocking. A session
// whose queue is full misses that message; nobody else is affected.

/// Deliver to every session bound to `doc_id` except the author. Returns the number of
/// sessions the payload was queued for.
pub async fn to_others(room: &Room, author_id: &str, doc_id: i64, payload: &Payload) -> usize {
    let members = room.members().await;
    let mut delivered = 0;
    for (id, client) in &members.clients {
        if id != author_id && client.doc_id == doc_id && client.try_deliver(payload) {
            delivered += 1;
        }
    }
    delivered
}

/// Deliver to every session in the room, whatever document it is bound to
pub async fn to_everyone(room: &Room, payload: &Payload) -> usize {
    let members = room.members().await;
    let mut delivered = 0;
    for client in members.clients.values() {
        if client.try_deliver(payload) {
            delivered += 1;
        }
    }
    delivered
}

/// Send the live per-document session count to the sessions of that document
pub async fn broadcast_client_count(room: &Room, doc_id: i64) -> usize {
    let members = room.members().await;
    let count = members.count_for_doc(doc_id);

    let payload = match (WireMessage::ClientCount { count }).encode() {
        Ok(payload) => payload,
        Err(e) => {
            error!("Failed to encode client count for room {}: {}", room.code, e);
            return 0;
        }
    };

    let mut delivered = 0;
    for client in members.clients.values() {
        if client.doc_id == doc_id && client.try_deliver(&payload) {
            delivered += 1;
        }
    }
    delivered
}

/// Tell every session in the room to refresh its document list
pub async fn document_list_update(room: &Room) -> usize {
    match WireMessage::DocumentListUpdate.encode() {
        Ok(payload) => to_everyone(room, &payload).await,
        Err(e) => {
            error!("Failed to encode document list update for room {}: {}", room.code, e);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::room::SessionHandle;
    use tokio::sync::mpsc;

    async fn join(room: &Room, id: &str, doc_id: i64, capacity: usize) -> mpsc::Receiver<Payload> {
        let (tx, rx) = mpsc::channel(capacity);
        room.admit(SessionHandle::new(id, doc_id, tx), |_| None).await;
        rx
    }

    fn drain(rx: &mut mpsc::Receiver<Payload>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(p) = rx.try_recv() {
            out.push(p.to_string());
        }
        out
    }

    #[tokio::test]
    async fn to_others_skips_author_and_other_documents() {
        let room = Room::new("ABC123");
        let mut author = join(&room, "author", 1, 8).await;
        let mut peer = join(&room, "peer", 1, 8).await;
        let mut elsewhere = join(&room, "elsewhere", 2, 8).await;

        let payload = Payload::from("edit");
        assert_eq!(to_others(&room, "author", 1, &payload).await, 1);
        assert!(drain(&mut author).is_empty());
        assert_eq!(drain(&mut peer), vec!["edit"]);
        assert!(drain(&mut elsewhere).is_empty());
    }

    #[tokio::test]
    async fn to_everyone_includes_author_and_all_documents() {
        let room = Room::new("ABC123");
        let mut a = join(&room, "a", 1, 8).await;
        let mut b = join(&room, "b", 2, 8).await;

        assert_eq!(to_everyone(&room, &Payload::from("ai")).await, 2);
        assert_eq!(drain(&mut a), vec!["ai"]);
        assert_eq!(drain(&mut b), vec!["ai"]);
    }

    #[tokio::test]
    async fn client_count_reaches_every_session_of_the_document() {
        let room = Room::new("ABC123");
        let mut receivers = Vec::new();
        for i in 0..3 {
            receivers.push(join(&room, &format!("s{i}"), 1, 8).await);
        }
        let mut other = join(&room, "other", 2, 8).await;

        assert_eq!(broadcast_client_count(&room, 1).await, 3);
        for rx in &mut receivers {
            assert_eq!(drain(rx), vec![r#"{"type":"clientCount","count":3}"#]);
        }
        assert!(drain(&mut other).is_empty());
    }

    #[tokio::test]
    async fn saturated_queue_drops_without_affecting_others() {
        let room = Room::new("ABC123");
        let mut slow = join(&room, "slow", 1, 1).await;
        let mut fast = join(&room, "fast", 1, 8).await;

        assert_eq!(to_everyone(&room, &Payload::from("one")).await, 2);
        // `slow` has not read anything and its single slot is taken
        assert_eq!(to_everyone(&room, &Payload::from("two")).await, 1);

        assert_eq!(drain(&mut slow), vec!["one"]);
        assert_eq!(drain(&mut fast), vec!["one", "two"]);
    }

    #[tokio::test]
    async fn document_list_update_goes_room_wide() {
        let room = Room::new("ABC123");
        let mut a = join(&room, "a", 1, 8).await;
        let mut b = join(&room, "b", 5, 8).await;

        assert_eq!(document_list_update(&room).await, 2);
        assert_eq!(drain(&mut a), vec![r#"{"type":"documentListUpdate"}"#]);
        assert_eq!(drain(&mut b), vec![r#"{"type":"documentListUpdate"}"#]);
    }
}
