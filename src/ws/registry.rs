use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use super::room::Room;

/// Process-wide table of live rooms, owned by the server's composition root.
///
/// Rooms are created on first use and live as long as the registry.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, Arc<Room>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a room, creating it if needed. Concurrent first calls share one instance.
    pub async fn get_or_create(&self, room_code: &str) -> Arc<Room> {
        let mut rooms = self.rooms.write().await;
        rooms
            .entry(room_code.to_string())
            .or_insert_with(|| {
                info!("Created new room: {}", room_code);
                Arc::new(Room::new(room_code))
            })
            .clone()
    }

    pub async fn get(&self, room_code: &str) -> Option<Arc<Room>> {
        self.rooms.read().await.get(room_code).cloned()
    }

    /// Snapshot of the live rooms
    pub async fn rooms(&self) -> Vec<Arc<Room>> {
        self.rooms.read().await.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_does_not_create() {
        let registry = RoomRegistry::new();
        assert!(registry.get("ABC123").await.is_none());
        let room = registry.get_or_create("ABC123").await;
        let found = registry.get("ABC123").await.unwrap();
        assert!(Arc::ptr_eq(&room, &found));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_calls_share_one_room() {
        let registry = Arc::new(RoomRegistry::new());
        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.get_or_create("RACE").await })
            })
            .collect();

        let mut rooms = Vec::new();
        for task in tasks {
            rooms.push(task.await.unwrap());
        }
        assert!(rooms.iter().all(|r| Arc::ptr_eq(r, &rooms[0])));
        assert_eq!(registry.rooms().await.len(), 1);
    }
}
