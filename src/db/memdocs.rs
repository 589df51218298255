use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::models::Document;
use crate::services::content_store::{DocKey, DurableTier, StoreError};

struct DocRow {
    title: String,
    content: String,
    room_code: String,
    created_at: DateTime<Utc>,
}

/// Durable tier kept in process memory, for deployments without a database and for tests
#[derive(Default)]
pub struct MemoryDocStore {
    rows: RwLock<HashMap<i64, DocRow>>,
}

#[async_trait]
impl DurableTier for MemoryDocStore {
    async fn load_content(&self, key: &DocKey) -> Result<Option<String>, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows
            .get(&key.doc_id)
            .filter(|row| row.room_code == key.room_code)
            .map(|row| row.content.clone()))
    }

    async fn save_content(&self, key: &DocKey, content: &str) -> Result<(), StoreError> {
        let mut rows = self.rows.write().await;
        if let Some(row) = rows
            .get_mut(&key.doc_id)
            .filter(|row| row.room_code == key.room_code)
        {
            row.content = content.to_string();
        }
        Ok(())
    }

    async fn create_document(&self, room_code: &str, title: &str, content: &str) -> Result<i64, StoreError> {
        let mut rows = self.rows.write().await;
        let id = rows.keys().max().map_or(1, |max| max + 1);
        rows.insert(id, DocRow {
            title: title.to_string(),
            content: content.to_string(),
            room_code: room_code.to_string(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn list_documents(&self, room_code: &str) -> Result<Vec<Document>, StoreError> {
        let rows = self.rows.read().await;
        let mut docs: Vec<(&i64, &DocRow)> = rows
            .iter()
            .filter(|(_, row)| row.room_code == room_code)
            .collect();
        docs.sort_by_key(|(id, row)| (row.created_at, **id));
        Ok(docs
            .into_iter()
            .map(|(id, row)| Document { id: *id, title: row.title.clone() })
            .collect())
    }
}
