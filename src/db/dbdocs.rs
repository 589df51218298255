use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Error as SqlxError, Row};
use std::time::Duration;
use tracing::{debug, info};

use crate::models::Document;
use crate::services::content_store::{DocKey, DurableTier, StoreError};

const SCHEMA_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        id SERIAL PRIMARY KEY,
        title TEXT NOT NULL,
        content TEXT NOT NULL DEFAULT '',
        room_code TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
"#;

/// Postgres durable tier
pub struct PgDocStore {
    pool: PgPool,
}

impl PgDocStore {
    /// Create a new database connection pool
    ///
    /// # Arguments
    /// * `database_url` - PostgreSQL connection string
    pub async fn new(database_url: &str) -> Result<Self, SqlxError> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(database_url)
            .await?;

        info!("Database connection pool created successfully");

        Ok(Self { pool })
    }

    /// Create the documents table when it does not exist yet
    pub async fn ensure_schema(&self) -> Result<(), SqlxError> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl DurableTier for PgDocStore {
    async fn load_content(&self, key: &DocKey) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT content FROM documents WHERE id = $1 AND room_code = $2")
            .bind(key.doc_id)
            .bind(&key.room_code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match row {
            Some(row) => Some(row.try_get::<String, _>("content")?),
            None => None,
        })
    }

    async fn save_content(&self, key: &DocKey, content: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE documents SET content = $1 WHERE id = $2 AND room_code = $3")
            .bind(content)
            .bind(key.doc_id)
            .bind(&key.room_code)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            debug!("No durable row for {}, nothing updated", key);
        }
        Ok(())
    }

    async fn create_document(&self, room_code: &str, title: &str, content: &str) -> Result<i64, StoreError> {
        let row = sqlx::query(
            "INSERT INTO documents (title, content, room_code) VALUES ($1, $2, $3) RETURNING id::BIGINT AS id",
        )
        .bind(title)
        .bind(content)
        .bind(room_code)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get::<i64, _>("id")?)
    }

    async fn list_documents(&self, room_code: &str) -> Result<Vec<Document>, StoreError> {
        let rows = sqlx::query(
            "SELECT id::BIGINT AS id, title FROM documents WHERE room_code = $1 ORDER BY created_at ASC",
        )
        .bind(room_code)
        .fetch_all(&self.pool)
        .await?;

        let mut docs = Vec::with_capacity(rows.len());
        for row in rows {
            docs.push(Document {
                id: row.try_get("id")?,
                title: row.try_get("title")?,
            });
        }
        Ok(docs)
    }
}
