use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::debug;

use super::{ContentStore, StoreError, StoreResult};
use crate::document::id::{Collection, Partition};
use crate::document::model::StoredDocument;

/// PostgreSQL-backed store over the `documents` table.
#[derive(Debug, Clone)]
pub struct PgContentStore {
    pool: PgPool,
}

impl PgContentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn row_to_document(row: PgRow) -> StoreResult<StoredDocument> {
    let body: Value = row.try_get("body")?;
    let Value::Object(body) = body else {
        return Err(StoreError::Corrupt("document body is not an object".to_string()));
    };
    Ok(StoredDocument {
        id: row.try_get("doc_id")?,
        body,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn collection_names(collections: &[Collection]) -> Vec<String> {
    collections.iter().map(|c| c.as_str().to_string()).collect()
}

#[async_trait]
impl ContentStore for PgContentStore {
    async fn read(
        &self,
        partition: Partition,
        collection: Collection,
        id: &str,
    ) -> StoreResult<Option<StoredDocument>> {
        let row = sqlx::query(
            r#"
            SELECT doc_id, body, created_at, updated_at
            FROM documents
            WHERE partition = $1 AND collection = $2 AND doc_id = $3
            "#,
        )
        .bind(partition.as_str())
        .bind(collection.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_document).transpose()
    }

    async fn insert(
        &self,
        partition: Partition,
        collection: Collection,
        id: &str,
        body: Map<String, Value>,
    ) -> StoreResult<Option<StoredDocument>> {
        let row = sqlx::query(
            r#"
            INSERT INTO documents (partition, collection, doc_id, body, created_at, updated_at)
            VALUES ($1, $2, $3, $4, now(), now())
            ON CONFLICT (partition, collection, doc_id) DO NOTHING
            RETURNING doc_id, body, created_at, updated_at
            "#,
        )
        .bind(partition.as_str())
        .bind(collection.as_str())
        .bind(id)
        .bind(Value::Object(body))
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_document).transpose()
    }

    async fn write(
        &self,
        partition: Partition,
        collection: Collection,
        id: &str,
        body: Map<String, Value>,
    ) -> StoreResult<StoredDocument> {
        let row = sqlx::query(
            r#"
            INSERT INTO documents (partition, collection, doc_id, body, created_at, updated_at)
            VALUES ($1, $2, $3, $4, now(), now())
            ON CONFLICT (partition, collection, doc_id)
            DO UPDATE SET body = EXCLUDED.body, updated_at = now()
            RETURNING doc_id, body, created_at, updated_at
            "#,
        )
        .bind(partition.as_str())
        .bind(collection.as_str())
        .bind(id)
        .bind(Value::Object(body))
        .fetch_one(&self.pool)
        .await?;

        row_to_document(row)
    }

    async fn delete(&self, partition: Partition, collection: Collection, id: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            "DELETE FROM documents WHERE partition = $1 AND collection = $2 AND doc_id = $3",
        )
        .bind(partition.as_str())
        .bind(collection.as_str())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, partition: Partition, collection: Collection) -> StoreResult<Vec<StoredDocument>> {
        let rows = sqlx::query(
            r#"
            SELECT doc_id, body, created_at, updated_at
            FROM documents
            WHERE partition = $1 AND collection = $2
            ORDER BY updated_at DESC
            "#,
        )
        .bind(partition.as_str())
        .bind(collection.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_document).collect()
    }

    async fn publish(&self, collections: &[Collection]) -> StoreResult<DateTime<Utc>> {
        let names = collection_names(collections);
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM documents WHERE partition = 'live' AND collection = ANY($1)")
            .bind(&names)
            .execute(&mut *tx)
            .await?;

        let copied = sqlx::query(
            r#"
            INSERT INTO documents (partition, collection, doc_id, body, created_at, updated_at)
            SELECT 'live', collection, doc_id, body, created_at, updated_at
            FROM documents
            WHERE partition = 'draft' AND collection = ANY($1)
            "#,
        )
        .bind(&names)
        .execute(&mut *tx)
        .await?;

        let published_at: DateTime<Utc> = sqlx::query_scalar("SELECT now()")
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(
            removed = removed.rows_affected(),
            copied = copied.rows_affected(),
            "live partition replaced"
        );
        Ok(published_at)
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
