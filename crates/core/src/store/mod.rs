//! Content store adapter.
//!
//! A thin seam between the lifecycle services and the backing document
//! store. No caching: every read goes to the backend.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::document::id::{Collection, Partition};
use crate::document::model::StoredDocument;

pub use memory::MemoryContentStore;
pub use postgres::PgContentStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached or rejected the operation.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    /// A stored document does not have the expected shape.
    #[error("corrupt document: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Read one document.
    async fn read(
        &self,
        partition: Partition,
        collection: Collection,
        id: &str,
    ) -> StoreResult<Option<StoredDocument>>;

    /// Insert a document only if `id` is free. Returns `None` when it already
    /// exists. `created_at == updated_at` on the returned document.
    async fn insert(
        &self,
        partition: Partition,
        collection: Collection,
        id: &str,
        body: Map<String, Value>,
    ) -> StoreResult<Option<StoredDocument>>;

    /// Create or replace a document. `created_at` is kept across replaces.
    async fn write(
        &self,
        partition: Partition,
        collection: Collection,
        id: &str,
        body: Map<String, Value>,
    ) -> StoreResult<StoredDocument>;

    /// Delete a document. Returns whether it existed.
    async fn delete(&self, partition: Partition, collection: Collection, id: &str) -> StoreResult<bool>;

    /// All documents of a collection, in no particular order.
    async fn list(&self, partition: Partition, collection: Collection) -> StoreResult<Vec<StoredDocument>>;

    /// Replace the live copy of `collections` with the draft copy in a single
    /// atomic step. Returns the publish time.
    async fn publish(&self, collections: &[Collection]) -> StoreResult<DateTime<Utc>>;

    /// Cheap connectivity check.
    async fn ping(&self) -> StoreResult<()>;
}
